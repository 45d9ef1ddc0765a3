//! Reconciles a demo platform (database, broker, console) through a few
//! passes and prints the status patch after each one.
//!
//! The database needs two passes to come up, the broker is gated on the
//! database's condition, and the console is gated on the broker's. The third
//! pass finds everything settled and confirms the status without touching a
//! reconciler.
//!
//! Run with `RUST_LOG=debug cargo run --example platform`.

use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use capstan::{
    ConditionTrue, Dependent, DependentReconciler, DependentRef, PlatformStatus, Primary,
    Readiness, ReconcileContext, Reconciler,
};
use tracing::info;
use url::Url;

struct Platform {
    name: String,
    generation: i64,
}

impl Primary for Platform {
    fn generation(&self) -> i64 {
        self.generation
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn namespace(&self) -> Option<&str> {
        Some("demo")
    }
}

/// Pretends to provision a database: still allocating on the first pass,
/// ready from the second on.
struct Database {
    attempts: AtomicUsize,
}

#[async_trait]
impl DependentReconciler<Platform> for Database {
    async fn reconcile(
        &self,
        _dependent: &DependentRef,
        _primary: &Platform,
        _ctx: &ReconcileContext,
    ) -> anyhow::Result<Readiness> {
        if self.attempts.fetch_add(1, Ordering::SeqCst) == 0 {
            return Ok(Readiness::in_progress("allocating volume"));
        }
        Ok(Readiness::ready_at(
            "database",
            Url::parse("postgres://db.demo.internal:5432")?,
        ))
    }
}

struct Broker;

#[async_trait]
impl DependentReconciler<Platform> for Broker {
    async fn reconcile(
        &self,
        _dependent: &DependentRef,
        _primary: &Platform,
        _ctx: &ReconcileContext,
    ) -> anyhow::Result<Readiness> {
        Ok(Readiness::ready_at(
            "broker",
            Url::parse("amqp://mq.demo.internal:5672")?,
        ))
    }
}

struct Console;

#[async_trait]
impl DependentReconciler<Platform> for Console {
    async fn reconcile(
        &self,
        _dependent: &DependentRef,
        _primary: &Platform,
        _ctx: &ReconcileContext,
    ) -> anyhow::Result<Readiness> {
        Ok(Readiness::ready_at(
            "console",
            Url::parse("https://console.demo.internal")?,
        ))
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let reconciler = Reconciler::new(vec![
        Dependent::new(
            DependentRef::new("Database", "orders-db"),
            Database {
                attempts: AtomicUsize::new(0),
            },
        ),
        Dependent::new(DependentRef::new("Broker", "orders-events"), Broker)
            .guard(ConditionTrue::new("DatabaseReady")),
        Dependent::new(DependentRef::new("Console", "storefront"), Console)
            .guard(ConditionTrue::new("BrokerReady"))
            .optional(),
    ]);

    let primary = Platform {
        name: "orders".to_owned(),
        generation: 1,
    };

    let mut ledger = PlatformStatus::new();
    for pass in 1..=3 {
        ledger = reconciler
            .tick(&primary, ReconcileContext::new(), &ledger)
            .await?;
        info!(pass, phase = ?ledger.status(), "pass finished");
        println!("{}", serde_json::to_string_pretty(&ledger.json_patch())?);
    }

    Ok(())
}
