//! Condition-gated reconciliation and status aggregation for platform
//! operators.
//!
//! `capstan` is the control-loop core of an operator managing a composite
//! platform: a primary resource realized by several dependent resources (a
//! database, a message broker, a web console) that become ready in a given
//! order. Each dependent is gated by a [`Guard`] -- a composable boolean
//! predicate over the per-pass [`ReconcileContext`] -- and reported as one
//! [`Condition`] in the [`PlatformStatus`] ledger that every call to
//! [`Reconciler::tick`] rebuilds: one condition per dependent, endpoints for
//! whatever is ready, and an overall [`Phase`].
//!
//! The crate performs no I/O and spawns nothing. Watch queues, API traffic,
//! and persistence of the returned ledger belong to the surrounding
//! framework; this crate only decides what may run and what the status says
//! afterwards.
//!
//! # Example
//! ```rust
//! use capstan::{
//!     ConditionTrue, Dependent, DependentReconciler, DependentRef, PlatformStatus, Readiness,
//!     ReconcileContext, Reconciler,
//! };
//!
//! struct Platform {
//!     generation: i64,
//! }
//!
//! impl capstan::Primary for Platform {
//!     fn generation(&self) -> i64 {
//!         self.generation
//!     }
//!
//!     fn name(&self) -> &str {
//!         "demo"
//!     }
//! }
//!
//! struct Database;
//!
//! #[async_trait::async_trait]
//! impl DependentReconciler<Platform> for Database {
//!     async fn reconcile(
//!         &self,
//!         _dependent: &DependentRef,
//!         _primary: &Platform,
//!         _ctx: &ReconcileContext,
//!     ) -> anyhow::Result<Readiness> {
//!         Ok(Readiness::ready_at(
//!             "database",
//!             url::Url::parse("postgres://db.internal:5432")?,
//!         ))
//!     }
//! }
//! # struct Gateway;
//! # #[async_trait::async_trait]
//! # impl DependentReconciler<Platform> for Gateway {
//! #     async fn reconcile(
//! #         &self,
//! #         _dependent: &DependentRef,
//! #         _primary: &Platform,
//! #         _ctx: &ReconcileContext,
//! #     ) -> anyhow::Result<Readiness> {
//! #         Ok(Readiness::ready())
//! #     }
//! # }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     // The gateway is only reconciled once the database's condition holds.
//!     let reconciler = Reconciler::new(vec![
//!         Dependent::new(DependentRef::new("Database", "users-db"), Database),
//!         Dependent::new(DependentRef::new("Gateway", "edge"), Gateway)
//!             .guard(ConditionTrue::new("DatabaseReady")),
//!     ]);
//!
//!     let primary = Platform { generation: 1 };
//!     let ledger = reconciler
//!         .tick(&primary, ReconcileContext::new(), &PlatformStatus::new())
//!         .await?;
//!
//!     println!("{}", ledger.json_patch());
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]

pub mod condition;
pub mod context;
pub mod dependent;
pub mod guard;
pub mod reconcile;
pub mod status;

#[doc(inline)]
pub use condition::{Condition, ConditionStatus};
#[doc(inline)]
pub use context::ReconcileContext;
#[doc(inline)]
pub use dependent::{Dependent, DependentReconciler, DependentRef, Readiness};
#[doc(inline)]
pub use guard::{AllOf, AnyOf, ConditionTrue, Guard, Not, ObservedEquals};
#[doc(inline)]
pub use reconcile::{Primary, Reconciler};
#[doc(inline)]
pub use status::{EmptyConditionType, Phase, PlatformStatus};
