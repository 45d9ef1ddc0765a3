//! The per-pass aggregation loop.
//!
//! A [`Reconciler`] owns the ordered dependents of one platform shape. Each
//! call to [`Reconciler::tick`] works through them once: every dependent is
//! gated by its guard, reconciled if the guard is met, and folded into a new
//! [`PlatformStatus`] -- one condition per dependent, endpoints for whatever
//! is ready, and an overall phase. The caller persists the returned ledger
//! as a single status update.

use std::collections::BTreeMap;

use anyhow::Context;
use tracing::{debug, warn};

use crate::condition::{Condition, ConditionStatus};
use crate::context::ReconcileContext;
use crate::dependent::{Dependent, Readiness};
use crate::status::{Phase, PlatformStatus};

/// Read-only view of the primary resource driving a reconciliation pass.
pub trait Primary: 'static + Sync + Send {
    /// Generation of the primary's desired state, bumped by the API
    /// machinery whenever the desired state changes.
    fn generation(&self) -> i64;

    /// Name of the primary instance, used in logs and status messages.
    fn name(&self) -> &str;

    /// Namespace of the primary instance, if namespaced.
    fn namespace(&self) -> Option<&str> {
        None
    }
}

/// Drives the dependents of a primary through one pass at a time.
///
/// The dependent list is fixed at construction, in topological order: a
/// dependent comes after every dependent its guard watches. Resolving that
/// order is the caller's job; the reconciler just walks it.
pub struct Reconciler<P: Primary> {
    dependents: Vec<Dependent<P>>,
}

impl<P: Primary> Reconciler<P> {
    /// A reconciler processing `dependents` in the given order every pass.
    pub fn new(dependents: Vec<Dependent<P>>) -> Self {
        Reconciler { dependents }
    }

    /// Run one reconciliation pass and return the next status ledger.
    ///
    /// The prior ledger is never mutated. On success the returned ledger is
    /// its complete replacement; on error the prior ledger remains the
    /// externally visible truth and the pass can simply be rerun. The only
    /// error here is a guard that could not be evaluated -- an unreadable
    /// precondition is not the same as an unmet one, so it is never treated
    /// as `false`.
    ///
    /// When the primary's generation is already recorded, the phase is
    /// `Ready`, and every condition holds, the pass returns the prior ledger
    /// unchanged without touching any reconciler.
    #[tracing::instrument(
        level = "debug",
        skip(self, primary, ctx, prior),
        fields(name = %primary.name(), generation = primary.generation())
    )]
    pub async fn tick(
        &self,
        primary: &P,
        mut ctx: ReconcileContext,
        prior: &PlatformStatus,
    ) -> anyhow::Result<PlatformStatus> {
        let mut ledger = prior.clone();

        if self.settled(primary, &ledger) {
            debug!("desired state unchanged and all conditions hold, confirming status");
            return Ok(ledger);
        }

        ctx.refresh_conditions(ledger.conditions());
        let mut endpoints = BTreeMap::new();
        let mut failures: Vec<String> = Vec::new();

        for entry in &self.dependents {
            let met = entry
                .guard
                .is_met(&entry.dependent, primary, &ctx)
                .with_context(|| format!("evaluating guard for {}", entry.dependent))?;

            let condition = if !met {
                debug!(dependent = %entry.dependent, "guard not met, skipping");
                Condition::new(
                    &entry.condition_type,
                    ConditionStatus::Unknown,
                    "Blocked",
                    &format!("{} is waiting on its preconditions", entry.dependent),
                )
            } else {
                match entry
                    .reconciler
                    .reconcile(&entry.dependent, primary, &ctx)
                    .await
                {
                    Ok(Readiness::Ready {
                        endpoints: published,
                    }) => {
                        debug!(dependent = %entry.dependent, "dependent ready");
                        endpoints.extend(published);
                        Condition::new(&entry.condition_type, ConditionStatus::True, "Ready", "")
                    }
                    Ok(Readiness::InProgress { message }) => {
                        debug!(dependent = %entry.dependent, message = %message, "dependent converging");
                        Condition::new(
                            &entry.condition_type,
                            ConditionStatus::False,
                            "Progressing",
                            &message,
                        )
                    }
                    Ok(Readiness::Failed { message }) => {
                        warn!(dependent = %entry.dependent, message = %message, "dependent failed");
                        failures.push(format!("{}: {}", entry.dependent, message));
                        Condition::new(
                            &entry.condition_type,
                            ConditionStatus::False,
                            "Failed",
                            &message,
                        )
                    }
                    Err(e) => {
                        warn!(dependent = %entry.dependent, error = %e, "dependent reconciliation errored");
                        Condition::new(
                            &entry.condition_type,
                            ConditionStatus::Unknown,
                            "ReconcileError",
                            &format!("{:#}", e),
                        )
                    }
                }
            };

            ledger.add_condition(condition)?;
            ctx.refresh_conditions(ledger.conditions());
        }

        let (phase, message) = if !failures.is_empty() {
            (
                Phase::Error,
                Some(format!("failed dependents: {}", failures.join("; "))),
            )
        } else if self.required_all_true(&ledger) {
            (Phase::Ready, None)
        } else {
            let waiting: Vec<&str> = self
                .dependents
                .iter()
                .filter(|entry| entry.required)
                .filter(|entry| !Self::holds(&ledger, &entry.condition_type))
                .map(|entry| entry.condition_type.as_str())
                .collect();
            (
                Phase::Progressing,
                Some(format!("waiting for: {}", waiting.join(", "))),
            )
        };

        ledger.set_status(phase);
        ledger.set_message(message);
        ledger.set_published_endpoints(endpoints);
        ledger.set_observed_generation(prior.observed_generation().max(primary.generation()));

        debug!(phase = ?ledger.status(), "pass complete");
        Ok(ledger)
    }

    fn settled(&self, primary: &P, ledger: &PlatformStatus) -> bool {
        primary.generation() == ledger.observed_generation()
            && ledger.status() == Phase::Ready
            && ledger.conditions().iter().all(Condition::is_true)
    }

    fn required_all_true(&self, ledger: &PlatformStatus) -> bool {
        self.dependents
            .iter()
            .filter(|entry| entry.required)
            .all(|entry| Self::holds(ledger, &entry.condition_type))
    }

    fn holds(ledger: &PlatformStatus, type_: &str) -> bool {
        ledger.condition(type_).map_or(false, Condition::is_true)
    }
}
