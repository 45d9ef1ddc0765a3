//! Per-tick evaluation context.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::condition::Condition;

/// The read-only cache one reconciliation pass evaluates against.
///
/// Guards perform no I/O of their own: the caller observes the live state of
/// each dependent once before the tick and records it here under a key of its
/// choosing (conventionally the dependent name). During the tick, the loop
/// refreshes the condition view after every dependent, so a guard evaluated
/// later in the pass sees the conditions recorded earlier in the same pass.
#[derive(Clone, Debug, Default)]
pub struct ReconcileContext {
    observed: BTreeMap<String, serde_json::Value>,
    conditions: Arc<[Condition]>,
}

impl ReconcileContext {
    /// An empty context with nothing observed.
    pub fn new() -> Self {
        Default::default()
    }

    /// Record the pre-fetched live state of a dependent under `key`,
    /// replacing anything previously recorded there.
    pub fn observe(&mut self, key: &str, state: serde_json::Value) {
        self.observed.insert(key.to_owned(), state);
    }

    /// The observed state recorded under `key`, if any.
    pub fn observed(&self, key: &str) -> Option<&serde_json::Value> {
        self.observed.get(key)
    }

    /// The condition view as of the most recent refresh.
    pub fn conditions(&self) -> Arc<[Condition]> {
        self.conditions.clone()
    }

    /// Look up a condition by type in the current view.
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    pub(crate) fn refresh_conditions(&mut self, conditions: Arc<[Condition]>) {
        self.conditions = conditions;
    }
}
