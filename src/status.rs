//! The published status ledger for a platform resource.
//!
//! [`PlatformStatus`] is what the surrounding framework persists after each
//! reconciliation pass: overall phase, an optional explanation, the endpoint
//! map for ready dependents, the last observed generation of the primary, and
//! the list of [`Condition`] records. The condition list is copy-on-write:
//! every mutation builds a fresh snapshot, so a snapshot handed out earlier
//! never changes underneath its holder.

use std::collections::BTreeMap;
use std::sync::Arc;

use thiserror::Error;
use url::Url;

use crate::condition::Condition;

/// Overall health of the platform, derived from its dependents.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum Phase {
    /// No reconciliation outcome has been recorded yet.
    Unknown,
    /// Reconciliation is underway and nothing has failed irrecoverably.
    Progressing,
    /// Every required dependent is ready.
    Ready,
    /// At least one dependent failed irrecoverably.
    Error,
}

impl Default for Phase {
    fn default() -> Self {
        Self::Unknown
    }
}

/// Returned when a condition with an empty or blank `type` is offered to the
/// ledger.
#[derive(Error, Debug)]
#[error("condition type must not be empty")]
pub struct EmptyConditionType;

/// The externally published status of a platform resource.
///
/// One ledger belongs to one primary resource instance and is only ever
/// mutated by the single reconciliation pass currently processing that
/// instance. Setters do plain field replacement; cross-field rules (monotonic
/// `observed_generation`, phase derivation) live in the reconciliation loop,
/// which knows both the prior and the incoming value.
///
/// Serialization omits empty collections and an unset message, and restores
/// them as their defaults, so a round-trip reproduces every populated field
/// exactly.
#[derive(Clone, Debug, Default, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlatformStatus {
    status: Phase,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    published_endpoints: BTreeMap<String, Url>,
    observed_generation: i64,
    #[serde(default, skip_serializing_if = "no_conditions")]
    conditions: Arc<[Condition]>,
}

fn no_conditions(conditions: &Arc<[Condition]>) -> bool {
    conditions.is_empty()
}

impl PlatformStatus {
    /// An empty ledger: phase `Unknown`, nothing published, generation 0, no
    /// conditions.
    pub fn new() -> Self {
        Default::default()
    }

    /// Overall phase.
    pub fn status(&self) -> Phase {
        self.status
    }

    /// Replace the overall phase.
    pub fn set_status(&mut self, status: Phase) {
        self.status = status;
    }

    /// Explanation of a non-`Ready` phase, if one is set.
    pub fn message(&self) -> Option<&str> {
        self.message.as_deref()
    }

    /// Replace or clear the explanation message.
    pub fn set_message(&mut self, message: Option<String>) {
        self.message = message;
    }

    /// Connection endpoints of ready dependents, keyed by endpoint name.
    pub fn published_endpoints(&self) -> &BTreeMap<String, Url> {
        &self.published_endpoints
    }

    /// Replace the published endpoint map wholesale.
    pub fn set_published_endpoints(&mut self, endpoints: BTreeMap<String, Url>) {
        self.published_endpoints = endpoints;
    }

    /// The primary generation most recently folded into this status.
    pub fn observed_generation(&self) -> i64 {
        self.observed_generation
    }

    /// Record an observed generation.
    pub fn set_observed_generation(&mut self, generation: i64) {
        self.observed_generation = generation;
    }

    /// The current condition snapshot.
    ///
    /// The snapshot is immutable: later ledger updates swap in a new one
    /// rather than touching it, so it is safe to hold across mutations.
    /// Between mutations, repeated calls return the same allocation.
    pub fn conditions(&self) -> Arc<[Condition]> {
        self.conditions.clone()
    }

    /// Look up the recorded condition of the given type.
    pub fn condition(&self, type_: &str) -> Option<&Condition> {
        self.conditions.iter().find(|c| c.type_ == type_)
    }

    /// Record one condition, replacing any existing record of the same type.
    ///
    /// A record of a new type is appended; a record of a known type takes the
    /// existing record's position, and keeps its `last_transition_time` when
    /// the status did not change. A blank `type` is rejected and leaves the
    /// ledger unmodified.
    pub fn add_condition(&mut self, condition: Condition) -> Result<(), EmptyConditionType> {
        self.add_conditions(std::iter::once(condition))
    }

    /// Record a batch of conditions as one update.
    ///
    /// Records are applied in iteration order with [`add_condition`]
    /// semantics, but the snapshot is swapped once for the whole batch, and
    /// the whole batch is validated up front: any blank `type` leaves the
    /// ledger unmodified.
    ///
    /// [`add_condition`]: PlatformStatus::add_condition
    pub fn add_conditions(
        &mut self,
        conditions: impl IntoIterator<Item = Condition>,
    ) -> Result<(), EmptyConditionType> {
        let incoming: Vec<Condition> = conditions.into_iter().collect();
        if incoming.iter().any(|c| c.type_.trim().is_empty()) {
            return Err(EmptyConditionType);
        }
        if incoming.is_empty() {
            return Ok(());
        }
        let mut next = self.conditions.to_vec();
        for mut condition in incoming {
            match next.iter_mut().find(|c| c.type_ == condition.type_) {
                Some(existing) => {
                    if existing.status == condition.status {
                        condition.last_transition_time = existing.last_transition_time;
                    }
                    *existing = condition;
                }
                None => next.push(condition),
            }
        }
        self.conditions = next.into();
        Ok(())
    }

    /// Render the `{"status": ...}` patch document that the surrounding
    /// framework persists as the status subresource.
    pub fn json_patch(&self) -> serde_json::Value {
        serde_json::json!({ "status": self })
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::condition::ConditionStatus;
    use chrono::Duration;

    fn ready(type_: &str) -> Condition {
        Condition::new(type_, ConditionStatus::True, "Ready", "")
    }

    #[test]
    fn test_new_ledger_is_empty() {
        let ledger = PlatformStatus::new();
        assert_eq!(ledger.status(), Phase::Unknown);
        assert_eq!(ledger.message(), None);
        assert!(ledger.published_endpoints().is_empty());
        assert_eq!(ledger.observed_generation(), 0);
        assert!(ledger.conditions().is_empty());
    }

    #[test]
    fn test_add_condition_preserves_insertion_order() {
        let mut ledger = PlatformStatus::new();
        ledger.add_condition(ready("DatabaseReady")).unwrap();
        ledger.add_condition(ready("BrokerReady")).unwrap();
        let snapshot = ledger.conditions();
        let types: Vec<&str> = snapshot.iter().map(|c| c.type_.as_str()).collect();
        assert_eq!(types, vec!["DatabaseReady", "BrokerReady"]);
    }

    #[test]
    fn test_upsert_replaces_in_place_without_duplicates() {
        let mut ledger = PlatformStatus::new();
        ledger
            .add_condition(Condition::new(
                "DatabaseReady",
                ConditionStatus::False,
                "Provisioning",
                "",
            ))
            .unwrap();
        ledger.add_condition(ready("BrokerReady")).unwrap();
        ledger.add_condition(ready("DatabaseReady")).unwrap();

        let snapshot = ledger.conditions();
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].type_, "DatabaseReady");
        assert_eq!(snapshot[0].status, ConditionStatus::True);
        assert_eq!(snapshot[1].type_, "BrokerReady");
    }

    #[test]
    fn test_transition_time_survives_same_status_rewrite() {
        let mut ledger = PlatformStatus::new();
        ledger
            .add_condition(Condition::new(
                "DatabaseReady",
                ConditionStatus::False,
                "Provisioning",
                "",
            ))
            .unwrap();
        let first_seen = ledger.condition("DatabaseReady").unwrap().last_transition_time;

        let mut rewrite =
            Condition::new("DatabaseReady", ConditionStatus::False, "Provisioning", "retrying");
        rewrite.last_transition_time = first_seen + Duration::seconds(60);
        ledger.add_condition(rewrite).unwrap();

        let current = ledger.condition("DatabaseReady").unwrap();
        assert_eq!(current.last_transition_time, first_seen);
        assert_eq!(current.message, "retrying");

        let mut flipped = ready("DatabaseReady");
        flipped.last_transition_time = first_seen + Duration::seconds(120);
        ledger.add_condition(flipped).unwrap();
        assert_eq!(
            ledger.condition("DatabaseReady").unwrap().last_transition_time,
            first_seen + Duration::seconds(120)
        );
    }

    #[test]
    fn test_snapshots_never_change_after_handout() {
        let mut ledger = PlatformStatus::new();
        ledger.add_condition(ready("DatabaseReady")).unwrap();

        let before = ledger.conditions();
        let again = ledger.conditions();
        assert!(Arc::ptr_eq(&before, &again));

        ledger.add_condition(ready("BrokerReady")).unwrap();
        assert_eq!(before.len(), 1);
        assert_eq!(before[0].type_, "DatabaseReady");
        assert_eq!(ledger.conditions().len(), 2);
    }

    #[test]
    fn test_blank_type_rejected_without_side_effects() {
        let mut ledger = PlatformStatus::new();
        ledger.add_condition(ready("DatabaseReady")).unwrap();
        let before = ledger.conditions();

        let result = ledger.add_conditions(vec![ready("BrokerReady"), ready("  ")]);
        assert!(result.is_err());
        assert!(Arc::ptr_eq(&before, &ledger.conditions()));
    }

    #[test]
    fn test_batch_swaps_snapshot_once() {
        let mut ledger = PlatformStatus::new();
        ledger
            .add_conditions(vec![ready("DatabaseReady"), ready("BrokerReady")])
            .unwrap();
        assert_eq!(ledger.conditions().len(), 2);
    }

    #[test]
    fn test_minimal_ledger_serializes_without_empty_fields() {
        let value = serde_json::to_value(PlatformStatus::new()).unwrap();
        assert_eq!(value["status"], serde_json::json!("Unknown"));
        assert_eq!(value["observedGeneration"], serde_json::json!(0));
        assert!(value.get("message").is_none());
        assert!(value.get("publishedEndpoints").is_none());
        assert!(value.get("conditions").is_none());
    }

    #[test]
    fn test_round_trip_reproduces_populated_ledger() {
        let mut ledger = PlatformStatus::new();
        ledger.set_status(Phase::Ready);
        ledger.set_observed_generation(7);
        let mut endpoints = BTreeMap::new();
        endpoints.insert(
            "database".to_owned(),
            Url::parse("postgres://db.internal:5432").unwrap(),
        );
        ledger.set_published_endpoints(endpoints);
        ledger
            .add_conditions(vec![ready("DatabaseReady"), ready("BrokerReady")])
            .unwrap();

        let value = serde_json::to_value(&ledger).unwrap();
        assert_eq!(
            value["publishedEndpoints"]["database"],
            serde_json::json!("postgres://db.internal:5432")
        );
        assert!(value.get("published_endpoints").is_none());

        let json = serde_json::to_string(&ledger).unwrap();
        let back: PlatformStatus = serde_json::from_str(&json).unwrap();
        assert_eq!(back, ledger);
    }

    #[test]
    fn test_round_trip_restores_omitted_fields_as_defaults() {
        let back: PlatformStatus =
            serde_json::from_str(r#"{"status":"Progressing","observedGeneration":3}"#).unwrap();
        assert_eq!(back.status(), Phase::Progressing);
        assert_eq!(back.observed_generation(), 3);
        assert_eq!(back.message(), None);
        assert!(back.published_endpoints().is_empty());
        assert!(back.conditions().is_empty());
    }

    #[test]
    fn test_json_patch_wraps_wire_fields() {
        let mut ledger = PlatformStatus::new();
        ledger.set_status(Phase::Progressing);
        ledger.set_message(Some("waiting for: BrokerReady".to_owned()));
        ledger.set_observed_generation(2);
        ledger
            .add_condition(Condition::new(
                "BrokerReady",
                ConditionStatus::Unknown,
                "Blocked",
                "guard not met",
            ))
            .unwrap();

        let patch = ledger.json_patch();
        assert_eq!(patch["status"]["status"], serde_json::json!("Progressing"));
        assert_eq!(patch["status"]["observedGeneration"], serde_json::json!(2));
        assert_eq!(
            patch["status"]["conditions"][0]["type"],
            serde_json::json!("BrokerReady")
        );
        assert!(patch["status"]["conditions"][0]["lastTransitionTime"].is_string());
    }
}
