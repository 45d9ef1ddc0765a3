//! Named, timestamped condition records.
//!
//! A [`Condition`] is one tri-state observation about the platform (for
//! example `DatabaseReady`), published as part of the status and keyed by its
//! `type`. External consumers watch a condition type for status `"True"`
//! rather than polling the resources behind it.

use chrono::{DateTime, Utc};

/// The tri-state verdict of a condition observation.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Deserialize, serde::Serialize)]
pub enum ConditionStatus {
    /// The observation holds.
    True,
    /// The observation was made and does not hold.
    False,
    /// The observation could not be made.
    Unknown,
}

impl Default for ConditionStatus {
    fn default() -> Self {
        Self::Unknown
    }
}

/// A named, timestamped observation recorded in the published status.
///
/// Conditions are wire types with public fields. Well-formedness (a nonempty
/// `type`) is checked where conditions enter a
/// [`PlatformStatus`](crate::PlatformStatus), which also owns the transition
/// timestamp rule: a rewrite that keeps the same status keeps the previous
/// `last_transition_time`.
#[derive(Clone, Debug, PartialEq, serde::Deserialize, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// What this condition reports on, unique within a status.
    #[serde(rename = "type")]
    pub type_: String,
    /// Current verdict for this condition type.
    pub status: ConditionStatus,
    /// Machine-readable token for why the condition has this status.
    pub reason: String,
    /// Human-readable detail for whoever reads the status.
    pub message: String,
    /// When `status` last changed for this type.
    pub last_transition_time: DateTime<Utc>,
}

impl Condition {
    /// Create a condition observed now.
    pub fn new(type_: &str, status: ConditionStatus, reason: &str, message: &str) -> Self {
        Condition {
            type_: type_.to_owned(),
            status,
            reason: reason.to_owned(),
            message: message.to_owned(),
            last_transition_time: Utc::now(),
        }
    }

    /// Whether this condition currently holds.
    pub fn is_true(&self) -> bool {
        self.status == ConditionStatus::True
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_status_serializes_as_bare_word() {
        assert_eq!(
            serde_json::to_value(ConditionStatus::True).unwrap(),
            serde_json::json!("True")
        );
        assert_eq!(
            serde_json::to_value(ConditionStatus::Unknown).unwrap(),
            serde_json::json!("Unknown")
        );
    }

    #[test]
    fn test_condition_wire_field_names() {
        let condition = Condition::new("DatabaseReady", ConditionStatus::False, "Provisioning", "");
        let value = serde_json::to_value(&condition).unwrap();
        assert_eq!(value["type"], serde_json::json!("DatabaseReady"));
        assert_eq!(value["status"], serde_json::json!("False"));
        assert!(value.get("lastTransitionTime").is_some());
        assert!(value.get("last_transition_time").is_none());
    }

    #[test]
    fn test_condition_round_trip() {
        let condition = Condition::new(
            "BrokerReady",
            ConditionStatus::True,
            "Ready",
            "broker accepting connections",
        );
        let json = serde_json::to_string(&condition).unwrap();
        let back: Condition = serde_json::from_str(&json).unwrap();
        assert_eq!(back, condition);
    }

    #[test]
    fn test_timestamp_is_rfc3339() {
        let condition = Condition::new("ConsoleReady", ConditionStatus::Unknown, "Blocked", "");
        let value = serde_json::to_value(&condition).unwrap();
        let raw = value["lastTransitionTime"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(raw).is_ok());
    }
}
