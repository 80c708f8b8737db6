//! # Managed Resource Conditions
//!
//! `Ready` and `Synced` conditions written by the reconciliation driver.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Condition type reporting availability of the external resource
pub const TYPE_READY: &str = "Ready";
/// Condition type reporting the outcome of the last pass
pub const TYPE_SYNCED: &str = "Synced";

/// Condition represents a condition of a resource
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Condition {
    /// Type of condition
    pub r#type: String,
    /// Status of the condition (True, False, Unknown)
    pub status: String,
    /// Last transition time
    #[serde(default)]
    pub last_transition_time: Option<String>,
    /// Reason for the condition
    #[serde(default)]
    pub reason: Option<String>,
    /// Message describing the condition
    #[serde(default)]
    pub message: Option<String>,
}

impl Condition {
    fn new(r#type: &str, status: &str, reason: &str, message: Option<String>) -> Self {
        Self {
            r#type: r#type.to_string(),
            status: status.to_string(),
            last_transition_time: Some(chrono::Utc::now().to_rfc3339()),
            reason: Some(reason.to_string()),
            message,
        }
    }

    /// The external resource exists and is usable
    #[must_use]
    pub fn available() -> Self {
        Self::new(TYPE_READY, "True", "Available", None)
    }

    /// The external resource is being created
    #[must_use]
    pub fn creating() -> Self {
        Self::new(TYPE_READY, "False", "Creating", None)
    }

    /// The external resource is being deleted
    #[must_use]
    pub fn deleting() -> Self {
        Self::new(TYPE_READY, "False", "Deleting", None)
    }

    /// The external resource is not usable
    #[must_use]
    pub fn unavailable() -> Self {
        Self::new(TYPE_READY, "False", "Unavailable", None)
    }

    /// The last pass completed
    #[must_use]
    pub fn reconcile_success() -> Self {
        Self::new(TYPE_SYNCED, "True", "ReconcileSuccess", None)
    }

    /// The last pass failed with the given message
    #[must_use]
    pub fn reconcile_error(message: impl Into<String>) -> Self {
        Self::new(TYPE_SYNCED, "False", "ReconcileError", Some(message.into()))
    }

    /// Same type, status, reason and message; transition time is ignored
    #[must_use]
    pub fn equivalent(&self, other: &Self) -> bool {
        self.r#type == other.r#type
            && self.status == other.status
            && self.reason == other.reason
            && self.message == other.message
    }
}

/// Insert or replace a condition by type
///
/// The existing transition time is kept when nothing but the timestamp changed,
/// so repeated passes do not churn the status.
pub fn set_condition(conditions: &mut Vec<Condition>, condition: Condition) {
    match conditions.iter_mut().find(|c| c.r#type == condition.r#type) {
        Some(existing) if existing.equivalent(&condition) => {}
        Some(existing) => *existing = condition,
        None => conditions.push(condition),
    }
}

/// Find a condition by type
#[must_use]
pub fn get_condition<'a>(conditions: &'a [Condition], r#type: &str) -> Option<&'a Condition> {
    conditions.iter().find(|c| c.r#type == r#type)
}
