//! Structured audit logging for resource lifecycle events.
//!
//! Every mutating provider interaction (create, delete, associate,
//! disassociate, route change) emits an immutable [`AuditRecord`] with a
//! UTC timestamp, the acting module, the affected resource, and the
//! outcome. Records serialize to JSON for log-pipeline ingestion and are
//! emitted through `tracing` under the `audit` target.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audit event categories for lifecycle operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AuditCategory {
    /// Resource creation events.
    ResourceCreate,
    /// Resource modification events.
    ResourceModify,
    /// Resource deletion events.
    ResourceDelete,
    /// Relationship association events.
    Association,
    /// Relationship disassociation events.
    Disassociation,
    /// Route table entry changes.
    RouteChange,
    /// Error and failure events.
    ErrorCondition,
}

impl fmt::Display for AuditCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditCategory::ResourceCreate => write!(f, "RESOURCE_CREATE"),
            AuditCategory::ResourceModify => write!(f, "RESOURCE_MODIFY"),
            AuditCategory::ResourceDelete => write!(f, "RESOURCE_DELETE"),
            AuditCategory::Association => write!(f, "ASSOCIATION"),
            AuditCategory::Disassociation => write!(f, "DISASSOCIATION"),
            AuditCategory::RouteChange => write!(f, "ROUTE_CHANGE"),
            AuditCategory::ErrorCondition => write!(f, "ERROR_CONDITION"),
        }
    }
}

/// Outcome of an audited action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuditOutcome {
    /// Action completed successfully.
    Success,
    /// Action failed.
    Failure,
    /// Action is in progress (awaiting a retry).
    InProgress,
    /// Action was skipped by policy (e.g. external short-circuit).
    Skipped,
}

impl fmt::Display for AuditOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AuditOutcome::Success => write!(f, "success"),
            AuditOutcome::Failure => write!(f, "failure"),
            AuditOutcome::InProgress => write!(f, "in_progress"),
            AuditOutcome::Skipped => write!(f, "skipped"),
        }
    }
}

/// One structured audit record.
///
/// Immutable once built; the builder methods consume and return the
/// record so incomplete records never reach the log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    /// UTC timestamp of the event.
    pub timestamp: DateTime<Utc>,
    /// Event category.
    pub category: AuditCategory,
    /// Module generating the event (e.g. `VpcHandler`).
    pub source: String,
    /// Action performed (e.g. `create_vpc`).
    pub action: String,
    /// Outcome of the action.
    pub outcome: AuditOutcome,
    /// Affected resource identifier (e.g. `vpc-1234`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_id: Option<String>,
    /// Affected resource type (e.g. `vpc`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub object_type: Option<String>,
    /// Additional context as JSON.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    /// Error message when the outcome is a failure.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl AuditRecord {
    /// Creates a record with the current timestamp; the outcome defaults
    /// to in-progress until set.
    pub fn new(
        category: AuditCategory,
        source: impl Into<String>,
        action: impl Into<String>,
    ) -> Self {
        Self {
            timestamp: Utc::now(),
            category,
            source: source.into(),
            action: action.into(),
            outcome: AuditOutcome::InProgress,
            object_id: None,
            object_type: None,
            details: None,
            error: None,
        }
    }

    /// Sets the outcome.
    pub fn with_outcome(mut self, outcome: AuditOutcome) -> Self {
        self.outcome = outcome;
        self
    }

    /// Sets the affected resource identifier.
    pub fn with_object_id(mut self, id: impl Into<String>) -> Self {
        self.object_id = Some(id.into());
        self
    }

    /// Sets the affected resource type.
    pub fn with_object_type(mut self, object_type: impl Into<String>) -> Self {
        self.object_type = Some(object_type.into());
        self
    }

    /// Attaches additional JSON context.
    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    /// Sets the error message and marks the outcome as failure.
    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self.outcome = AuditOutcome::Failure;
        self
    }

    /// Serializes the record to JSON.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self)
            .unwrap_or_else(|e| format!(r#"{{"error":"serialization_failed","message":"{}"}}"#, e))
    }
}

/// Emits an [`AuditRecord`] through `tracing` under the `audit` target,
/// at a level derived from the outcome.
///
/// # Usage
/// ```ignore
/// audit_log!(
///     AuditRecord::new(AuditCategory::ResourceCreate, "VpcHandler", "create_vpc")
///         .with_outcome(AuditOutcome::Success)
///         .with_object_id(vpc_id)
/// );
/// ```
#[macro_export]
macro_rules! audit_log {
    ($record:expr) => {
        let record = $record;
        match record.outcome {
            $crate::audit::AuditOutcome::Success | $crate::audit::AuditOutcome::Skipped => {
                tracing::info!(
                    target: "audit",
                    category = %record.category,
                    source = %record.source,
                    action = %record.action,
                    outcome = %record.outcome,
                    audit_json = %record.to_json(),
                    "AUDIT: {} - {} - {}",
                    record.category,
                    record.action,
                    record.outcome
                );
            }
            $crate::audit::AuditOutcome::InProgress => {
                tracing::debug!(
                    target: "audit",
                    category = %record.category,
                    source = %record.source,
                    action = %record.action,
                    outcome = %record.outcome,
                    audit_json = %record.to_json(),
                    "AUDIT: {} - {} - {}",
                    record.category,
                    record.action,
                    record.outcome
                );
            }
            $crate::audit::AuditOutcome::Failure => {
                tracing::warn!(
                    target: "audit",
                    category = %record.category,
                    source = %record.source,
                    action = %record.action,
                    outcome = %record.outcome,
                    error = record.error.as_deref().unwrap_or(""),
                    audit_json = %record.to_json(),
                    "AUDIT: {} - {} - {}",
                    record.category,
                    record.action,
                    record.outcome
                );
            }
        }
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_audit_record_creation() {
        let record = AuditRecord::new(AuditCategory::ResourceCreate, "VpcHandler", "create_vpc")
            .with_outcome(AuditOutcome::Success)
            .with_object_id("vpc-1234")
            .with_object_type("vpc");

        assert_eq!(record.category, AuditCategory::ResourceCreate);
        assert_eq!(record.source, "VpcHandler");
        assert_eq!(record.action, "create_vpc");
        assert_eq!(record.outcome, AuditOutcome::Success);
        assert_eq!(record.object_id, Some("vpc-1234".to_string()));
        assert_eq!(record.object_type, Some("vpc".to_string()));
    }

    #[test]
    fn test_audit_record_with_error_sets_failure() {
        let record = AuditRecord::new(AuditCategory::ErrorCondition, "VpcHandler", "delete_vpc")
            .with_error("DependencyViolation: vpc has attached resources");

        assert_eq!(record.outcome, AuditOutcome::Failure);
        assert!(record.error.unwrap().contains("DependencyViolation"));
    }

    #[test]
    fn test_audit_record_json_omits_empty_fields() {
        let record = AuditRecord::new(AuditCategory::RouteChange, "RouteTableHandler", "add_route")
            .with_outcome(AuditOutcome::Success);

        let json = record.to_json();
        assert!(json.contains("\"ROUTE_CHANGE\""));
        assert!(json.contains("\"success\""));
        assert!(!json.contains("object_id"));
        assert!(!json.contains("error"));
    }

    #[test]
    fn test_audit_record_json_round_trip() {
        let record = AuditRecord::new(AuditCategory::Association, "VolumeAttachment", "attach")
            .with_outcome(AuditOutcome::Success)
            .with_object_id("vol-1")
            .with_details(serde_json::json!({"instance_id": "i-1"}));

        let back: AuditRecord = serde_json::from_str(&record.to_json()).unwrap();
        assert_eq!(back.category, AuditCategory::Association);
        assert_eq!(back.object_id, Some("vol-1".to_string()));
        assert_eq!(back.details.unwrap()["instance_id"], "i-1");
    }

    #[test]
    fn test_category_display() {
        assert_eq!(AuditCategory::ResourceCreate.to_string(), "RESOURCE_CREATE");
        assert_eq!(AuditCategory::Disassociation.to_string(), "DISASSOCIATION");
        assert_eq!(AuditOutcome::Skipped.to_string(), "skipped");
    }
}
