//! Lifecycle operation status and result types.
//!
//! Fatal conditions travel through [`LifecycleError`] on the `Err` channel;
//! "not ready yet, re-invoke me" travels through [`RetryDirective`] as an
//! explicit return value. The engine never turns a retry into an error or
//! an error into a retry — that distinction belongs to the caller's
//! scheduler.

use std::time::Duration;
use thiserror::Error;

/// A request to the orchestrator's scheduler to re-invoke the same
/// operation later.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryDirective {
    /// Human-readable reason shown to the operator while waiting.
    pub reason: String,
    /// Suggested re-invocation delay; `None` leaves it to the scheduler.
    pub delay: Option<Duration>,
}

impl RetryDirective {
    /// Creates a retry directive with no suggested delay.
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
            delay: None,
        }
    }

    /// Creates a retry directive with a suggested delay in seconds.
    pub fn after_secs(reason: impl Into<String>, secs: u64) -> Self {
        Self {
            reason: reason.into(),
            delay: Some(Duration::from_secs(secs)),
        }
    }
}

/// Result of one delegated resource-specific step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StepOutcome {
    /// The step's effect is in place.
    Done,
    /// The step completed without error but its effect is not in place.
    Unfulfilled,
    /// The provider has not settled yet; re-invoke later.
    Retry(RetryDirective),
}

impl StepOutcome {
    /// Returns true if the step's effect is in place.
    pub fn is_done(&self) -> bool {
        matches!(self, StepOutcome::Done)
    }
}

/// Result of one controller-level lifecycle operation, reported back to
/// the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    /// The operation settled; the orchestrator may advance the workflow.
    Complete,
    /// The operation is valid but unsettled; re-invoke later.
    Retry(RetryDirective),
}

impl Outcome {
    /// Returns true if the operation settled.
    pub fn is_complete(&self) -> bool {
        matches!(self, Outcome::Complete)
    }

    /// Returns the retry directive, if any.
    pub fn retry(&self) -> Option<&RetryDirective> {
        match self {
            Outcome::Retry(directive) => Some(directive),
            Outcome::Complete => None,
        }
    }
}

/// Error type for non-recoverable lifecycle failures.
///
/// Every variant means the declared intent cannot be satisfied as stated;
/// the orchestrator aborts the current workflow step rather than retrying.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LifecycleError {
    /// The provider rejected a call; the original message is preserved.
    #[error("provider error: {message}")]
    Provider { message: String },

    /// A call completed without error but returned nothing usable.
    #[error("{operation} completed without error but returned nothing usable")]
    EmptyResponse { operation: String },

    /// A declared-external resource could not be found at the provider.
    #[error("cannot use external {type_name} {resource_id}: not found in the provider account")]
    ExternalResourceMissing {
        type_name: String,
        resource_id: String,
    },

    /// A declared-managed resource already exists at the provider.
    #[error("{type_name} {resource_id} already exists at the provider but is not declared external")]
    ResourceConflict {
        type_name: String,
        resource_id: String,
    },

    /// Neither the external branch nor the delegated call produced a resource.
    #[error("{type_name} is neither an external nor a managed resource: nothing to create")]
    NothingToCreate { type_name: String },

    /// A delete was invoked on a resource the controller cannot find.
    #[error("cannot {operation} {type_name}: resource does not exist at the provider")]
    ForbiddenState {
        type_name: String,
        operation: String,
    },

    /// A required declared property is missing.
    #[error("required property {name} is not set")]
    MissingProperty { name: String },

    /// A route entry's next-hop fields violate the exactly-one rule.
    #[error("invalid route: {0}")]
    InvalidNextHop(#[from] strato_types::NextHopError),

    /// A relationship lookup expected exactly one target.
    #[error("expected exactly one {type_name} relationship target, found {count}")]
    AmbiguousRelationship { type_name: String, count: usize },

    /// Neither the external short-circuit nor the delegated call succeeded.
    #[error("source is neither externally owned nor a managed resource, cannot {operation} {type_name}")]
    RelationshipUnfulfilled {
        type_name: String,
        operation: String,
    },
}

impl LifecycleError {
    /// Creates a provider error preserving the provider's message verbatim.
    pub fn provider(message: impl Into<String>) -> Self {
        LifecycleError::Provider {
            message: message.into(),
        }
    }

    /// Creates an empty-response error for the named operation.
    pub fn empty_response(operation: impl Into<String>) -> Self {
        LifecycleError::EmptyResponse {
            operation: operation.into(),
        }
    }

    /// Creates a missing-property error.
    pub fn missing_property(name: impl Into<String>) -> Self {
        LifecycleError::MissingProperty { name: name.into() }
    }
}

/// Result type for lifecycle operations.
pub type LifecycleResult<T> = Result<T, LifecycleError>;

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_retry_directive() {
        let directive = RetryDirective::after_secs("instance still pending", 30);
        assert_eq!(directive.reason, "instance still pending");
        assert_eq!(directive.delay, Some(Duration::from_secs(30)));

        let directive = RetryDirective::new("waiting");
        assert_eq!(directive.delay, None);
    }

    #[test]
    fn test_outcome_classification() {
        assert!(Outcome::Complete.is_complete());
        assert!(Outcome::Complete.retry().is_none());

        let outcome = Outcome::Retry(RetryDirective::new("pending"));
        assert!(!outcome.is_complete());
        assert_eq!(outcome.retry().unwrap().reason, "pending");
    }

    #[test]
    fn test_step_outcome() {
        assert!(StepOutcome::Done.is_done());
        assert!(!StepOutcome::Unfulfilled.is_done());
        assert!(!StepOutcome::Retry(RetryDirective::new("x")).is_done());
    }

    #[test]
    fn test_error_messages_preserve_provider_text() {
        let err = LifecycleError::provider("InvalidParameterValue: bad CIDR");
        assert_eq!(
            err.to_string(),
            "provider error: InvalidParameterValue: bad CIDR"
        );
    }

    #[test]
    fn test_next_hop_error_conversion() {
        let route = strato_types::RouteSpec::to("10.0.0.0/8");
        let err: LifecycleError = route.next_hop().unwrap_err().into();
        assert!(err.to_string().contains("no next hop"));
    }
}
