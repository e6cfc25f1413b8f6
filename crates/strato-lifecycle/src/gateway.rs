//! Provider gateway.
//!
//! A stateless call wrapper around the provider SDK that normalizes
//! provider exceptions into the engine's error taxonomy: any provider
//! error becomes a fatal [`LifecycleError::Provider`] carrying the
//! provider's message verbatim, and an empty result is optionally
//! promoted to [`LifecycleError::EmptyResponse`].

use crate::task::{LifecycleError, LifecycleResult};
use serde_json::Value;
use thiserror::Error;

/// Error raised by a provider SDK call.
///
/// The engine distinguishes exactly two families: service/response errors
/// and client/parameter errors. Both are non-recoverable as far as one
/// invocation is concerned; the caller decides whether a later, different
/// retry makes sense.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The service rejected or failed the request.
    #[error("{message}")]
    Service { message: String },

    /// The request itself was malformed (bad parameter, bad filter).
    #[error("{message}")]
    Client { message: String },
}

impl ProviderError {
    /// Creates a service error.
    pub fn service(message: impl Into<String>) -> Self {
        ProviderError::Service {
            message: message.into(),
        }
    }

    /// Creates a client error.
    pub fn client(message: impl Into<String>) -> Self {
        ProviderError::Client {
            message: message.into(),
        }
    }

    /// Returns the provider's message.
    pub fn message(&self) -> &str {
        match self {
            ProviderError::Service { message } | ProviderError::Client { message } => message,
        }
    }
}

/// Payloads that can be checked for an empty / false-equivalent result.
pub trait Payload {
    /// Returns true if the payload carries nothing usable.
    fn is_empty_payload(&self) -> bool;
}

impl Payload for bool {
    fn is_empty_payload(&self) -> bool {
        !self
    }
}

impl Payload for () {
    fn is_empty_payload(&self) -> bool {
        false
    }
}

impl Payload for String {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

impl<T> Payload for Option<T> {
    fn is_empty_payload(&self) -> bool {
        self.is_none()
    }
}

impl<T> Payload for Vec<T> {
    fn is_empty_payload(&self) -> bool {
        self.is_empty()
    }
}

impl Payload for Value {
    fn is_empty_payload(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Bool(b) => !b,
            Value::String(s) => s.is_empty(),
            Value::Array(a) => a.is_empty(),
            Value::Object(o) => o.is_empty(),
            Value::Number(_) => false,
        }
    }
}

/// Executes one provider call, translating failures into the engine's
/// error taxonomy.
///
/// `operation` names the call for diagnostics only. With `raise_on_empty`,
/// a call that completes but yields an empty/false-equivalent payload is
/// promoted to a fatal [`LifecycleError::EmptyResponse`].
pub fn execute<T, F>(operation: &str, call: F, raise_on_empty: bool) -> LifecycleResult<T>
where
    T: Payload,
    F: FnOnce() -> Result<T, ProviderError>,
{
    let result = call().map_err(|err| {
        log::debug!("provider call {} failed: {}", operation, err.message());
        LifecycleError::provider(err.message())
    })?;

    if raise_on_empty && result.is_empty_payload() {
        log::debug!("provider call {} returned an empty result", operation);
        return Err(LifecycleError::empty_response(operation));
    }

    Ok(result)
}
