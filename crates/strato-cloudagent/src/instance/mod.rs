//! Compute instance resource module.
//!
//! Instances settle asynchronously: `run` returns a pending record whose
//! identifier is persisted at once, while start/stop re-derive provider
//! state on every invocation and hand unsettled transitions back to the
//! orchestrator's scheduler as retry directives.

mod handler;
mod types;

pub use handler::{InstanceApi, InstanceHandler};
pub use types::{
    InstanceState, StateParseError, IMAGE_ID, INSTANCE_ID_FIELD, INSTANCE_ID_FILTER,
    INSTANCE_TYPE, NOT_FOUND, PRIVATE_IP_ATTR, PUBLIC_IP_ATTR,
};
