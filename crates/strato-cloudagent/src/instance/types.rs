//! Instance types, property and provider-field names.

use std::fmt;
use std::str::FromStr;

/// Declared property: machine image identifier (required).
pub const IMAGE_ID: &str = "image_id";

/// Declared property: instance size/type (required).
pub const INSTANCE_TYPE: &str = "instance_type";

/// Runtime attribute: private IP address.
pub const PRIVATE_IP_ATTR: &str = "private_ip_address";

/// Runtime attribute: public IP address.
pub const PUBLIC_IP_ATTR: &str = "public_ip_address";

/// Provider record field holding the instance identifier.
pub const INSTANCE_ID_FIELD: &str = "InstanceId";

/// Provider record field holding the instance state.
pub const STATE_FIELD: &str = "State";

/// Provider record field holding the private IP.
pub const PRIVATE_IP_FIELD: &str = "PrivateIpAddress";

/// Provider record field holding the public IP.
pub const PUBLIC_IP_FIELD: &str = "PublicIpAddress";

/// Provider filter key locating an instance by identifier.
pub const INSTANCE_ID_FILTER: &str = "instance-id";

/// Provider error fragment meaning the instance does not exist.
pub const NOT_FOUND: &str = "InvalidInstanceID.NotFound";

/// Error type for unrecognized instance state strings.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unrecognized instance state: {0}")]
pub struct StateParseError(pub String);

/// Provider-side lifecycle state of a compute instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InstanceState {
    /// Launch accepted, resources not yet allocated.
    Pending,
    /// Instance is up.
    Running,
    /// Stop requested, still winding down.
    Stopping,
    /// Instance is halted but keeps its resources.
    Stopped,
    /// Terminate requested, still winding down.
    ShuttingDown,
    /// Instance is gone; the record lingers briefly.
    Terminated,
}

impl InstanceState {
    /// Returns true if the instance no longer runs and never will again.
    pub fn is_terminal(&self) -> bool {
        matches!(self, InstanceState::ShuttingDown | InstanceState::Terminated)
    }
}

impl fmt::Display for InstanceState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InstanceState::Pending => "pending",
            InstanceState::Running => "running",
            InstanceState::Stopping => "stopping",
            InstanceState::Stopped => "stopped",
            InstanceState::ShuttingDown => "shutting-down",
            InstanceState::Terminated => "terminated",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for InstanceState {
    type Err = StateParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(InstanceState::Pending),
            "running" => Ok(InstanceState::Running),
            "stopping" => Ok(InstanceState::Stopping),
            "stopped" => Ok(InstanceState::Stopped),
            "shutting-down" => Ok(InstanceState::ShuttingDown),
            "terminated" => Ok(InstanceState::Terminated),
            other => Err(StateParseError(other.to_string())),
        }
    }
}
