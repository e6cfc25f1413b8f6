//! Peering connection property, attribute and provider-field names.

/// Declared property: the peer VPC's identifier (required).
pub const PEER_VPC_ID: &str = "peer_vpc_id";

/// Declared property: the peer VPC's CIDR block (required; becomes the
/// destination of peering routes).
pub const PEER_CIDR_BLOCK: &str = "peer_cidr_block";

/// Provider record field holding the peering connection identifier.
pub const PCX_ID_FIELD: &str = "VpcPeeringConnectionId";

/// Provider record field holding the peering status.
pub const STATUS_FIELD: &str = "Status";

/// Provider filter key locating a peering connection by identifier.
pub const PCX_ID_FILTER: &str = "vpc-peering-connection-id";

/// Provider error fragment meaning the peering connection does not exist.
pub const NOT_FOUND: &str = "InvalidVpcPeeringConnectionID.NotFound";

/// Peering status: waiting for the accepter side.
pub const STATUS_PENDING: &str = "pending-acceptance";

/// Peering status: accepted, still provisioning.
pub const STATUS_PROVISIONING: &str = "provisioning";

/// Peering status: live.
pub const STATUS_ACTIVE: &str = "active";
