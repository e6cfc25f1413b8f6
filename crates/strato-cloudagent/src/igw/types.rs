//! Internet gateway attribute and provider-field names.

/// Runtime attribute: the VPC this gateway is attached to.
pub const ATTACHED_VPC_ATTR: &str = "attached_vpc_id";

/// Provider record field holding the gateway identifier.
pub const IGW_ID_FIELD: &str = "InternetGatewayId";

/// Provider filter key locating a gateway by identifier.
pub const IGW_ID_FILTER: &str = "internet-gateway-id";

/// Provider error fragment meaning the gateway does not exist.
pub const NOT_FOUND: &str = "InvalidInternetGatewayID.NotFound";
