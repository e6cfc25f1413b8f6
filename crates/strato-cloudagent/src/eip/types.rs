//! Elastic address attribute and provider-field names.

/// Runtime attribute: the allocated public IP.
pub const PUBLIC_IP_ATTR: &str = "public_ip";

/// Runtime attribute: the live association identifier.
pub const ASSOCIATION_ID_ATTR: &str = "association_id";

/// Runtime attribute: the instance this address points at.
pub const ASSOCIATED_INSTANCE_ATTR: &str = "associated_instance_id";

/// Provider record field holding the allocation identifier.
pub const ALLOCATION_ID_FIELD: &str = "AllocationId";

/// Provider record field holding the public IP.
pub const PUBLIC_IP_FIELD: &str = "PublicIp";

/// Provider record field holding the association identifier.
pub const ASSOCIATION_ID_FIELD: &str = "AssociationId";

/// Provider filter key locating an address by allocation identifier.
pub const ALLOCATION_ID_FILTER: &str = "allocation-id";

/// Provider error fragment meaning the address does not exist.
pub const NOT_FOUND: &str = "InvalidAllocationID.NotFound";
