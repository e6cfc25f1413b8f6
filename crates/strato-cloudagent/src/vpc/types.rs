//! VPC property, attribute and provider-field names.

/// Declared property: the VPC's CIDR block (required).
pub const CIDR_BLOCK: &str = "cidr_block";

/// Declared property: instance tenancy (optional).
pub const INSTANCE_TENANCY: &str = "instance_tenancy";

/// Runtime attribute: the CIDR block observed at the provider.
pub const CIDR_ATTR: &str = "cidr_block";

/// Provider record field holding the VPC identifier.
pub const VPC_ID_FIELD: &str = "VpcId";

/// Provider record field holding the CIDR block.
pub const CIDR_FIELD: &str = "CidrBlock";

/// Provider filter key locating a VPC by identifier.
pub const VPC_ID_FILTER: &str = "vpc-id";

/// Provider error fragment meaning the VPC does not exist.
pub const NOT_FOUND: &str = "InvalidVpcID.NotFound";
