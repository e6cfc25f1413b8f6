//! Subnet property, attribute and provider-field names.

/// Declared property: the subnet's CIDR block (required).
pub const CIDR_BLOCK: &str = "cidr_block";

/// Declared property: availability zone (optional).
pub const AVAILABILITY_ZONE: &str = "availability_zone";

/// Runtime attribute: the availability zone observed at the provider.
pub const AZ_ATTR: &str = "availability_zone";

/// Runtime attribute: the containing VPC's identifier.
pub const VPC_ATTR: &str = "vpc_id";

/// Provider record field holding the subnet identifier.
pub const SUBNET_ID_FIELD: &str = "SubnetId";

/// Provider record field holding the availability zone.
pub const AZ_FIELD: &str = "AvailabilityZone";

/// Provider filter key locating a subnet by identifier.
pub const SUBNET_ID_FILTER: &str = "subnet-id";

/// Provider error fragment meaning the subnet does not exist.
pub const NOT_FOUND: &str = "InvalidSubnetID.NotFound";
