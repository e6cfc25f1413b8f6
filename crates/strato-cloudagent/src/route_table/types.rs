//! Route table attribute and provider-field names.

/// Runtime attribute: the containing VPC's identifier.
pub const VPC_ATTR: &str = "vpc_id";

/// Provider record field holding the route table identifier.
pub const TABLE_ID_FIELD: &str = "RouteTableId";

/// Provider filter key locating a route table by identifier.
pub const TABLE_ID_FILTER: &str = "route-table-id";

/// Provider error fragment meaning the route table does not exist.
pub const NOT_FOUND: &str = "InvalidRouteTableID.NotFound";

/// Provider error fragment meaning a route already exists.
pub const ROUTE_EXISTS: &str = "RouteAlreadyExists";

/// Provider error fragment meaning a route does not exist.
pub const ROUTE_NOT_FOUND: &str = "InvalidRoute.NotFound";
