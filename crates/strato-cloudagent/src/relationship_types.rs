//! Relationship-type strings shared across resource modules.
//!
//! The orchestrator labels every relationship edge with one of these
//! strings; modules use them with `single_target_of_type` to resolve
//! required neighbors.

/// A resource contained in exactly one VPC.
pub const CONTAINED_IN_VPC: &str = "contained-in-vpc";

/// A gateway attached to a VPC.
pub const ATTACHED_TO_VPC: &str = "attached-to-vpc";

/// A volume or address attached to a compute instance.
pub const ATTACHED_TO_INSTANCE: &str = "attached-to-instance";

/// A route table connected to a peering connection.
pub const CONNECTED_TO_PEER: &str = "connected-to-peer";
