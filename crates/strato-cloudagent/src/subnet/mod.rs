//! Subnet resource module.
//!
//! A subnet must be contained in exactly one VPC, resolved from the node
//! instance's relationship edges at creation time.

mod handler;
mod types;

pub use handler::{SubnetApi, SubnetHandler};
pub use types::{
    AVAILABILITY_ZONE, AZ_ATTR, CIDR_BLOCK, NOT_FOUND, SUBNET_ID_FIELD, SUBNET_ID_FILTER,
};
