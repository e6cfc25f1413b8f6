//! VPC resource module.
//!
//! Manages isolated virtual networks, the containment root for most other
//! network resources. The node lifecycle is the simplest in the pack:
//! create from a CIDR block, adopt-by-identifier when declared external,
//! delete when empty.

mod handler;
mod types;

pub use handler::{VpcApi, VpcHandler};
pub use types::{CIDR_ATTR, CIDR_BLOCK, CIDR_FIELD, NOT_FOUND, VPC_ID_FIELD, VPC_ID_FILTER};
