//! Elastic address resource module.
//!
//! An address is allocated and released as a node, and associated with a
//! compute instance through a relationship whose post-associate step
//! publishes the association into the address's runtime record.

mod handler;
mod types;

pub use handler::{AddressAssociationHandler, EipApi, EipHandler};
pub use types::{
    ALLOCATION_ID_FIELD, ALLOCATION_ID_FILTER, ASSOCIATED_INSTANCE_ATTR, ASSOCIATION_ID_ATTR,
    NOT_FOUND, PUBLIC_IP_ATTR, PUBLIC_IP_FIELD,
};
