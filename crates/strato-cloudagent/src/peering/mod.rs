//! VPC peering connection resource module.
//!
//! The peering connection itself is a node with an accept step that
//! settles asynchronously. The peering-route relationship wires a route
//! table to the peer's CIDR — and it runs even when the route table is
//! declared external: routes toward a peer always need an explicit entry
//! in whichever table carries them, so this handler opts out of the
//! external short-circuit.

mod handler;
mod types;

pub use handler::{PeeringApi, PeeringHandler, PeeringRouteHandler};
pub use types::{
    NOT_FOUND, PCX_ID_FIELD, PCX_ID_FILTER, PEER_CIDR_BLOCK, PEER_VPC_ID, STATUS_ACTIVE,
    STATUS_PENDING,
};
