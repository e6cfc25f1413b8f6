//! Common Strato types for cloud resource orchestration.
//!
//! This crate provides the primitive types shared by the lifecycle engine
//! and every resource module:
//!
//! - [`Record`]: a loosely-typed provider-side resource record
//! - [`Filters`]: filter arguments for provider list/describe calls
//! - [`Tag`]: a key/value metadata tag attached to provider resources
//! - [`RouteSpec`]: a destination plus exactly-one-next-hop routing entry

mod filter;
mod record;
mod route;
mod tag;

pub use filter::Filters;
pub use record::{record_field, record_str, Attributes, Record};
pub use route::{NextHop, NextHopError, RouteSpec};
pub use tag::Tag;
