//! Route table resource module.
//!
//! A route table is reconciled entry-by-entry: the node lifecycle owns the
//! table itself, and individual routes are upserted/deleted through the
//! engine's route reconciler, with applied entries tracked in the table's
//! runtime record.

mod handler;
mod types;

pub use handler::{RouteTableApi, RouteTableHandler};
pub use types::{NOT_FOUND, ROUTE_EXISTS, ROUTE_NOT_FOUND, TABLE_ID_FIELD, TABLE_ID_FILTER};
