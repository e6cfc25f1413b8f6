//! Internet gateway resource module.
//!
//! A gateway has no required creation properties; its useful lifecycle is
//! the attach/detach relationship against a VPC, which follows the
//! external-source short-circuit rule.

mod handler;
mod types;

pub use handler::{IgwApi, IgwHandler, VpcAttachmentHandler};
pub use types::{ATTACHED_VPC_ATTR, IGW_ID_FIELD, IGW_ID_FILTER, NOT_FOUND};
