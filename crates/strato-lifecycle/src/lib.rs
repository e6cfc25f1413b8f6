//! Core lifecycle engine for Strato cloud resource plugins.
//!
//! This crate provides the generic reconciliation machinery shared by
//! every resource module in the plugin pack:
//!
//! - [`gateway`]: thin provider-call wrapper normalizing SDK errors
//! - [`matcher`]: list-query helpers distinguishing "not found" from faults
//! - [`NodeLifecycle`]: create/start/stop/delete for a single resource
//! - [`RelationshipLifecycle`]: associate/disassociate for a source→target pair
//! - [`RouteReconciler`]: idempotent per-entry routing table reconciliation
//!
//! # Architecture
//!
//! The orchestrator invokes a lifecycle entry point once per retry attempt
//! for a node or relationship instance:
//!
//! ```text
//! [Orchestrator] ──> [Node/Relationship Lifecycle] ──> [ResourceHandler]
//!       ▲                      │                             │
//!       │                      ▼                             ▼
//!  Outcome::Retry        [RuntimeRecord]            [gateway]/[matcher]
//!       │                                                    │
//!       └────────── external retry scheduler                 ▼
//!                                                     [Provider SDK]
//! ```
//!
//! Everything runs synchronously within one invocation; waiting on slow
//! provider-side transitions is expressed as an [`Outcome::Retry`] return
//! value that the orchestrator's scheduler turns into a re-invocation.
//! Fatal conditions are [`LifecycleError`] values on the error channel.
//!
//! # Example
//!
//! ```ignore
//! use strato_lifecycle::{NodeLifecycle, Outcome};
//!
//! let lifecycle = NodeLifecycle::new(Box::new(VpcHandler::new(api)));
//! match lifecycle.create(&mut ctx)? {
//!     Outcome::Complete => { /* advance the workflow */ }
//!     Outcome::Retry(directive) => { /* reschedule per directive */ }
//! }
//! ```

mod ctx;
pub mod gateway;
pub mod matcher;
mod node;
mod relationship;
mod routes;
mod task;

pub use ctx::{
    NodeContext, NodeHandle, Properties, RelationshipContext, RelationshipEdge, RuntimeRecord,
    RESOURCE_ID_KEY, ROUTES_KEY,
};
pub use gateway::{Payload, ProviderError};
pub use matcher::{find_matching, find_single, ResourceQuery};
pub use node::{
    NodeLifecycle, ResourceHandler, DEPLOYMENT_TAG_KEY, INSTANCE_TAG_KEY, NAME_PROPERTY,
    NAME_TAG_KEY,
};
pub use relationship::{
    related_targets_by_type, single_target_of_type, RelationshipHandler, RelationshipLifecycle,
};
pub use routes::{RouteApi, RouteReconciler};
pub use task::{LifecycleError, LifecycleResult, Outcome, RetryDirective, StepOutcome};
