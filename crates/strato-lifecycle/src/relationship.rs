//! Relationship lifecycle controller.
//!
//! Orchestrates associate/disassociate between a directed source→target
//! pair whose two sides are each reconciled by their own node lifecycle
//! controller. Only the source's external flag is consulted: an
//! externally-owned source's associations are assumed to be managed
//! outside this system, unless the handler explicitly opts out of that
//! assumption.

use crate::ctx::{RelationshipContext, RelationshipEdge};
use crate::task::{LifecycleError, LifecycleResult, Outcome, StepOutcome};
use log::info;
use std::collections::BTreeMap;

/// Relationship-specific association behavior.
pub trait RelationshipHandler {
    /// Relationship type name, for logging and error messages.
    fn type_name(&self) -> &str;

    /// Issues the associating provider call.
    fn associate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<StepOutcome>;

    /// Issues the disassociating provider call.
    fn disassociate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<StepOutcome>;

    /// Whether associate/disassociate still run when the source is
    /// externally owned. The general rule is no; a handler may override
    /// when the association itself is always this system's job (peering
    /// routes are the known case).
    fn applies_to_external(&self) -> bool {
        false
    }

    /// Runtime-record side effects after a settled association. Runs on
    /// the external short-circuit path too.
    fn post_associate(&self, _ctx: &mut RelationshipContext) -> LifecycleResult<()> {
        Ok(())
    }

    /// Runtime-record side effects after a settled disassociation. Runs
    /// on the external short-circuit path too.
    fn post_disassociate(&self, _ctx: &mut RelationshipContext) -> LifecycleResult<()> {
        Ok(())
    }
}

/// Controller for one directed source→target relationship.
pub struct RelationshipLifecycle {
    handler: Box<dyn RelationshipHandler>,
}

impl RelationshipLifecycle {
    /// Creates a controller around a relationship-specific handler.
    pub fn new(handler: Box<dyn RelationshipHandler>) -> Self {
        Self { handler }
    }

    /// Returns the underlying handler.
    pub fn handler(&self) -> &dyn RelationshipHandler {
        self.handler.as_ref()
    }

    /// Associates the source with the target.
    pub fn associate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<Outcome> {
        if ctx.source_external() {
            if !self.handler.applies_to_external() {
                info!(
                    "source {} is externally owned, leaving {} association to its owner",
                    ctx.source.instance_id,
                    self.handler.type_name()
                );
                self.handler.post_associate(ctx)?;
                return Ok(Outcome::Complete);
            }
            info!(
                "associating {} for source {} despite the external flag",
                self.handler.type_name(),
                ctx.source.instance_id
            );
        }

        match self.handler.associate(ctx)? {
            StepOutcome::Done => {
                self.handler.post_associate(ctx)?;
                Ok(Outcome::Complete)
            }
            StepOutcome::Unfulfilled => Err(LifecycleError::RelationshipUnfulfilled {
                type_name: self.handler.type_name().to_string(),
                operation: "associate".to_string(),
            }),
            StepOutcome::Retry(directive) => Ok(Outcome::Retry(directive)),
        }
    }

    /// Disassociates the source from the target.
    pub fn disassociate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<Outcome> {
        if ctx.source_external() {
            if !self.handler.applies_to_external() {
                info!(
                    "source {} is externally owned, leaving {} disassociation to its owner",
                    ctx.source.instance_id,
                    self.handler.type_name()
                );
                self.handler.post_disassociate(ctx)?;
                return Ok(Outcome::Complete);
            }
            info!(
                "disassociating {} for source {} despite the external flag",
                self.handler.type_name(),
                ctx.source.instance_id
            );
        }

        match self.handler.disassociate(ctx)? {
            StepOutcome::Done => {
                self.handler.post_disassociate(ctx)?;
                Ok(Outcome::Complete)
            }
            StepOutcome::Unfulfilled => Err(LifecycleError::RelationshipUnfulfilled {
                type_name: self.handler.type_name().to_string(),
                operation: "disassociate".to_string(),
            }),
            StepOutcome::Retry(directive) => Ok(Outcome::Retry(directive)),
        }
    }
}

/// Builds a mapping from relationship-type string to the target external
/// identifiers of every edge carrying that type. Edges whose target has
/// no identifier yet are skipped.
pub fn related_targets_by_type(edges: &[RelationshipEdge]) -> BTreeMap<String, Vec<String>> {
    let mut targets: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for edge in edges {
        if let Some(id) = edge.target.resource_id() {
            targets
                .entry(edge.type_name.clone())
                .or_default()
                .push(id.to_string());
        }
    }
    targets
}

/// Returns the exactly-one related target of the given relationship type.
///
/// Fails when zero or more than one target is found: resources that must
/// be contained in exactly one parent use this to resolve it.
pub fn single_target_of_type(
    edges: &[RelationshipEdge],
    type_name: &str,
) -> LifecycleResult<String> {
    let targets = related_targets_by_type(edges);
    let found = targets.get(type_name).map(Vec::as_slice).unwrap_or(&[]);

    match found {
        [id] => Ok(id.clone()),
        other => Err(LifecycleError::AmbiguousRelationship {
            type_name: type_name.to_string(),
            count: other.len(),
        }),
    }
}
