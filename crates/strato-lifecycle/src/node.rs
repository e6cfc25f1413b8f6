//! Node lifecycle controller.
//!
//! Drives create/start/stop/delete for a single resource against the
//! orchestrator's declared intent. Resource-specific behavior lives behind
//! [`ResourceHandler`]; one implementation exists per resource type and
//! the controller holds it as a trait object.
//!
//! Each operation is one synchronous, idempotent, retry-safe state
//! transition per orchestrator invocation: the controller consults the
//! runtime record to decide whether work remains, delegates the provider
//! call, and finalizes on success. Waiting on slow provider-side
//! transitions is signaled with [`Outcome::Retry`] and handled by the
//! orchestrator's own scheduler.

use crate::ctx::NodeContext;
use crate::task::{LifecycleError, LifecycleResult, Outcome, RetryDirective, StepOutcome};
use log::{debug, info};
use strato_types::{Record, Tag};
use uuid::Uuid;

/// Tag key for the resource's display name.
pub const NAME_TAG_KEY: &str = "Name";

/// Tag key for the owning node-instance identifier.
pub const INSTANCE_TAG_KEY: &str = "node-instance-id";

/// Tag key for the owning deployment identifier.
pub const DEPLOYMENT_TAG_KEY: &str = "deployment-id";

/// Declared property holding the user-supplied display name.
pub const NAME_PROPERTY: &str = "name";

/// Resource-specific lifecycle behavior.
///
/// Implementations translate declared properties into provider requests
/// and persist returned identifiers/attributes into the runtime record.
/// They never implement their own create-idempotency guard — the
/// controller skips the creating call when an identifier is already
/// persisted.
pub trait ResourceHandler {
    /// Resource type name, for logging and error messages.
    fn type_name(&self) -> &str;

    /// Locates the resource at the provider, keyed by the context's
    /// resource identifier. `None` when no identifier is known or the
    /// provider has no matching record.
    fn get_resource(&self, ctx: &NodeContext) -> LifecycleResult<Option<Record>>;

    /// Issues the creating provider call. On [`StepOutcome::Done`] the
    /// provider-assigned identifier must be persisted in the record.
    fn create(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome>;

    /// Issues the deleting provider call.
    fn delete(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome>;

    /// Drives the resource toward its running state.
    fn start(&self, _ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        Ok(StepOutcome::Done)
    }

    /// Drives the resource toward its stopped state.
    fn stop(&self, _ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        Ok(StepOutcome::Done)
    }

    /// Attaches metadata tags to the resource.
    fn apply_tags(&self, _ctx: &NodeContext, _tags: &[Tag]) -> LifecycleResult<()> {
        Ok(())
    }

    /// Persists derived attributes from a provider record when an
    /// external resource is adopted.
    fn absorb_attributes(&self, _ctx: &mut NodeContext, _record: &Record) -> LifecycleResult<()> {
        Ok(())
    }
}

/// Controller for a single resource's node lifecycle.
pub struct NodeLifecycle {
    handler: Box<dyn ResourceHandler>,
}

impl NodeLifecycle {
    /// Creates a controller around a resource-specific handler.
    pub fn new(handler: Box<dyn ResourceHandler>) -> Self {
        Self { handler }
    }

    /// Returns the underlying handler.
    pub fn handler(&self) -> &dyn ResourceHandler {
        self.handler.as_ref()
    }

    fn type_name(&self) -> &str {
        self.handler.type_name()
    }

    /// Validates declared intent against provider state before any
    /// mutating call is made.
    ///
    /// Required-property presence is checked first. A declared-external
    /// resource must exist at the provider; a declared-managed resource
    /// with a caller-chosen identifier must not.
    pub fn validate(&self, ctx: &NodeContext, required: &[&str]) -> LifecycleResult<()> {
        for key in required {
            ctx.properties.require(key)?;
        }

        if ctx.properties.is_external() {
            let declared = ctx
                .properties
                .resource_id()
                .ok_or_else(|| LifecycleError::missing_property("resource_id"))?;
            if self.handler.get_resource(ctx)?.is_none() {
                return Err(LifecycleError::ExternalResourceMissing {
                    type_name: self.type_name().to_string(),
                    resource_id: declared.to_string(),
                });
            }
        } else if let Some(declared) = ctx.properties.resource_id() {
            if self.handler.get_resource(ctx)?.is_some() {
                return Err(LifecycleError::ResourceConflict {
                    type_name: self.type_name().to_string(),
                    resource_id: declared.to_string(),
                });
            }
        }

        Ok(())
    }

    /// Creates (or adopts) the resource.
    ///
    /// The creating provider call is issued at most once per resource: a
    /// retried invocation whose identifier is already persisted re-enters
    /// at finalize without touching the provider.
    pub fn create(&self, ctx: &mut NodeContext) -> LifecycleResult<Outcome> {
        if ctx.properties.is_external() {
            return self.adopt(ctx);
        }

        if let Some(id) = ctx.record.resource_id() {
            debug!(
                "{} {} already has identifier {}, skipping creating call",
                self.type_name(),
                ctx.instance_id,
                id
            );
        } else {
            match self.handler.create(ctx)? {
                StepOutcome::Done => {}
                StepOutcome::Unfulfilled => {
                    if ctx.record.resource_id().is_none() {
                        return Err(LifecycleError::NothingToCreate {
                            type_name: self.type_name().to_string(),
                        });
                    }
                }
                StepOutcome::Retry(directive) => return Ok(Outcome::Retry(directive)),
            }
        }

        let id = ctx.record.resource_id().map(str::to_owned).ok_or_else(|| {
            LifecycleError::NothingToCreate {
                type_name: self.type_name().to_string(),
            }
        })?;

        self.tag_resource(ctx)?;
        info!("created {} {} ({})", self.type_name(), id, ctx.instance_id);
        Ok(Outcome::Complete)
    }

    /// Adopts a declared-external resource: verifies it exists, persists
    /// its identifier and derived attributes, and skips the identifying
    /// tags (the engine does not own the resource).
    fn adopt(&self, ctx: &mut NodeContext) -> LifecycleResult<Outcome> {
        let declared = ctx
            .properties
            .resource_id()
            .ok_or_else(|| LifecycleError::missing_property("resource_id"))?
            .to_string();

        let record = self.handler.get_resource(ctx)?.ok_or_else(|| {
            LifecycleError::ExternalResourceMissing {
                type_name: self.type_name().to_string(),
                resource_id: declared.clone(),
            }
        })?;

        ctx.record.set_resource_id(&declared);
        self.handler.absorb_attributes(ctx, &record)?;
        debug!(
            "adopted external {} {}, identifying tags left untouched",
            self.type_name(),
            declared
        );
        Ok(Outcome::Complete)
    }

    /// Drives the resource toward running. A not-yet transition is
    /// retry-eligible, never fatal.
    pub fn start(&self, ctx: &mut NodeContext) -> LifecycleResult<Outcome> {
        if ctx.properties.is_external() {
            info!(
                "{} {} is externally owned, start left to its owner",
                self.type_name(),
                ctx.instance_id
            );
            return Ok(Outcome::Complete);
        }

        match self.handler.start(ctx)? {
            StepOutcome::Done => Ok(Outcome::Complete),
            StepOutcome::Unfulfilled => Ok(Outcome::Retry(RetryDirective::new(format!(
                "waiting for {} to start",
                self.type_name()
            )))),
            StepOutcome::Retry(directive) => Ok(Outcome::Retry(directive)),
        }
    }

    /// Drives the resource toward stopped. A not-yet transition is
    /// retry-eligible, never fatal.
    pub fn stop(&self, ctx: &mut NodeContext) -> LifecycleResult<Outcome> {
        if ctx.properties.is_external() {
            info!(
                "{} {} is externally owned, stop left to its owner",
                self.type_name(),
                ctx.instance_id
            );
            return Ok(Outcome::Complete);
        }

        match self.handler.stop(ctx)? {
            StepOutcome::Done => Ok(Outcome::Complete),
            StepOutcome::Unfulfilled => Ok(Outcome::Retry(RetryDirective::new(format!(
                "waiting for {} to stop",
                self.type_name()
            )))),
            StepOutcome::Retry(directive) => Ok(Outcome::Retry(directive)),
        }
    }

    /// Deletes the resource.
    ///
    /// Deletion is only ever invoked on resources the controller believes
    /// exist, so a missing resource is a forbidden-state error — distinct
    /// from "already deleted". An external resource skips the remote call
    /// but still clears local identity.
    pub fn delete(&self, ctx: &mut NodeContext) -> LifecycleResult<Outcome> {
        if self.handler.get_resource(ctx)?.is_none() {
            return Err(LifecycleError::ForbiddenState {
                type_name: self.type_name().to_string(),
                operation: "delete".to_string(),
            });
        }

        if ctx.properties.is_external() {
            info!(
                "{} {} is externally owned, leaving the provider resource in place",
                self.type_name(),
                ctx.instance_id
            );
            ctx.record.clear_identity();
            return Ok(Outcome::Complete);
        }

        match self.handler.delete(ctx)? {
            StepOutcome::Done => {
                ctx.record.clear_identity();
                info!("deleted {} ({})", self.type_name(), ctx.instance_id);
                Ok(Outcome::Complete)
            }
            StepOutcome::Unfulfilled => Ok(Outcome::Retry(RetryDirective::new(format!(
                "{} not yet deletable",
                self.type_name()
            )))),
            StepOutcome::Retry(directive) => Ok(Outcome::Retry(directive)),
        }
    }

    /// Attaches identifying metadata as three independent tagging calls:
    /// the display name (user-supplied, or a generated unique fallback),
    /// the owning node-instance id, and the deployment id. The first
    /// failure aborts the remaining calls.
    pub fn tag_resource(&self, ctx: &NodeContext) -> LifecycleResult<()> {
        let name = match ctx.properties.get_str(NAME_PROPERTY) {
            Some(name) => name.to_string(),
            None => format!("{}-{}", self.type_name(), Uuid::new_v4()),
        };

        let tags = [
            Tag::new(NAME_TAG_KEY, name),
            Tag::new(INSTANCE_TAG_KEY, ctx.instance_id.clone()),
            Tag::new(DEPLOYMENT_TAG_KEY, ctx.deployment_id.clone()),
        ];

        for tag in &tags {
            self.handler.apply_tags(ctx, std::slice::from_ref(tag))?;
        }

        Ok(())
    }
}
