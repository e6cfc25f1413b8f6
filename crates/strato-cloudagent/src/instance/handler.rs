//! Compute instance lifecycle handler.

use std::sync::Arc;

use log::debug;
use serde_json::json;
use strato_lifecycle::gateway::{self, ProviderError};
use strato_lifecycle::matcher::{find_single, ResourceQuery};
use strato_lifecycle::{
    related_targets_by_type, LifecycleError, LifecycleResult, NodeContext, ResourceHandler,
    RetryDirective, StepOutcome,
};
use strato_types::{record_str, Attributes, Filters, Record, Tag};

use super::types::{
    InstanceState, IMAGE_ID, INSTANCE_ID_FIELD, INSTANCE_ID_FILTER, INSTANCE_TYPE, NOT_FOUND,
    PRIVATE_IP_ATTR, PRIVATE_IP_FIELD, PUBLIC_IP_ATTR, PUBLIC_IP_FIELD, STATE_FIELD,
};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::relationship_types::CONTAINED_IN_VPC;

/// Provider calls used by the instance module.
pub trait InstanceApi: Send + Sync {
    /// Launches an instance, returning its record.
    fn run_instance(&self, request: &Attributes) -> Result<Record, ProviderError>;

    /// Lists instances matching the filters.
    fn describe_instances(&self, filters: &Filters) -> Result<Vec<Record>, ProviderError>;

    /// Requests a stopped instance to start.
    fn start_instance(&self, instance_id: &str) -> Result<bool, ProviderError>;

    /// Requests a running instance to stop.
    fn stop_instance(&self, instance_id: &str) -> Result<bool, ProviderError>;

    /// Requests instance termination.
    fn terminate_instance(&self, instance_id: &str) -> Result<bool, ProviderError>;

    /// Attaches tags to a resource.
    fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<bool, ProviderError>;
}

/// Node lifecycle handler for compute instances.
pub struct InstanceHandler {
    api: Arc<dyn InstanceApi>,
    query: ResourceQuery,
}

impl InstanceHandler {
    /// Creates a handler over the provider API.
    pub fn new(api: Arc<dyn InstanceApi>) -> Self {
        Self {
            api,
            query: ResourceQuery::new(INSTANCE_ID_FILTER, INSTANCE_ID_FIELD, NOT_FOUND),
        }
    }

    fn build_request(&self, ctx: &NodeContext) -> LifecycleResult<Attributes> {
        let mut request = Attributes::new();
        request.insert(
            "ImageId".to_string(),
            json!(ctx.properties.require_str(IMAGE_ID)?),
        );
        request.insert(
            "InstanceType".to_string(),
            json!(ctx.properties.require_str(INSTANCE_TYPE)?),
        );
        // An instance may optionally be placed in a related subnet/VPC.
        let related = related_targets_by_type(&ctx.relationships);
        if let Some([vpc_id]) = related.get(CONTAINED_IN_VPC).map(Vec::as_slice) {
            request.insert("VpcId".to_string(), json!(vpc_id));
        }
        Ok(request)
    }

    fn current_state(&self, ctx: &NodeContext) -> LifecycleResult<Option<InstanceState>> {
        let record = match self.get_resource(ctx)? {
            Some(record) => record,
            None => return Ok(None),
        };
        let state = record_str(&record, STATE_FIELD)
            .unwrap_or("pending")
            .parse::<InstanceState>()
            .map_err(|e| LifecycleError::provider(e.to_string()))?;
        Ok(Some(state))
    }

    fn absorb_addresses(ctx: &mut NodeContext, record: &Record) {
        if let Some(ip) = record_str(record, PRIVATE_IP_FIELD) {
            ctx.record.set(PRIVATE_IP_ATTR, json!(ip));
        }
        if let Some(ip) = record_str(record, PUBLIC_IP_FIELD) {
            ctx.record.set(PUBLIC_IP_ATTR, json!(ip));
        }
    }
}

impl ResourceHandler for InstanceHandler {
    fn type_name(&self) -> &str {
        "instance"
    }

    fn get_resource(&self, ctx: &NodeContext) -> LifecycleResult<Option<Record>> {
        let instance_id = match ctx.resource_id() {
            Some(id) => id,
            None => return Ok(None),
        };
        let filters = self.query.filters_for(instance_id);
        find_single(&self.query, |f| self.api.describe_instances(f), &filters)
    }

    fn create(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let request = self.build_request(ctx)?;
        let record = gateway::execute("run_instance", || self.api.run_instance(&request), true)?;

        let instance_id = record_str(&record, INSTANCE_ID_FIELD)
            .ok_or_else(|| LifecycleError::empty_response("run_instance"))?
            .to_string();
        // Persist the identifier immediately: the launch has happened even
        // if the instance is still pending, and a retried invocation must
        // not launch a second one.
        ctx.record.set_resource_id(&instance_id);

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceCreate, "InstanceHandler", "run_instance")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(instance_id)
                .with_object_type("instance")
        );

        Ok(StepOutcome::Done)
    }

    fn start(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let instance_id = match ctx.record.resource_id() {
            Some(id) => id.to_string(),
            None => return Ok(StepOutcome::Unfulfilled),
        };

        match self.current_state(ctx)? {
            Some(InstanceState::Running) => {
                if let Some(record) = self.get_resource(ctx)? {
                    Self::absorb_addresses(ctx, &record);
                }
                Ok(StepOutcome::Done)
            }
            Some(InstanceState::Pending) => Ok(StepOutcome::Retry(RetryDirective::after_secs(
                format!("instance {} still pending", instance_id),
                15,
            ))),
            Some(InstanceState::Stopped) => {
                gateway::execute(
                    "start_instance",
                    || self.api.start_instance(&instance_id),
                    true,
                )?;
                Ok(StepOutcome::Retry(RetryDirective::after_secs(
                    format!("instance {} starting", instance_id),
                    15,
                )))
            }
            Some(InstanceState::Stopping) => Ok(StepOutcome::Retry(RetryDirective::after_secs(
                format!("instance {} still stopping", instance_id),
                15,
            ))),
            Some(state) if state.is_terminal() => Err(LifecycleError::ForbiddenState {
                type_name: self.type_name().to_string(),
                operation: "start".to_string(),
            }),
            _ => Ok(StepOutcome::Unfulfilled),
        }
    }

    fn stop(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let instance_id = match ctx.record.resource_id() {
            Some(id) => id.to_string(),
            None => return Ok(StepOutcome::Done),
        };

        match self.current_state(ctx)? {
            Some(InstanceState::Stopped) | None => Ok(StepOutcome::Done),
            Some(state) if state.is_terminal() => Ok(StepOutcome::Done),
            Some(InstanceState::Stopping) => Ok(StepOutcome::Retry(RetryDirective::after_secs(
                format!("instance {} still stopping", instance_id),
                15,
            ))),
            _ => {
                gateway::execute(
                    "stop_instance",
                    || self.api.stop_instance(&instance_id),
                    true,
                )?;
                Ok(StepOutcome::Retry(RetryDirective::after_secs(
                    format!("instance {} stopping", instance_id),
                    15,
                )))
            }
        }
    }

    fn delete(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let instance_id = match ctx.record.resource_id() {
            Some(id) => id.to_string(),
            None => return Ok(StepOutcome::Unfulfilled),
        };

        match self.current_state(ctx)? {
            Some(InstanceState::Terminated) | None => {
                audit_log!(
                    AuditRecord::new(
                        AuditCategory::ResourceDelete,
                        "InstanceHandler",
                        "terminate_instance"
                    )
                    .with_outcome(AuditOutcome::Success)
                    .with_object_id(instance_id)
                    .with_object_type("instance")
                );
                Ok(StepOutcome::Done)
            }
            Some(InstanceState::ShuttingDown) => {
                Ok(StepOutcome::Retry(RetryDirective::after_secs(
                    format!("instance {} shutting down", instance_id),
                    15,
                )))
            }
            Some(state) => {
                debug!("terminating instance {} from state {}", instance_id, state);
                gateway::execute(
                    "terminate_instance",
                    || self.api.terminate_instance(&instance_id),
                    true,
                )?;
                Ok(StepOutcome::Retry(RetryDirective::after_secs(
                    format!("instance {} shutting down", instance_id),
                    15,
                )))
            }
        }
    }

    fn apply_tags(&self, ctx: &NodeContext, tags: &[Tag]) -> LifecycleResult<()> {
        let instance_id = ctx
            .record
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("create_tags"))?
            .to_string();
        gateway::execute("create_tags", || self.api.create_tags(&instance_id, tags), true)?;
        Ok(())
    }

    fn absorb_attributes(&self, ctx: &mut NodeContext, record: &Record) -> LifecycleResult<()> {
        Self::absorb_addresses(ctx, record);
        Ok(())
    }
}
