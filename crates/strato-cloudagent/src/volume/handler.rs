//! Volume lifecycle and attachment handlers.

use std::sync::Arc;

use serde_json::json;
use strato_lifecycle::gateway::{self, ProviderError};
use strato_lifecycle::matcher::{find_single, ResourceQuery};
use strato_lifecycle::{
    LifecycleError, LifecycleResult, NodeContext, RelationshipContext, RelationshipHandler,
    ResourceHandler, RetryDirective, StepOutcome,
};
use strato_types::{record_str, Attributes, Filters, Record, Tag};

use super::types::{
    ATTACHED_INSTANCE_ATTR, AVAILABILITY_ZONE, DEVICE_ATTR, DEVICE_NAME, NOT_FOUND, SIZE_GB,
    STATE_AVAILABLE, STATE_CREATING, STATE_FIELD, STATE_IN_USE, VOLUME_ID_FIELD, VOLUME_ID_FILTER,
};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;

/// Provider calls used by the volume module.
pub trait VolumeApi: Send + Sync {
    /// Creates a volume, returning its record.
    fn create_volume(&self, request: &Attributes) -> Result<Record, ProviderError>;

    /// Lists volumes matching the filters.
    fn describe_volumes(&self, filters: &Filters) -> Result<Vec<Record>, ProviderError>;

    /// Deletes a volume.
    fn delete_volume(&self, volume_id: &str) -> Result<bool, ProviderError>;

    /// Attaches a volume to an instance under a device name.
    fn attach_volume(
        &self,
        volume_id: &str,
        instance_id: &str,
        device: &str,
    ) -> Result<bool, ProviderError>;

    /// Detaches a volume from an instance.
    fn detach_volume(&self, volume_id: &str, instance_id: &str) -> Result<bool, ProviderError>;

    /// Attaches tags to a resource.
    fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<bool, ProviderError>;
}

fn volume_query() -> ResourceQuery {
    ResourceQuery::new(VOLUME_ID_FILTER, VOLUME_ID_FIELD, NOT_FOUND)
}

fn volume_state(
    api: &dyn VolumeApi,
    query: &ResourceQuery,
    volume_id: &str,
) -> LifecycleResult<Option<String>> {
    let filters = query.filters_for(volume_id);
    let record = find_single(query, |f| api.describe_volumes(f), &filters)?;
    Ok(record
        .as_ref()
        .and_then(|r| record_str(r, STATE_FIELD))
        .map(str::to_owned))
}

/// Node lifecycle handler for volumes.
pub struct VolumeHandler {
    api: Arc<dyn VolumeApi>,
    query: ResourceQuery,
}

impl VolumeHandler {
    /// Creates a handler over the provider API.
    pub fn new(api: Arc<dyn VolumeApi>) -> Self {
        Self {
            api,
            query: volume_query(),
        }
    }
}

impl ResourceHandler for VolumeHandler {
    fn type_name(&self) -> &str {
        "volume"
    }

    fn get_resource(&self, ctx: &NodeContext) -> LifecycleResult<Option<Record>> {
        let volume_id = match ctx.resource_id() {
            Some(id) => id,
            None => return Ok(None),
        };
        let filters = self.query.filters_for(volume_id);
        find_single(&self.query, |f| self.api.describe_volumes(f), &filters)
    }

    fn create(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let mut request = Attributes::new();
        request.insert("Size".to_string(), ctx.properties.require(SIZE_GB)?.clone());
        request.insert(
            "AvailabilityZone".to_string(),
            json!(ctx.properties.require_str(AVAILABILITY_ZONE)?),
        );

        let record = gateway::execute("create_volume", || self.api.create_volume(&request), true)?;

        let volume_id = record_str(&record, VOLUME_ID_FIELD)
            .ok_or_else(|| LifecycleError::empty_response("create_volume"))?
            .to_string();
        ctx.record.set_resource_id(&volume_id);

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceCreate, "VolumeHandler", "create_volume")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(volume_id)
                .with_object_type("volume")
        );

        Ok(StepOutcome::Done)
    }

    fn start(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let volume_id = match ctx.record.resource_id() {
            Some(id) => id.to_string(),
            None => return Ok(StepOutcome::Unfulfilled),
        };

        match volume_state(self.api.as_ref(), &self.query, &volume_id)?.as_deref() {
            Some(STATE_CREATING) => Ok(StepOutcome::Retry(RetryDirective::after_secs(
                format!("volume {} still creating", volume_id),
                10,
            ))),
            Some(STATE_AVAILABLE) | Some(STATE_IN_USE) => Ok(StepOutcome::Done),
            _ => Ok(StepOutcome::Unfulfilled),
        }
    }

    fn delete(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let volume_id = match ctx.record.resource_id() {
            Some(id) => id.to_string(),
            None => return Ok(StepOutcome::Unfulfilled),
        };

        gateway::execute("delete_volume", || self.api.delete_volume(&volume_id), true)?;

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceDelete, "VolumeHandler", "delete_volume")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(volume_id)
                .with_object_type("volume")
        );

        Ok(StepOutcome::Done)
    }

    fn apply_tags(&self, ctx: &NodeContext, tags: &[Tag]) -> LifecycleResult<()> {
        let volume_id = ctx
            .record
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("create_tags"))?
            .to_string();
        gateway::execute("create_tags", || self.api.create_tags(&volume_id, tags), true)?;
        Ok(())
    }
}

/// Relationship handler attaching a volume (source) to an instance
/// (target).
pub struct VolumeAttachmentHandler {
    api: Arc<dyn VolumeApi>,
    query: ResourceQuery,
}

impl VolumeAttachmentHandler {
    /// Creates a handler over the provider API.
    pub fn new(api: Arc<dyn VolumeApi>) -> Self {
        Self {
            api,
            query: volume_query(),
        }
    }

    fn pair(ctx: &RelationshipContext) -> LifecycleResult<(String, String)> {
        let volume_id = ctx
            .source
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("attach_volume"))?
            .to_string();
        let instance_id = ctx
            .target
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("attach_volume"))?
            .to_string();
        Ok((volume_id, instance_id))
    }
}

impl RelationshipHandler for VolumeAttachmentHandler {
    fn type_name(&self) -> &str {
        "volume-attachment"
    }

    fn associate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<StepOutcome> {
        let (volume_id, instance_id) = Self::pair(ctx)?;

        // Re-derive state on every invocation: a retried attach must not
        // re-issue the attach call against an attaching/attached volume.
        match volume_state(self.api.as_ref(), &self.query, &volume_id)?.as_deref() {
            Some(STATE_IN_USE) => {
                audit_log!(
                    AuditRecord::new(AuditCategory::Association, "VolumeAttachment", "attach")
                        .with_outcome(AuditOutcome::Success)
                        .with_object_id(volume_id)
                        .with_object_type("volume")
                        .with_details(json!({"instance_id": instance_id}))
                );
                return Ok(StepOutcome::Done);
            }
            Some(STATE_CREATING) => {
                return Ok(StepOutcome::Retry(RetryDirective::after_secs(
                    format!("volume {} still creating", volume_id),
                    10,
                )));
            }
            Some(STATE_AVAILABLE) => {}
            _ => return Ok(StepOutcome::Unfulfilled),
        }

        let device = ctx.source.properties.require_str(DEVICE_NAME)?.to_string();
        gateway::execute(
            "attach_volume",
            || self.api.attach_volume(&volume_id, &instance_id, &device),
            true,
        )?;

        Ok(StepOutcome::Retry(RetryDirective::after_secs(
            format!("volume {} attaching to {}", volume_id, instance_id),
            10,
        )))
    }

    fn disassociate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<StepOutcome> {
        let (volume_id, instance_id) = Self::pair(ctx)?;

        match volume_state(self.api.as_ref(), &self.query, &volume_id)?.as_deref() {
            Some(STATE_IN_USE) => {
                gateway::execute(
                    "detach_volume",
                    || self.api.detach_volume(&volume_id, &instance_id),
                    true,
                )?;
                Ok(StepOutcome::Retry(RetryDirective::after_secs(
                    format!("volume {} detaching from {}", volume_id, instance_id),
                    10,
                )))
            }
            Some(STATE_AVAILABLE) | None => {
                audit_log!(
                    AuditRecord::new(AuditCategory::Disassociation, "VolumeAttachment", "detach")
                        .with_outcome(AuditOutcome::Success)
                        .with_object_id(volume_id)
                        .with_object_type("volume")
                        .with_details(json!({"instance_id": instance_id}))
                );
                Ok(StepOutcome::Done)
            }
            Some(_) => Ok(StepOutcome::Retry(RetryDirective::after_secs(
                format!("volume {} settling", volume_id),
                10,
            ))),
        }
    }

    fn post_associate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<()> {
        if let Some(instance_id) = ctx.target.resource_id().map(str::to_owned) {
            ctx.source
                .record
                .set(ATTACHED_INSTANCE_ATTR, json!(instance_id));
        }
        if let Some(device) = ctx.source.properties.get_str(DEVICE_NAME).map(str::to_owned) {
            ctx.source.record.set(DEVICE_ATTR, json!(device));
        }
        Ok(())
    }

    fn post_disassociate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<()> {
        ctx.source.record.remove(ATTACHED_INSTANCE_ATTR);
        ctx.source.record.remove(DEVICE_ATTR);
        Ok(())
    }
}
