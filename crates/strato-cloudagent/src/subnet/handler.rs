//! Subnet lifecycle handler.

use std::sync::Arc;

use serde_json::json;
use strato_lifecycle::gateway::{self, ProviderError};
use strato_lifecycle::matcher::{find_single, ResourceQuery};
use strato_lifecycle::{
    single_target_of_type, LifecycleError, LifecycleResult, NodeContext, ResourceHandler,
    StepOutcome,
};
use strato_types::{record_str, Attributes, Filters, Record, Tag};

use super::types::{
    AVAILABILITY_ZONE, AZ_ATTR, AZ_FIELD, CIDR_BLOCK, NOT_FOUND, SUBNET_ID_FIELD,
    SUBNET_ID_FILTER, VPC_ATTR,
};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::relationship_types::CONTAINED_IN_VPC;

/// Provider calls used by the subnet module.
pub trait SubnetApi: Send + Sync {
    /// Creates a subnet, returning its record.
    fn create_subnet(&self, request: &Attributes) -> Result<Record, ProviderError>;

    /// Lists subnets matching the filters.
    fn describe_subnets(&self, filters: &Filters) -> Result<Vec<Record>, ProviderError>;

    /// Deletes a subnet.
    fn delete_subnet(&self, subnet_id: &str) -> Result<bool, ProviderError>;

    /// Attaches tags to a resource.
    fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<bool, ProviderError>;
}

/// Node lifecycle handler for subnets.
pub struct SubnetHandler {
    api: Arc<dyn SubnetApi>,
    query: ResourceQuery,
}

impl SubnetHandler {
    /// Creates a handler over the provider API.
    pub fn new(api: Arc<dyn SubnetApi>) -> Self {
        Self {
            api,
            query: ResourceQuery::new(SUBNET_ID_FILTER, SUBNET_ID_FIELD, NOT_FOUND),
        }
    }

    fn build_request(&self, ctx: &NodeContext, vpc_id: &str) -> LifecycleResult<Attributes> {
        let mut request = Attributes::new();
        request.insert("VpcId".to_string(), json!(vpc_id));
        request.insert(
            "CidrBlock".to_string(),
            json!(ctx.properties.require_str(CIDR_BLOCK)?),
        );
        if let Some(zone) = ctx.properties.get_str(AVAILABILITY_ZONE) {
            request.insert(AZ_FIELD.to_string(), json!(zone));
        }
        Ok(request)
    }
}

impl ResourceHandler for SubnetHandler {
    fn type_name(&self) -> &str {
        "subnet"
    }

    fn get_resource(&self, ctx: &NodeContext) -> LifecycleResult<Option<Record>> {
        let subnet_id = match ctx.resource_id() {
            Some(id) => id,
            None => return Ok(None),
        };
        let filters = self.query.filters_for(subnet_id);
        find_single(&self.query, |f| self.api.describe_subnets(f), &filters)
    }

    fn create(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        // A subnet lives in exactly one VPC.
        let vpc_id = single_target_of_type(&ctx.relationships, CONTAINED_IN_VPC)?;
        let request = self.build_request(ctx, &vpc_id)?;

        let record = gateway::execute("create_subnet", || self.api.create_subnet(&request), true)?;

        let subnet_id = record_str(&record, SUBNET_ID_FIELD)
            .ok_or_else(|| LifecycleError::empty_response("create_subnet"))?
            .to_string();
        ctx.record.set_resource_id(&subnet_id);
        ctx.record.set(VPC_ATTR, json!(vpc_id));
        if let Some(zone) = record_str(&record, AZ_FIELD) {
            ctx.record.set(AZ_ATTR, json!(zone));
        }

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceCreate, "SubnetHandler", "create_subnet")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(subnet_id)
                .with_object_type("subnet")
                .with_details(json!({"vpc_id": vpc_id}))
        );

        Ok(StepOutcome::Done)
    }

    fn delete(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let subnet_id = match ctx.record.resource_id() {
            Some(id) => id.to_string(),
            None => return Ok(StepOutcome::Unfulfilled),
        };

        gateway::execute("delete_subnet", || self.api.delete_subnet(&subnet_id), true)?;

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceDelete, "SubnetHandler", "delete_subnet")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(subnet_id)
                .with_object_type("subnet")
        );

        Ok(StepOutcome::Done)
    }

    fn apply_tags(&self, ctx: &NodeContext, tags: &[Tag]) -> LifecycleResult<()> {
        let subnet_id = ctx
            .record
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("create_tags"))?
            .to_string();
        gateway::execute("create_tags", || self.api.create_tags(&subnet_id, tags), true)?;
        Ok(())
    }

    fn absorb_attributes(&self, ctx: &mut NodeContext, record: &Record) -> LifecycleResult<()> {
        if let Some(zone) = record_str(record, AZ_FIELD) {
            ctx.record.set(AZ_ATTR, json!(zone));
        }
        if let Some(vpc_id) = record_str(record, "VpcId") {
            ctx.record.set(VPC_ATTR, json!(vpc_id));
        }
        Ok(())
    }
}
