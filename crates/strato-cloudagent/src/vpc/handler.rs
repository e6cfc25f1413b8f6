//! VPC lifecycle handler.

use std::sync::Arc;

use serde_json::json;
use strato_lifecycle::gateway::{self, ProviderError};
use strato_lifecycle::matcher::{find_single, ResourceQuery};
use strato_lifecycle::{
    LifecycleError, LifecycleResult, NodeContext, ResourceHandler, StepOutcome,
};
use strato_types::{record_str, Attributes, Filters, Record, Tag};

use super::types::{
    CIDR_ATTR, CIDR_BLOCK, CIDR_FIELD, INSTANCE_TENANCY, NOT_FOUND, VPC_ID_FIELD, VPC_ID_FILTER,
};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;

/// Provider calls used by the VPC module.
pub trait VpcApi: Send + Sync {
    /// Creates a VPC, returning its record.
    fn create_vpc(&self, request: &Attributes) -> Result<Record, ProviderError>;

    /// Lists VPCs matching the filters.
    fn describe_vpcs(&self, filters: &Filters) -> Result<Vec<Record>, ProviderError>;

    /// Deletes a VPC.
    fn delete_vpc(&self, vpc_id: &str) -> Result<bool, ProviderError>;

    /// Attaches tags to a resource.
    fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<bool, ProviderError>;
}

/// Node lifecycle handler for VPCs.
pub struct VpcHandler {
    api: Arc<dyn VpcApi>,
    query: ResourceQuery,
}

impl VpcHandler {
    /// Creates a handler over the provider API.
    pub fn new(api: Arc<dyn VpcApi>) -> Self {
        Self {
            api,
            query: ResourceQuery::new(VPC_ID_FILTER, VPC_ID_FIELD, NOT_FOUND),
        }
    }

    fn build_request(&self, ctx: &NodeContext) -> LifecycleResult<Attributes> {
        let mut request = Attributes::new();
        request.insert(
            CIDR_FIELD.to_string(),
            json!(ctx.properties.require_str(CIDR_BLOCK)?),
        );
        if let Some(tenancy) = ctx.properties.get_str(INSTANCE_TENANCY) {
            request.insert("InstanceTenancy".to_string(), json!(tenancy));
        }
        Ok(request)
    }
}

impl ResourceHandler for VpcHandler {
    fn type_name(&self) -> &str {
        "vpc"
    }

    fn get_resource(&self, ctx: &NodeContext) -> LifecycleResult<Option<Record>> {
        let vpc_id = match ctx.resource_id() {
            Some(id) => id,
            None => return Ok(None),
        };
        let filters = self.query.filters_for(vpc_id);
        find_single(&self.query, |f| self.api.describe_vpcs(f), &filters)
    }

    fn create(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let request = self.build_request(ctx)?;
        let record = gateway::execute("create_vpc", || self.api.create_vpc(&request), true)?;

        let vpc_id = record_str(&record, VPC_ID_FIELD)
            .ok_or_else(|| LifecycleError::empty_response("create_vpc"))?
            .to_string();
        ctx.record.set_resource_id(&vpc_id);
        if let Some(cidr) = record_str(&record, CIDR_FIELD) {
            ctx.record.set(CIDR_ATTR, json!(cidr));
        }

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceCreate, "VpcHandler", "create_vpc")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(vpc_id)
                .with_object_type("vpc")
        );

        Ok(StepOutcome::Done)
    }

    fn delete(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let vpc_id = match ctx.record.resource_id() {
            Some(id) => id.to_string(),
            None => return Ok(StepOutcome::Unfulfilled),
        };

        gateway::execute("delete_vpc", || self.api.delete_vpc(&vpc_id), true)?;

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceDelete, "VpcHandler", "delete_vpc")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(vpc_id)
                .with_object_type("vpc")
        );

        Ok(StepOutcome::Done)
    }

    fn apply_tags(&self, ctx: &NodeContext, tags: &[Tag]) -> LifecycleResult<()> {
        let vpc_id = ctx
            .record
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("create_tags"))?
            .to_string();
        gateway::execute("create_tags", || self.api.create_tags(&vpc_id, tags), true)?;
        Ok(())
    }

    fn absorb_attributes(&self, ctx: &mut NodeContext, record: &Record) -> LifecycleResult<()> {
        if let Some(cidr) = record_str(record, CIDR_FIELD) {
            ctx.record.set(CIDR_ATTR, json!(cidr));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use strato_lifecycle::{NodeLifecycle, Outcome, Properties};

    /// Mock provider tracking VPC records.
    struct MockVpcApi {
        vpcs: Mutex<Vec<Record>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockVpcApi {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                vpcs: Mutex::new(Vec::new()),
                calls: Mutex::new(Vec::new()),
            })
        }

        fn with_vpc(self: Arc<Self>, record: Record) -> Arc<Self> {
            self.vpcs.lock().unwrap().push(record);
            self
        }

        fn call_count(&self, name: &str) -> usize {
            self.calls
                .lock()
                .unwrap()
                .iter()
                .filter(|c| c.as_str() == name)
                .count()
        }
    }

    impl VpcApi for MockVpcApi {
        fn create_vpc(&self, request: &Attributes) -> Result<Record, ProviderError> {
            self.calls.lock().unwrap().push("create_vpc".to_string());
            let record = json!({
                "VpcId": "vpc-1",
                "CidrBlock": request["CidrBlock"],
                "State": "available",
            });
            self.vpcs.lock().unwrap().push(record.clone());
            Ok(record)
        }

        fn describe_vpcs(&self, filters: &Filters) -> Result<Vec<Record>, ProviderError> {
            self.calls.lock().unwrap().push("describe_vpcs".to_string());
            let vpcs = self.vpcs.lock().unwrap();
            if let Some(wanted) = filters.get(VPC_ID_FILTER) {
                let matched: Vec<Record> = vpcs
                    .iter()
                    .filter(|r| record_str(r, VPC_ID_FIELD) == Some(wanted))
                    .cloned()
                    .collect();
                if matched.is_empty() {
                    return Err(ProviderError::service(format!(
                        "{}: the vpc {} does not exist",
                        NOT_FOUND, wanted
                    )));
                }
                return Ok(matched);
            }
            Ok(vpcs.clone())
        }

        fn delete_vpc(&self, vpc_id: &str) -> Result<bool, ProviderError> {
            self.calls.lock().unwrap().push("delete_vpc".to_string());
            let mut vpcs = self.vpcs.lock().unwrap();
            let before = vpcs.len();
            vpcs.retain(|r| record_str(r, VPC_ID_FIELD) != Some(vpc_id));
            Ok(vpcs.len() < before)
        }

        fn create_tags(&self, _resource_id: &str, tags: &[Tag]) -> Result<bool, ProviderError> {
            let mut calls = self.calls.lock().unwrap();
            for tag in tags {
                calls.push(format!("create_tags:{}", tag.key));
            }
            Ok(true)
        }
    }

    fn managed_ctx() -> NodeContext {
        let mut attrs = Attributes::new();
        attrs.insert(CIDR_BLOCK.to_string(), json!("10.0.0.0/16"));
        NodeContext::new("vpc_node_1", "dep-1", Properties::managed(attrs))
    }

    #[test]
    fn test_create_persists_identifier_and_cidr() {
        let api = MockVpcApi::new();
        let lifecycle = NodeLifecycle::new(Box::new(VpcHandler::new(api.clone())));
        let mut ctx = managed_ctx();

        let outcome = lifecycle.create(&mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(ctx.record.resource_id(), Some("vpc-1"));
        assert_eq!(ctx.record.get_str(CIDR_ATTR), Some("10.0.0.0/16"));
        assert_eq!(api.call_count("create_vpc"), 1);
        assert_eq!(api.call_count("create_tags:Name"), 1);
    }

    #[test]
    fn test_create_requires_cidr_block() {
        let api = MockVpcApi::new();
        let lifecycle = NodeLifecycle::new(Box::new(VpcHandler::new(api.clone())));
        let mut ctx = NodeContext::new("vpc_node_1", "dep-1", Properties::managed(Attributes::new()));

        let err = lifecycle.create(&mut ctx).unwrap_err();
        assert!(matches!(err, LifecycleError::MissingProperty { .. }));
        assert_eq!(api.call_count("create_vpc"), 0);
    }

    #[test]
    fn test_create_retry_does_not_recreate() {
        let api = MockVpcApi::new();
        let lifecycle = NodeLifecycle::new(Box::new(VpcHandler::new(api.clone())));
        let mut ctx = managed_ctx();

        lifecycle.create(&mut ctx).unwrap();
        lifecycle.create(&mut ctx).unwrap();

        assert_eq!(api.call_count("create_vpc"), 1);
    }

    #[test]
    fn test_external_vpc_adopted() {
        let api = MockVpcApi::new().with_vpc(json!({
            "VpcId": "vpc-ext",
            "CidrBlock": "172.16.0.0/12",
        }));
        let lifecycle = NodeLifecycle::new(Box::new(VpcHandler::new(api.clone())));
        let mut ctx = NodeContext::new(
            "vpc_node_1",
            "dep-1",
            Properties::external("vpc-ext", Attributes::new()),
        );

        let outcome = lifecycle.create(&mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(ctx.record.resource_id(), Some("vpc-ext"));
        assert_eq!(ctx.record.get_str(CIDR_ATTR), Some("172.16.0.0/12"));
        assert_eq!(api.call_count("create_vpc"), 0);
        assert_eq!(api.call_count("create_tags:Name"), 0);
    }

    #[test]
    fn test_external_vpc_missing_is_fatal() {
        let api = MockVpcApi::new();
        let lifecycle = NodeLifecycle::new(Box::new(VpcHandler::new(api)));
        let mut ctx = NodeContext::new(
            "vpc_node_1",
            "dep-1",
            Properties::external("vpc-missing", Attributes::new()),
        );

        let err = lifecycle.create(&mut ctx).unwrap_err();
        assert!(matches!(err, LifecycleError::ExternalResourceMissing { .. }));
    }

    #[test]
    fn test_validate_conflict_for_managed_with_existing_id() {
        let api = MockVpcApi::new().with_vpc(json!({"VpcId": "vpc-1"}));
        let lifecycle = NodeLifecycle::new(Box::new(VpcHandler::new(api)));
        let ctx = NodeContext::new(
            "vpc_node_1",
            "dep-1",
            Properties::managed(Attributes::new()).with_resource_id("vpc-1"),
        );

        let err = lifecycle.validate(&ctx, &[]).unwrap_err();
        assert!(matches!(err, LifecycleError::ResourceConflict { .. }));
    }

    #[test]
    fn test_delete_removes_vpc_and_clears_identity() {
        let api = MockVpcApi::new();
        let lifecycle = NodeLifecycle::new(Box::new(VpcHandler::new(api.clone())));
        let mut ctx = managed_ctx();

        lifecycle.create(&mut ctx).unwrap();
        let outcome = lifecycle.delete(&mut ctx).unwrap();

        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(ctx.record.resource_id(), None);
        assert_eq!(api.call_count("delete_vpc"), 1);
    }

    #[test]
    fn test_delete_on_absent_vpc_is_forbidden_state() {
        let api = MockVpcApi::new();
        let lifecycle = NodeLifecycle::new(Box::new(VpcHandler::new(api)));
        let mut ctx = managed_ctx();
        ctx.record.set_resource_id("vpc-gone");

        let err = lifecycle.delete(&mut ctx).unwrap_err();
        assert!(matches!(err, LifecycleError::ForbiddenState { .. }));
    }
}
