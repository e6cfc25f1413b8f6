//! Internet gateway lifecycle and VPC attachment handlers.

use std::sync::Arc;

use serde_json::json;
use strato_lifecycle::gateway::{self, ProviderError};
use strato_lifecycle::matcher::{find_single, ResourceQuery};
use strato_lifecycle::{
    LifecycleError, LifecycleResult, NodeContext, RelationshipContext, RelationshipHandler,
    ResourceHandler, RetryDirective, StepOutcome,
};
use strato_types::{record_str, Attributes, Filters, Record, Tag};

use super::types::{ATTACHED_VPC_ATTR, IGW_ID_FIELD, IGW_ID_FILTER, NOT_FOUND};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;

/// Provider calls used by the internet gateway module.
pub trait IgwApi: Send + Sync {
    /// Creates an internet gateway, returning its record.
    fn create_internet_gateway(&self, request: &Attributes) -> Result<Record, ProviderError>;

    /// Lists internet gateways matching the filters.
    fn describe_internet_gateways(&self, filters: &Filters)
        -> Result<Vec<Record>, ProviderError>;

    /// Deletes an internet gateway.
    fn delete_internet_gateway(&self, igw_id: &str) -> Result<bool, ProviderError>;

    /// Attaches a gateway to a VPC.
    fn attach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<bool, ProviderError>;

    /// Detaches a gateway from a VPC.
    fn detach_internet_gateway(&self, igw_id: &str, vpc_id: &str) -> Result<bool, ProviderError>;

    /// Attaches tags to a resource.
    fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<bool, ProviderError>;
}

/// Node lifecycle handler for internet gateways.
pub struct IgwHandler {
    api: Arc<dyn IgwApi>,
    query: ResourceQuery,
}

impl IgwHandler {
    /// Creates a handler over the provider API.
    pub fn new(api: Arc<dyn IgwApi>) -> Self {
        Self {
            api,
            query: ResourceQuery::new(IGW_ID_FILTER, IGW_ID_FIELD, NOT_FOUND),
        }
    }
}

impl ResourceHandler for IgwHandler {
    fn type_name(&self) -> &str {
        "internet-gateway"
    }

    fn get_resource(&self, ctx: &NodeContext) -> LifecycleResult<Option<Record>> {
        let igw_id = match ctx.resource_id() {
            Some(id) => id,
            None => return Ok(None),
        };
        let filters = self.query.filters_for(igw_id);
        find_single(&self.query, |f| self.api.describe_internet_gateways(f), &filters)
    }

    fn create(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let record = gateway::execute(
            "create_internet_gateway",
            || self.api.create_internet_gateway(&Attributes::new()),
            true,
        )?;

        let igw_id = record_str(&record, IGW_ID_FIELD)
            .ok_or_else(|| LifecycleError::empty_response("create_internet_gateway"))?
            .to_string();
        ctx.record.set_resource_id(&igw_id);

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceCreate, "IgwHandler", "create_internet_gateway")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(igw_id)
                .with_object_type("internet-gateway")
        );

        Ok(StepOutcome::Done)
    }

    fn delete(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let igw_id = match ctx.record.resource_id() {
            Some(id) => id.to_string(),
            None => return Ok(StepOutcome::Unfulfilled),
        };

        gateway::execute(
            "delete_internet_gateway",
            || self.api.delete_internet_gateway(&igw_id),
            true,
        )?;

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceDelete, "IgwHandler", "delete_internet_gateway")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(igw_id)
                .with_object_type("internet-gateway")
        );

        Ok(StepOutcome::Done)
    }

    fn apply_tags(&self, ctx: &NodeContext, tags: &[Tag]) -> LifecycleResult<()> {
        let igw_id = ctx
            .record
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("create_tags"))?
            .to_string();
        gateway::execute("create_tags", || self.api.create_tags(&igw_id, tags), true)?;
        Ok(())
    }
}

/// Relationship handler attaching an internet gateway (source) to a VPC
/// (target).
pub struct VpcAttachmentHandler {
    api: Arc<dyn IgwApi>,
}

impl VpcAttachmentHandler {
    /// Creates a handler over the provider API.
    pub fn new(api: Arc<dyn IgwApi>) -> Self {
        Self { api }
    }

    fn pair(ctx: &RelationshipContext) -> LifecycleResult<(String, String)> {
        let igw_id = ctx
            .source
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("attach_internet_gateway"))?
            .to_string();
        let vpc_id = ctx
            .target
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("attach_internet_gateway"))?
            .to_string();
        Ok((igw_id, vpc_id))
    }
}

impl RelationshipHandler for VpcAttachmentHandler {
    fn type_name(&self) -> &str {
        "gateway-vpc-attachment"
    }

    fn associate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<StepOutcome> {
        let (igw_id, vpc_id) = Self::pair(ctx)?;

        let attached = gateway::execute(
            "attach_internet_gateway",
            || self.api.attach_internet_gateway(&igw_id, &vpc_id),
            false,
        )?;
        if !attached {
            return Ok(StepOutcome::Retry(RetryDirective::after_secs(
                format!("attachment of {} to {} still pending", igw_id, vpc_id),
                10,
            )));
        }

        audit_log!(
            AuditRecord::new(AuditCategory::Association, "VpcAttachmentHandler", "attach")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(igw_id)
                .with_object_type("internet-gateway")
                .with_details(json!({"vpc_id": vpc_id}))
        );

        Ok(StepOutcome::Done)
    }

    fn disassociate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<StepOutcome> {
        let (igw_id, vpc_id) = Self::pair(ctx)?;

        let detached = gateway::execute(
            "detach_internet_gateway",
            || self.api.detach_internet_gateway(&igw_id, &vpc_id),
            false,
        )?;
        if !detached {
            return Ok(StepOutcome::Retry(RetryDirective::after_secs(
                format!("detachment of {} from {} still pending", igw_id, vpc_id),
                10,
            )));
        }

        audit_log!(
            AuditRecord::new(AuditCategory::Disassociation, "VpcAttachmentHandler", "detach")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(igw_id)
                .with_object_type("internet-gateway")
                .with_details(json!({"vpc_id": vpc_id}))
        );

        Ok(StepOutcome::Done)
    }

    fn post_associate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<()> {
        if let Some(vpc_id) = ctx.target.resource_id().map(str::to_owned) {
            ctx.source.record.set(ATTACHED_VPC_ATTR, json!(vpc_id));
        }
        Ok(())
    }

    fn post_disassociate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<()> {
        ctx.source.record.remove(ATTACHED_VPC_ATTR);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use strato_lifecycle::{
        NodeHandle, NodeLifecycle, Outcome, Properties, RelationshipLifecycle,
    };

    #[derive(Default)]
    struct MockIgwApi {
        gateways: Mutex<Vec<String>>,
        attachments: Mutex<Vec<(String, String)>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockIgwApi {
        fn new() -> Arc<Self> {
            Arc::new(Self::default())
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

    impl IgwApi for MockIgwApi {
        fn create_internet_gateway(&self, _request: &Attributes) -> Result<Record, ProviderError> {
            self.calls.lock().unwrap().push("create".to_string());
            self.gateways.lock().unwrap().push("igw-1".to_string());
            Ok(json!({"InternetGatewayId": "igw-1"}))
        }

        fn describe_internet_gateways(
            &self,
            filters: &Filters,
        ) -> Result<Vec<Record>, ProviderError> {
            let gateways = self.gateways.lock().unwrap();
            match filters.get(IGW_ID_FILTER) {
                Some(wanted) if gateways.iter().any(|id| id == wanted) => {
                    Ok(vec![json!({"InternetGatewayId": wanted})])
                }
                Some(wanted) => Err(ProviderError::service(format!("{}: {}", NOT_FOUND, wanted))),
                None => Ok(gateways
                    .iter()
                    .map(|id| json!({"InternetGatewayId": id}))
                    .collect()),
            }
        }

        fn delete_internet_gateway(&self, igw_id: &str) -> Result<bool, ProviderError> {
            self.calls.lock().unwrap().push("delete".to_string());
            let mut gateways = self.gateways.lock().unwrap();
            let before = gateways.len();
            gateways.retain(|id| id != igw_id);
            Ok(gateways.len() < before)
        }

        fn attach_internet_gateway(
            &self,
            igw_id: &str,
            vpc_id: &str,
        ) -> Result<bool, ProviderError> {
            self.calls.lock().unwrap().push("attach".to_string());
            self.attachments
                .lock()
                .unwrap()
                .push((igw_id.to_string(), vpc_id.to_string()));
            Ok(true)
        }

        fn detach_internet_gateway(
            &self,
            igw_id: &str,
            vpc_id: &str,
        ) -> Result<bool, ProviderError> {
            self.calls.lock().unwrap().push("detach".to_string());
            let mut attachments = self.attachments.lock().unwrap();
            let before = attachments.len();
            attachments.retain(|(g, v)| !(g == igw_id && v == vpc_id));
            Ok(attachments.len() < before)
        }

        fn create_tags(&self, _resource_id: &str, _tags: &[Tag]) -> Result<bool, ProviderError> {
            Ok(true)
        }
    }

    fn attachment_pair(source_external: bool) -> RelationshipContext {
        let mut source = if source_external {
            NodeHandle::new("igw_node", Properties::external("igw-ext", Attributes::new()))
        } else {
            NodeHandle::new("igw_node", Properties::managed(Attributes::new()))
        };
        if !source_external {
            source.record.set_resource_id("igw-1");
        }
        let mut target = NodeHandle::new("vpc_node", Properties::managed(Attributes::new()));
        target.record.set_resource_id("vpc-1");
        RelationshipContext::new("dep-1", "gateway-vpc-attachment", source, target)
    }

    #[test]
    fn test_create_and_delete_gateway() {
        let api = MockIgwApi::new();
        let lifecycle = NodeLifecycle::new(Box::new(IgwHandler::new(api.clone())));
        let mut ctx = NodeContext::new(
            "igw_node",
            "dep-1",
            Properties::managed(Attributes::new()),
        );

        lifecycle.create(&mut ctx).unwrap();
        assert_eq!(ctx.record.resource_id(), Some("igw-1"));

        lifecycle.delete(&mut ctx).unwrap();
        assert_eq!(ctx.record.resource_id(), None);
        assert_eq!(api.call_count("delete"), 1);
    }

    #[test]
    fn test_associate_attaches_and_records_vpc() {
        let api = MockIgwApi::new();
        let lifecycle = RelationshipLifecycle::new(Box::new(VpcAttachmentHandler::new(api.clone())));
        let mut ctx = attachment_pair(false);

        let outcome = lifecycle.associate(&mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(api.call_count("attach"), 1);
        assert_eq!(
            ctx.source.record.get_str(ATTACHED_VPC_ATTR),
            Some("vpc-1")
        );
    }

    #[test]
    fn test_associate_external_source_bypasses_attach() {
        let api = MockIgwApi::new();
        let lifecycle = RelationshipLifecycle::new(Box::new(VpcAttachmentHandler::new(api.clone())));
        let mut ctx = attachment_pair(true);

        let outcome = lifecycle.associate(&mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(api.call_count("attach"), 0);
        // Post-associate side effects still occur.
        assert_eq!(
            ctx.source.record.get_str(ATTACHED_VPC_ATTR),
            Some("vpc-1")
        );
    }

    #[test]
    fn test_disassociate_detaches_and_clears_attr() {
        let api = MockIgwApi::new();
        let lifecycle = RelationshipLifecycle::new(Box::new(VpcAttachmentHandler::new(api.clone())));
        let mut ctx = attachment_pair(false);

        lifecycle.associate(&mut ctx).unwrap();
        let outcome = lifecycle.disassociate(&mut ctx).unwrap();

        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(api.call_count("detach"), 1);
        assert_eq!(ctx.source.record.get(ATTACHED_VPC_ATTR), None);
    }

    #[test]
    fn test_disassociate_unattached_is_retry() {
        let api = MockIgwApi::new();
        let lifecycle = RelationshipLifecycle::new(Box::new(VpcAttachmentHandler::new(api)));
        let mut ctx = attachment_pair(false);

        // Never attached: detach reports false, the handler asks to retry.
        let outcome = lifecycle.disassociate(&mut ctx).unwrap();
        assert!(outcome.retry().is_some());
    }
}
