//! Elastic address lifecycle and association handlers.

use std::sync::Arc;

use serde_json::json;
use strato_lifecycle::gateway::{self, ProviderError};
use strato_lifecycle::matcher::{find_single, ResourceQuery};
use strato_lifecycle::{
    LifecycleError, LifecycleResult, NodeContext, RelationshipContext, RelationshipHandler,
    ResourceHandler, StepOutcome,
};
use strato_types::{record_str, Attributes, Filters, Record, Tag};

use super::types::{
    ALLOCATION_ID_FIELD, ALLOCATION_ID_FILTER, ASSOCIATED_INSTANCE_ATTR, ASSOCIATION_ID_ATTR,
    ASSOCIATION_ID_FIELD, NOT_FOUND, PUBLIC_IP_ATTR, PUBLIC_IP_FIELD,
};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;

/// Provider calls used by the elastic address module.
pub trait EipApi: Send + Sync {
    /// Allocates an address, returning its record.
    fn allocate_address(&self, request: &Attributes) -> Result<Record, ProviderError>;

    /// Lists addresses matching the filters.
    fn describe_addresses(&self, filters: &Filters) -> Result<Vec<Record>, ProviderError>;

    /// Releases an address.
    fn release_address(&self, allocation_id: &str) -> Result<bool, ProviderError>;

    /// Associates an address with an instance, returning the association
    /// record.
    fn associate_address(
        &self,
        allocation_id: &str,
        instance_id: &str,
    ) -> Result<Record, ProviderError>;

    /// Disassociates an address.
    fn disassociate_address(&self, association_id: &str) -> Result<bool, ProviderError>;

    /// Attaches tags to a resource.
    fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<bool, ProviderError>;
}

/// Node lifecycle handler for elastic addresses.
pub struct EipHandler {
    api: Arc<dyn EipApi>,
    query: ResourceQuery,
}

impl EipHandler {
    /// Creates a handler over the provider API.
    pub fn new(api: Arc<dyn EipApi>) -> Self {
        Self {
            api,
            query: ResourceQuery::new(ALLOCATION_ID_FILTER, ALLOCATION_ID_FIELD, NOT_FOUND),
        }
    }
}

impl ResourceHandler for EipHandler {
    fn type_name(&self) -> &str {
        "elastic-address"
    }

    fn get_resource(&self, ctx: &NodeContext) -> LifecycleResult<Option<Record>> {
        let allocation_id = match ctx.resource_id() {
            Some(id) => id,
            None => return Ok(None),
        };
        let filters = self.query.filters_for(allocation_id);
        find_single(&self.query, |f| self.api.describe_addresses(f), &filters)
    }

    fn create(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let record = gateway::execute(
            "allocate_address",
            || self.api.allocate_address(&Attributes::new()),
            true,
        )?;

        let allocation_id = record_str(&record, ALLOCATION_ID_FIELD)
            .ok_or_else(|| LifecycleError::empty_response("allocate_address"))?
            .to_string();
        ctx.record.set_resource_id(&allocation_id);
        if let Some(ip) = record_str(&record, PUBLIC_IP_FIELD) {
            ctx.record.set(PUBLIC_IP_ATTR, json!(ip));
        }

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceCreate, "EipHandler", "allocate_address")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(allocation_id)
                .with_object_type("elastic-address")
        );

        Ok(StepOutcome::Done)
    }

    fn delete(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let allocation_id = match ctx.record.resource_id() {
            Some(id) => id.to_string(),
            None => return Ok(StepOutcome::Unfulfilled),
        };

        gateway::execute(
            "release_address",
            || self.api.release_address(&allocation_id),
            true,
        )?;
        ctx.record.remove(PUBLIC_IP_ATTR);

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceDelete, "EipHandler", "release_address")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(allocation_id)
                .with_object_type("elastic-address")
        );

        Ok(StepOutcome::Done)
    }

    fn apply_tags(&self, ctx: &NodeContext, tags: &[Tag]) -> LifecycleResult<()> {
        let allocation_id = ctx
            .record
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("create_tags"))?
            .to_string();
        gateway::execute("create_tags", || self.api.create_tags(&allocation_id, tags), true)?;
        Ok(())
    }

    fn absorb_attributes(&self, ctx: &mut NodeContext, record: &Record) -> LifecycleResult<()> {
        if let Some(ip) = record_str(record, PUBLIC_IP_FIELD) {
            ctx.record.set(PUBLIC_IP_ATTR, json!(ip));
        }
        Ok(())
    }
}

/// Relationship handler associating an address (source) with an instance
/// (target).
pub struct AddressAssociationHandler {
    api: Arc<dyn EipApi>,
}

impl AddressAssociationHandler {
    /// Creates a handler over the provider API.
    pub fn new(api: Arc<dyn EipApi>) -> Self {
        Self { api }
    }
}

impl RelationshipHandler for AddressAssociationHandler {
    fn type_name(&self) -> &str {
        "address-association"
    }

    fn associate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<StepOutcome> {
        // An association already on record means a prior invocation
        // settled; converge without another provider call.
        if ctx.source.record.get_str(ASSOCIATION_ID_ATTR).is_some() {
            return Ok(StepOutcome::Done);
        }

        let allocation_id = ctx
            .source
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("associate_address"))?
            .to_string();
        let instance_id = ctx
            .target
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("associate_address"))?
            .to_string();

        let record = gateway::execute(
            "associate_address",
            || self.api.associate_address(&allocation_id, &instance_id),
            true,
        )?;

        if let Some(association_id) = record_str(&record, ASSOCIATION_ID_FIELD) {
            ctx.source
                .record
                .set(ASSOCIATION_ID_ATTR, json!(association_id));
        }

        audit_log!(
            AuditRecord::new(AuditCategory::Association, "AddressAssociation", "associate")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(allocation_id)
                .with_object_type("elastic-address")
                .with_details(json!({"instance_id": instance_id}))
        );

        Ok(StepOutcome::Done)
    }

    fn disassociate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<StepOutcome> {
        let association_id = match ctx.source.record.get_str(ASSOCIATION_ID_ATTR) {
            Some(id) => id.to_string(),
            // Nothing on record: the association never settled or was
            // already removed.
            None => return Ok(StepOutcome::Done),
        };

        gateway::execute(
            "disassociate_address",
            || self.api.disassociate_address(&association_id),
            true,
        )?;

        audit_log!(
            AuditRecord::new(AuditCategory::Disassociation, "AddressAssociation", "disassociate")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(association_id)
                .with_object_type("elastic-address")
        );

        Ok(StepOutcome::Done)
    }

    fn post_associate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<()> {
        if let Some(instance_id) = ctx.target.resource_id().map(str::to_owned) {
            ctx.source
                .record
                .set(ASSOCIATED_INSTANCE_ATTR, json!(instance_id));
        }
        Ok(())
    }

    fn post_disassociate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<()> {
        ctx.source.record.remove(ASSOCIATION_ID_ATTR);
        ctx.source.record.remove(ASSOCIATED_INSTANCE_ATTR);
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
    struct MockEipApi {
        addresses: Mutex<Vec<String>>,
        associations: Mutex<Vec<(String, String)>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockEipApi {
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

    impl EipApi for MockEipApi {
        fn allocate_address(&self, _request: &Attributes) -> Result<Record, ProviderError> {
            self.calls.lock().unwrap().push("allocate".to_string());
            self.addresses.lock().unwrap().push("eipalloc-1".to_string());
            Ok(json!({"AllocationId": "eipalloc-1", "PublicIp": "54.0.0.1"}))
        }

        fn describe_addresses(&self, filters: &Filters) -> Result<Vec<Record>, ProviderError> {
            let addresses = self.addresses.lock().unwrap();
            match filters.get(ALLOCATION_ID_FILTER) {
                Some(wanted) if addresses.iter().any(|id| id == wanted) => {
                    Ok(vec![json!({"AllocationId": wanted, "PublicIp": "54.0.0.1"})])
                }
                Some(wanted) => Err(ProviderError::service(format!("{}: {}", NOT_FOUND, wanted))),
                None => Ok(Vec::new()),
            }
        }

        fn release_address(&self, allocation_id: &str) -> Result<bool, ProviderError> {
            self.calls.lock().unwrap().push("release".to_string());
            let mut addresses = self.addresses.lock().unwrap();
            let before = addresses.len();
            addresses.retain(|id| id != allocation_id);
            Ok(addresses.len() < before)
        }

        fn associate_address(
            &self,
            allocation_id: &str,
            instance_id: &str,
        ) -> Result<Record, ProviderError> {
            self.calls.lock().unwrap().push("associate".to_string());
            self.associations
                .lock()
                .unwrap()
                .push((allocation_id.to_string(), instance_id.to_string()));
            Ok(json!({"AssociationId": "eipassoc-1"}))
        }

        fn disassociate_address(&self, _association_id: &str) -> Result<bool, ProviderError> {
            self.calls.lock().unwrap().push("disassociate".to_string());
            self.associations.lock().unwrap().clear();
            Ok(true)
        }

        fn create_tags(&self, _resource_id: &str, _tags: &[Tag]) -> Result<bool, ProviderError> {
            Ok(true)
        }
    }

    fn association_pair(source_external: bool) -> RelationshipContext {
        let mut source = if source_external {
            NodeHandle::new("eip_node", Properties::external("eipalloc-1", Attributes::new()))
        } else {
            NodeHandle::new("eip_node", Properties::managed(Attributes::new()))
        };
        if !source_external {
            source.record.set_resource_id("eipalloc-1");
        }
        let mut target = NodeHandle::new("inst_node", Properties::managed(Attributes::new()));
        target.record.set_resource_id("i-1");
        RelationshipContext::new("dep-1", "address-association", source, target)
    }

    #[test]
    fn test_allocate_and_release() {
        let api = MockEipApi::new();
        let lifecycle = NodeLifecycle::new(Box::new(EipHandler::new(api.clone())));
        let mut ctx = NodeContext::new("eip_node", "dep-1", Properties::managed(Attributes::new()));

        lifecycle.create(&mut ctx).unwrap();
        assert_eq!(ctx.record.resource_id(), Some("eipalloc-1"));
        assert_eq!(ctx.record.get_str(PUBLIC_IP_ATTR), Some("54.0.0.1"));

        lifecycle.delete(&mut ctx).unwrap();
        assert_eq!(ctx.record.resource_id(), None);
        assert_eq!(ctx.record.get(PUBLIC_IP_ATTR), None);
        assert_eq!(api.call_count("release"), 1);
    }

    #[test]
    fn test_associate_writes_association_attrs() {
        let api = MockEipApi::new();
        let lifecycle =
            RelationshipLifecycle::new(Box::new(AddressAssociationHandler::new(api.clone())));
        let mut ctx = association_pair(false);

        let outcome = lifecycle.associate(&mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(
            ctx.source.record.get_str(ASSOCIATION_ID_ATTR),
            Some("eipassoc-1")
        );
        assert_eq!(
            ctx.source.record.get_str(ASSOCIATED_INSTANCE_ATTR),
            Some("i-1")
        );
    }

    #[test]
    fn test_associate_retry_converges_without_second_call() {
        let api = MockEipApi::new();
        let lifecycle =
            RelationshipLifecycle::new(Box::new(AddressAssociationHandler::new(api.clone())));
        let mut ctx = association_pair(false);

        lifecycle.associate(&mut ctx).unwrap();
        lifecycle.associate(&mut ctx).unwrap();

        assert_eq!(api.call_count("associate"), 1);
    }

    #[test]
    fn test_external_source_bypass_still_records_instance() {
        let api = MockEipApi::new();
        let lifecycle =
            RelationshipLifecycle::new(Box::new(AddressAssociationHandler::new(api.clone())));
        let mut ctx = association_pair(true);

        let outcome = lifecycle.associate(&mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(api.call_count("associate"), 0);
        // Post-associate side effects still occur.
        assert_eq!(
            ctx.source.record.get_str(ASSOCIATED_INSTANCE_ATTR),
            Some("i-1")
        );
        // But no provider-derived association exists.
        assert_eq!(ctx.source.record.get(ASSOCIATION_ID_ATTR), None);
    }

    #[test]
    fn test_disassociate_clears_attrs() {
        let api = MockEipApi::new();
        let lifecycle =
            RelationshipLifecycle::new(Box::new(AddressAssociationHandler::new(api.clone())));
        let mut ctx = association_pair(false);

        lifecycle.associate(&mut ctx).unwrap();
        let outcome = lifecycle.disassociate(&mut ctx).unwrap();

        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(api.call_count("disassociate"), 1);
        assert_eq!(ctx.source.record.get(ASSOCIATION_ID_ATTR), None);
        assert_eq!(ctx.source.record.get(ASSOCIATED_INSTANCE_ATTR), None);
    }

    #[test]
    fn test_disassociate_without_association_is_benign() {
        let api = MockEipApi::new();
        let lifecycle =
            RelationshipLifecycle::new(Box::new(AddressAssociationHandler::new(api.clone())));
        let mut ctx = association_pair(false);

        let outcome = lifecycle.disassociate(&mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(api.call_count("disassociate"), 0);
    }
}
