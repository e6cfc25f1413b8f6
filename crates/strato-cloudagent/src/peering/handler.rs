//! Peering connection lifecycle and peering-route handlers.

use std::sync::Arc;

use serde_json::json;
use strato_lifecycle::gateway::{self, ProviderError};
use strato_lifecycle::matcher::{find_single, ResourceQuery};
use strato_lifecycle::{
    single_target_of_type, LifecycleError, LifecycleResult, NodeContext, RelationshipContext,
    RelationshipHandler, ResourceHandler, RetryDirective, RouteApi, RouteReconciler, StepOutcome,
};
use strato_types::{record_str, Attributes, Filters, Record, RouteSpec, Tag};

use super::types::{
    NOT_FOUND, PCX_ID_FIELD, PCX_ID_FILTER, PEER_CIDR_BLOCK, PEER_VPC_ID, STATUS_ACTIVE,
    STATUS_FIELD, STATUS_PENDING, STATUS_PROVISIONING,
};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::relationship_types::CONTAINED_IN_VPC;

/// Provider calls used by the peering module's node lifecycle.
pub trait PeeringApi: Send + Sync {
    /// Requests a peering connection, returning its record.
    fn create_peering_connection(&self, request: &Attributes) -> Result<Record, ProviderError>;

    /// Lists peering connections matching the filters.
    fn describe_peering_connections(&self, filters: &Filters)
        -> Result<Vec<Record>, ProviderError>;

    /// Accepts a pending peering connection.
    fn accept_peering_connection(&self, pcx_id: &str) -> Result<bool, ProviderError>;

    /// Deletes a peering connection.
    fn delete_peering_connection(&self, pcx_id: &str) -> Result<bool, ProviderError>;

    /// Attaches tags to a resource.
    fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<bool, ProviderError>;
}

/// Node lifecycle handler for peering connections.
pub struct PeeringHandler {
    api: Arc<dyn PeeringApi>,
    query: ResourceQuery,
}

impl PeeringHandler {
    /// Creates a handler over the provider API.
    pub fn new(api: Arc<dyn PeeringApi>) -> Self {
        Self {
            api,
            query: ResourceQuery::new(PCX_ID_FILTER, PCX_ID_FIELD, NOT_FOUND),
        }
    }

    fn status(&self, ctx: &NodeContext) -> LifecycleResult<Option<String>> {
        Ok(self
            .get_resource(ctx)?
            .as_ref()
            .and_then(|r| record_str(r, STATUS_FIELD))
            .map(str::to_owned))
    }
}

impl ResourceHandler for PeeringHandler {
    fn type_name(&self) -> &str {
        "peering-connection"
    }

    fn get_resource(&self, ctx: &NodeContext) -> LifecycleResult<Option<Record>> {
        let pcx_id = match ctx.resource_id() {
            Some(id) => id,
            None => return Ok(None),
        };
        let filters = self.query.filters_for(pcx_id);
        find_single(&self.query, |f| self.api.describe_peering_connections(f), &filters)
    }

    fn create(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let vpc_id = single_target_of_type(&ctx.relationships, CONTAINED_IN_VPC)?;
        let mut request = Attributes::new();
        request.insert("VpcId".to_string(), json!(vpc_id));
        request.insert(
            "PeerVpcId".to_string(),
            json!(ctx.properties.require_str(PEER_VPC_ID)?),
        );

        let record = gateway::execute(
            "create_peering_connection",
            || self.api.create_peering_connection(&request),
            true,
        )?;

        let pcx_id = record_str(&record, PCX_ID_FIELD)
            .ok_or_else(|| LifecycleError::empty_response("create_peering_connection"))?
            .to_string();
        ctx.record.set_resource_id(&pcx_id);

        audit_log!(
            AuditRecord::new(
                AuditCategory::ResourceCreate,
                "PeeringHandler",
                "create_peering_connection"
            )
            .with_outcome(AuditOutcome::Success)
            .with_object_id(pcx_id)
            .with_object_type("peering-connection")
            .with_details(json!({"vpc_id": vpc_id}))
        );

        Ok(StepOutcome::Done)
    }

    fn start(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let pcx_id = match ctx.record.resource_id() {
            Some(id) => id.to_string(),
            None => return Ok(StepOutcome::Unfulfilled),
        };

        match self.status(ctx)?.as_deref() {
            Some(STATUS_ACTIVE) => Ok(StepOutcome::Done),
            Some(STATUS_PENDING) => {
                gateway::execute(
                    "accept_peering_connection",
                    || self.api.accept_peering_connection(&pcx_id),
                    true,
                )?;
                Ok(StepOutcome::Retry(RetryDirective::after_secs(
                    format!("peering connection {} accepted, provisioning", pcx_id),
                    10,
                )))
            }
            Some(STATUS_PROVISIONING) => Ok(StepOutcome::Retry(RetryDirective::after_secs(
                format!("peering connection {} still provisioning", pcx_id),
                10,
            ))),
            _ => Ok(StepOutcome::Unfulfilled),
        }
    }

    fn delete(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let pcx_id = match ctx.record.resource_id() {
            Some(id) => id.to_string(),
            None => return Ok(StepOutcome::Unfulfilled),
        };

        gateway::execute(
            "delete_peering_connection",
            || self.api.delete_peering_connection(&pcx_id),
            true,
        )?;

        audit_log!(
            AuditRecord::new(
                AuditCategory::ResourceDelete,
                "PeeringHandler",
                "delete_peering_connection"
            )
            .with_outcome(AuditOutcome::Success)
            .with_object_id(pcx_id)
            .with_object_type("peering-connection")
        );

        Ok(StepOutcome::Done)
    }

    fn apply_tags(&self, ctx: &NodeContext, tags: &[Tag]) -> LifecycleResult<()> {
        let pcx_id = ctx
            .record
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("create_tags"))?
            .to_string();
        gateway::execute("create_tags", || self.api.create_tags(&pcx_id, tags), true)?;
        Ok(())
    }
}

/// Relationship handler wiring a route table (source) to a peering
/// connection (target) by upserting a route toward the peer's CIDR.
///
/// Unlike other relationships, this one runs even when the route table is
/// declared external: a peer route exists only if something writes it.
pub struct PeeringRouteHandler {
    api: Arc<dyn RouteApi>,
    routes: RouteReconciler,
}

impl PeeringRouteHandler {
    /// Creates a handler over the provider route API.
    pub fn new(api: Arc<dyn RouteApi>) -> Self {
        Self {
            api,
            routes: RouteReconciler::default(),
        }
    }

    fn route_for(ctx: &RelationshipContext) -> LifecycleResult<(String, RouteSpec)> {
        let table_id = ctx
            .source
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("create_route"))?
            .to_string();
        let pcx_id = ctx
            .target
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("create_route"))?;
        let destination = ctx.target.properties.require_str(PEER_CIDR_BLOCK)?;
        Ok((table_id, RouteSpec::to(destination).via_peering(pcx_id)))
    }
}

impl RelationshipHandler for PeeringRouteHandler {
    fn type_name(&self) -> &str {
        "peering-route"
    }

    fn applies_to_external(&self) -> bool {
        true
    }

    fn associate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<StepOutcome> {
        let (table_id, route) = Self::route_for(ctx)?;

        self.routes
            .create_route(self.api.as_ref(), &table_id, &route, Some(&mut ctx.source.record))?;

        audit_log!(
            AuditRecord::new(AuditCategory::RouteChange, "PeeringRoute", "add_peer_route")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(table_id)
                .with_object_type("route-table")
                .with_details(json!({"destination": route.destination}))
        );

        Ok(StepOutcome::Done)
    }

    fn disassociate(&self, ctx: &mut RelationshipContext) -> LifecycleResult<StepOutcome> {
        let (table_id, route) = Self::route_for(ctx)?;

        let deleted = self.routes.delete_route(
            self.api.as_ref(),
            &table_id,
            &route,
            Some(&mut ctx.source.record),
        )?;
        if !deleted {
            return Ok(StepOutcome::Retry(RetryDirective::after_secs(
                format!("peer route {} not yet deletable", route),
                10,
            )));
        }

        audit_log!(
            AuditRecord::new(AuditCategory::RouteChange, "PeeringRoute", "remove_peer_route")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(table_id)
                .with_object_type("route-table")
                .with_details(json!({"destination": route.destination}))
        );

        Ok(StepOutcome::Done)
    }
}
