//! Route table lifecycle handler.

use std::sync::Arc;

use serde_json::json;
use strato_lifecycle::gateway::{self, ProviderError};
use strato_lifecycle::matcher::{find_single, ResourceQuery};
use strato_lifecycle::{
    single_target_of_type, LifecycleError, LifecycleResult, NodeContext, ResourceHandler,
    RouteApi, RouteReconciler, StepOutcome,
};
use strato_types::{record_str, Attributes, Filters, Record, RouteSpec, Tag};

use super::types::{
    NOT_FOUND, ROUTE_EXISTS, ROUTE_NOT_FOUND, TABLE_ID_FIELD, TABLE_ID_FILTER, VPC_ATTR,
};
use crate::audit::{AuditCategory, AuditOutcome, AuditRecord};
use crate::audit_log;
use crate::relationship_types::CONTAINED_IN_VPC;

/// Provider calls used by the route table module.
///
/// Extends the engine's [`RouteApi`] with table-level calls so one client
/// serves both the node lifecycle and per-entry route reconciliation.
pub trait RouteTableApi: RouteApi + Send + Sync {
    /// Creates a route table in a VPC, returning its record.
    fn create_route_table(&self, request: &Attributes) -> Result<Record, ProviderError>;

    /// Lists route tables matching the filters.
    fn describe_route_tables(&self, filters: &Filters) -> Result<Vec<Record>, ProviderError>;

    /// Deletes a route table.
    fn delete_route_table(&self, table_id: &str) -> Result<bool, ProviderError>;

    /// Attaches tags to a resource.
    fn create_tags(&self, resource_id: &str, tags: &[Tag]) -> Result<bool, ProviderError>;
}

/// Node lifecycle handler for route tables.
pub struct RouteTableHandler {
    api: Arc<dyn RouteTableApi>,
    query: ResourceQuery,
    routes: RouteReconciler,
}

impl RouteTableHandler {
    /// Creates a handler over the provider API.
    pub fn new(api: Arc<dyn RouteTableApi>) -> Self {
        Self {
            api,
            query: ResourceQuery::new(TABLE_ID_FILTER, TABLE_ID_FIELD, NOT_FOUND),
            routes: RouteReconciler::new(ROUTE_EXISTS, ROUTE_NOT_FOUND),
        }
    }

    /// Upserts one route in this table, tracking it in the runtime record.
    pub fn add_route(&self, ctx: &mut NodeContext, route: &RouteSpec) -> LifecycleResult<()> {
        let table_id = ctx
            .record
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("create_route"))?
            .to_string();

        self.routes
            .create_route(self.api.as_ref(), &table_id, route, Some(&mut ctx.record))?;

        audit_log!(
            AuditRecord::new(AuditCategory::RouteChange, "RouteTableHandler", "add_route")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(table_id)
                .with_object_type("route-table")
                .with_details(json!({"destination": route.destination}))
        );

        Ok(())
    }

    /// Deletes one route from this table. Returns `false` when the route
    /// is not yet deletable and the caller should retry.
    pub fn remove_route(&self, ctx: &mut NodeContext, route: &RouteSpec) -> LifecycleResult<bool> {
        let table_id = ctx
            .record
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("delete_route"))?
            .to_string();

        let deleted = self.routes.delete_route(
            self.api.as_ref(),
            &table_id,
            route,
            Some(&mut ctx.record),
        )?;

        if deleted {
            audit_log!(
                AuditRecord::new(AuditCategory::RouteChange, "RouteTableHandler", "remove_route")
                    .with_outcome(AuditOutcome::Success)
                    .with_object_id(table_id)
                    .with_object_type("route-table")
                    .with_details(json!({"destination": route.destination}))
            );
        }

        Ok(deleted)
    }
}

impl ResourceHandler for RouteTableHandler {
    fn type_name(&self) -> &str {
        "route-table"
    }

    fn get_resource(&self, ctx: &NodeContext) -> LifecycleResult<Option<Record>> {
        let table_id = match ctx.resource_id() {
            Some(id) => id,
            None => return Ok(None),
        };
        let filters = self.query.filters_for(table_id);
        find_single(&self.query, |f| self.api.describe_route_tables(f), &filters)
    }

    fn create(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let vpc_id = single_target_of_type(&ctx.relationships, CONTAINED_IN_VPC)?;
        let mut request = Attributes::new();
        request.insert("VpcId".to_string(), json!(vpc_id));

        let record = gateway::execute(
            "create_route_table",
            || self.api.create_route_table(&request),
            true,
        )?;

        let table_id = record_str(&record, TABLE_ID_FIELD)
            .ok_or_else(|| LifecycleError::empty_response("create_route_table"))?
            .to_string();
        ctx.record.set_resource_id(&table_id);
        ctx.record.set(VPC_ATTR, json!(vpc_id));

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceCreate, "RouteTableHandler", "create_route_table")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(table_id)
                .with_object_type("route-table")
                .with_details(json!({"vpc_id": vpc_id}))
        );

        Ok(StepOutcome::Done)
    }

    fn delete(&self, ctx: &mut NodeContext) -> LifecycleResult<StepOutcome> {
        let table_id = match ctx.record.resource_id() {
            Some(id) => id.to_string(),
            None => return Ok(StepOutcome::Unfulfilled),
        };

        // Tracked routes go first; the provider rejects deleting a table
        // that still forwards traffic.
        for route in ctx.record.routes() {
            if !self.remove_route(ctx, &route)? {
                return Ok(StepOutcome::Retry(
                    strato_lifecycle::RetryDirective::after_secs(
                        format!("route {} in {} not yet deletable", route, table_id),
                        10,
                    ),
                ));
            }
        }

        gateway::execute(
            "delete_route_table",
            || self.api.delete_route_table(&table_id),
            true,
        )?;

        audit_log!(
            AuditRecord::new(AuditCategory::ResourceDelete, "RouteTableHandler", "delete_route_table")
                .with_outcome(AuditOutcome::Success)
                .with_object_id(table_id)
                .with_object_type("route-table")
        );

        Ok(StepOutcome::Done)
    }

    fn apply_tags(&self, ctx: &NodeContext, tags: &[Tag]) -> LifecycleResult<()> {
        let table_id = ctx
            .record
            .resource_id()
            .ok_or_else(|| LifecycleError::empty_response("create_tags"))?
            .to_string();
        gateway::execute("create_tags", || self.api.create_tags(&table_id, tags), true)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::sync::Mutex;
    use strato_lifecycle::{
        NodeHandle, NodeLifecycle, Outcome, Properties, RelationshipEdge,
    };

    #[derive(Default)]
    struct MockRouteTableApi {
        tables: Mutex<Vec<String>>,
        routes: Mutex<Vec<(String, String)>>,
        calls: Mutex<Vec<String>>,
    }

    impl MockRouteTableApi {
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

    impl RouteApi for MockRouteTableApi {
        fn create_route(&self, table_id: &str, route: &RouteSpec) -> Result<bool, ProviderError> {
            self.calls.lock().unwrap().push("create_route".to_string());
            let mut routes = self.routes.lock().unwrap();
            let key = (table_id.to_string(), route.destination.clone());
            if routes.contains(&key) {
                return Err(ProviderError::service(format!(
                    "{}: route to {} exists",
                    ROUTE_EXISTS, route.destination
                )));
            }
            routes.push(key);
            Ok(true)
        }

        fn delete_route(&self, table_id: &str, route: &RouteSpec) -> Result<bool, ProviderError> {
            self.calls.lock().unwrap().push("delete_route".to_string());
            let mut routes = self.routes.lock().unwrap();
            let key = (table_id.to_string(), route.destination.clone());
            if let Some(pos) = routes.iter().position(|k| *k == key) {
                routes.remove(pos);
                Ok(true)
            } else {
                Err(ProviderError::service(format!(
                    "{}: no route to {}",
                    ROUTE_NOT_FOUND, route.destination
                )))
            }
        }
    }

    impl RouteTableApi for MockRouteTableApi {
        fn create_route_table(&self, _request: &Attributes) -> Result<Record, ProviderError> {
            self.calls.lock().unwrap().push("create_table".to_string());
            self.tables.lock().unwrap().push("rtb-1".to_string());
            Ok(json!({"RouteTableId": "rtb-1"}))
        }

        fn describe_route_tables(&self, filters: &Filters) -> Result<Vec<Record>, ProviderError> {
            let tables = self.tables.lock().unwrap();
            match filters.get(TABLE_ID_FILTER) {
                Some(wanted) if tables.iter().any(|id| id == wanted) => {
                    Ok(vec![json!({"RouteTableId": wanted})])
                }
                Some(wanted) => Err(ProviderError::service(format!("{}: {}", NOT_FOUND, wanted))),
                None => Ok(tables.iter().map(|id| json!({"RouteTableId": id})).collect()),
            }
        }

        fn delete_route_table(&self, table_id: &str) -> Result<bool, ProviderError> {
            self.calls.lock().unwrap().push("delete_table".to_string());
            let mut tables = self.tables.lock().unwrap();
            let before = tables.len();
            tables.retain(|id| id != table_id);
            Ok(tables.len() < before)
        }

        fn create_tags(&self, _resource_id: &str, _tags: &[Tag]) -> Result<bool, ProviderError> {
            Ok(true)
        }
    }

    fn table_ctx() -> NodeContext {
        let mut target = NodeHandle::new("vpc_node", Properties::managed(Attributes::new()));
        target.record.set_resource_id("vpc-1");
        NodeContext::new("rtb_node", "dep-1", Properties::managed(Attributes::new()))
            .with_relationship(RelationshipEdge::new(CONTAINED_IN_VPC, target))
    }

    #[test]
    fn test_create_table_in_vpc() {
        let api = MockRouteTableApi::new();
        let lifecycle = NodeLifecycle::new(Box::new(RouteTableHandler::new(api.clone())));
        let mut ctx = table_ctx();

        let outcome = lifecycle.create(&mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(ctx.record.resource_id(), Some("rtb-1"));
        assert_eq!(ctx.record.get_str(VPC_ATTR), Some("vpc-1"));
    }

    #[test]
    fn test_add_route_tracks_entry() {
        let api = MockRouteTableApi::new();
        let handler = RouteTableHandler::new(api.clone());
        let mut ctx = table_ctx();
        ctx.record.set_resource_id("rtb-1");
        api.tables.lock().unwrap().push("rtb-1".to_string());

        let route = RouteSpec::to("0.0.0.0/0").via_gateway("igw-1");
        handler.add_route(&mut ctx, &route).unwrap();

        assert!(ctx.record.has_route("0.0.0.0/0"));
        assert_eq!(api.call_count("create_route"), 1);
    }

    #[test]
    fn test_add_route_twice_converges() {
        let api = MockRouteTableApi::new();
        let handler = RouteTableHandler::new(api.clone());
        let mut ctx = table_ctx();
        ctx.record.set_resource_id("rtb-1");

        let route = RouteSpec::to("0.0.0.0/0").via_gateway("igw-1");
        handler.add_route(&mut ctx, &route).unwrap();
        // The provider reports a duplicate on the second call.
        handler.add_route(&mut ctx, &route).unwrap();

        assert_eq!(ctx.record.routes().len(), 1);
    }

    #[test]
    fn test_delete_table_removes_tracked_routes_first() {
        let api = MockRouteTableApi::new();
        let lifecycle = NodeLifecycle::new(Box::new(RouteTableHandler::new(api.clone())));
        let handler = RouteTableHandler::new(api.clone());
        let mut ctx = table_ctx();

        lifecycle.create(&mut ctx).unwrap();
        handler
            .add_route(&mut ctx, &RouteSpec::to("0.0.0.0/0").via_gateway("igw-1"))
            .unwrap();

        let outcome = lifecycle.delete(&mut ctx).unwrap();
        assert_eq!(outcome, Outcome::Complete);
        assert_eq!(api.call_count("delete_route"), 1);
        assert_eq!(api.call_count("delete_table"), 1);
        assert_eq!(ctx.record.resource_id(), None);
    }

    #[test]
    fn test_remove_route_absent_is_benign() {
        let api = MockRouteTableApi::new();
        let handler = RouteTableHandler::new(api);
        let mut ctx = table_ctx();
        ctx.record.set_resource_id("rtb-1");

        let route = RouteSpec::to("10.9.0.0/16").via_gateway("igw-1");
        let deleted = handler.remove_route(&mut ctx, &route).unwrap();
        assert!(deleted);
    }
}
