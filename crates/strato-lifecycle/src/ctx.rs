//! Orchestrator context types.
//!
//! The orchestrator hands every lifecycle invocation a context value:
//! the node's declared properties (read-only), its mutable runtime record,
//! and the relationship edges of the node instance. The context is an
//! explicit parameter everywhere — nothing in the engine reads ambient
//! state.

use crate::task::{LifecycleError, LifecycleResult};
use serde_json::Value;
use strato_types::{Attributes, RouteSpec};

/// Runtime-record key holding the provider-assigned resource identifier.
pub const RESOURCE_ID_KEY: &str = "external_id";

/// Runtime-record key holding a route table's tracked route list.
pub const ROUTES_KEY: &str = "routes";

/// Declared node configuration, set once at deploy time.
#[derive(Debug, Clone, Default)]
pub struct Properties {
    external: bool,
    resource_id: Option<String>,
    values: Attributes,
}

impl Properties {
    /// Declares a managed resource: the engine owns its full lifecycle.
    pub fn managed(values: Attributes) -> Self {
        Self {
            external: false,
            resource_id: None,
            values,
        }
    }

    /// Declares an external resource adopted by identifier; the engine
    /// never creates or deletes it.
    pub fn external(resource_id: impl Into<String>, values: Attributes) -> Self {
        Self {
            external: true,
            resource_id: Some(resource_id.into()),
            values,
        }
    }

    /// Supplies a caller-chosen identifier for a managed resource.
    pub fn with_resource_id(mut self, resource_id: impl Into<String>) -> Self {
        self.resource_id = Some(resource_id.into());
        self
    }

    /// Returns true if the resource is externally owned.
    pub fn is_external(&self) -> bool {
        self.external
    }

    /// Returns the caller-supplied identifier, if any.
    pub fn resource_id(&self) -> Option<&str> {
        self.resource_id.as_deref()
    }

    /// Returns a declared property value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns a declared string property.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Returns a declared property or a missing-property error.
    pub fn require(&self, key: &str) -> LifecycleResult<&Value> {
        self.get(key)
            .ok_or_else(|| LifecycleError::missing_property(key))
    }

    /// Returns a declared string property or a missing-property error.
    pub fn require_str(&self, key: &str) -> LifecycleResult<&str> {
        self.require(key)?
            .as_str()
            .ok_or_else(|| LifecycleError::missing_property(key))
    }
}

/// Persisted per-instance state: the provider-assigned identifier once
/// known, plus resource-specific derived attributes.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RuntimeRecord {
    values: Attributes,
}

impl RuntimeRecord {
    /// Creates an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a stored value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.values.get(key)
    }

    /// Returns a stored string value.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.get(key).and_then(Value::as_str)
    }

    /// Stores a value.
    pub fn set(&mut self, key: impl Into<String>, value: Value) {
        self.values.insert(key.into(), value);
    }

    /// Removes a value, returning it if present.
    pub fn remove(&mut self, key: &str) -> Option<Value> {
        self.values.remove(key)
    }

    /// Returns the provider-assigned resource identifier, if known.
    pub fn resource_id(&self) -> Option<&str> {
        self.get_str(RESOURCE_ID_KEY)
    }

    /// Persists the provider-assigned resource identifier.
    pub fn set_resource_id(&mut self, id: impl Into<String>) {
        self.set(RESOURCE_ID_KEY, Value::String(id.into()));
    }

    /// Clears the identifying fields after a successful delete.
    pub fn clear_identity(&mut self) {
        self.values.remove(RESOURCE_ID_KEY);
    }

    /// Returns the tracked route list (empty if none).
    pub fn routes(&self) -> Vec<RouteSpec> {
        self.get(ROUTES_KEY)
            .and_then(|value| serde_json::from_value(value.clone()).ok())
            .unwrap_or_default()
    }

    /// Returns true if a route to the destination is tracked.
    pub fn has_route(&self, destination: &str) -> bool {
        self.routes().iter().any(|r| r.destination == destination)
    }

    /// Appends a route to the tracked list unless one with the same
    /// destination is already present. Returns true if appended.
    pub fn track_route(&mut self, route: &RouteSpec) -> bool {
        let mut routes = self.routes();
        if routes.iter().any(|r| r.destination == route.destination) {
            return false;
        }
        routes.push(route.clone());
        self.store_routes(routes);
        true
    }

    /// Removes the tracked route with the given destination. Returns true
    /// if an entry was removed.
    pub fn untrack_route(&mut self, destination: &str) -> bool {
        let mut routes = self.routes();
        let before = routes.len();
        routes.retain(|r| r.destination != destination);
        if routes.len() == before {
            return false;
        }
        self.store_routes(routes);
        true
    }

    fn store_routes(&mut self, routes: Vec<RouteSpec>) {
        // Serializing RouteSpec cannot fail; fall back to clearing the key.
        match serde_json::to_value(routes) {
            Ok(value) => self.set(ROUTES_KEY, value),
            Err(_) => {
                self.values.remove(ROUTES_KEY);
            }
        }
    }
}

/// One side of a relationship: a node instance's declared properties and
/// runtime record.
#[derive(Debug, Clone, Default)]
pub struct NodeHandle {
    /// Node-instance identifier assigned by the orchestrator.
    pub instance_id: String,
    /// Declared configuration.
    pub properties: Properties,
    /// Persisted runtime state.
    pub record: RuntimeRecord,
}

impl NodeHandle {
    /// Creates a handle.
    pub fn new(instance_id: impl Into<String>, properties: Properties) -> Self {
        Self {
            instance_id: instance_id.into(),
            properties,
            record: RuntimeRecord::new(),
        }
    }

    /// Returns the resource identifier: the persisted one if known,
    /// otherwise the declared one.
    pub fn resource_id(&self) -> Option<&str> {
        self.record
            .resource_id()
            .or_else(|| self.properties.resource_id())
    }
}

/// A relationship edge of the current node instance.
#[derive(Debug, Clone)]
pub struct RelationshipEdge {
    /// Relationship type string (e.g. `contained-in-vpc`).
    pub type_name: String,
    /// The target side of the edge.
    pub target: NodeHandle,
}

impl RelationshipEdge {
    /// Creates an edge.
    pub fn new(type_name: impl Into<String>, target: NodeHandle) -> Self {
        Self {
            type_name: type_name.into(),
            target,
        }
    }
}

/// Context for one node lifecycle invocation.
#[derive(Debug, Clone, Default)]
pub struct NodeContext {
    /// Node-instance identifier assigned by the orchestrator.
    pub instance_id: String,
    /// Deployment identifier the instance belongs to.
    pub deployment_id: String,
    /// Declared configuration (read-only).
    pub properties: Properties,
    /// Persisted runtime state (mutable for the duration of one call).
    pub record: RuntimeRecord,
    /// Relationship edges of this node instance.
    pub relationships: Vec<RelationshipEdge>,
}

impl NodeContext {
    /// Creates a context with an empty runtime record.
    pub fn new(
        instance_id: impl Into<String>,
        deployment_id: impl Into<String>,
        properties: Properties,
    ) -> Self {
        Self {
            instance_id: instance_id.into(),
            deployment_id: deployment_id.into(),
            properties,
            record: RuntimeRecord::new(),
            relationships: Vec::new(),
        }
    }

    /// Adds a relationship edge.
    pub fn with_relationship(mut self, edge: RelationshipEdge) -> Self {
        self.relationships.push(edge);
        self
    }

    /// Returns the resource identifier: the persisted one if known,
    /// otherwise the declared one.
    pub fn resource_id(&self) -> Option<&str> {
        self.record
            .resource_id()
            .or_else(|| self.properties.resource_id())
    }
}

/// Context for one relationship lifecycle invocation, scoped to a directed
/// source→target pair.
#[derive(Debug, Clone)]
pub struct RelationshipContext {
    /// Deployment identifier the pair belongs to.
    pub deployment_id: String,
    /// Relationship type string.
    pub type_name: String,
    /// The source side; only its external flag is consulted.
    pub source: NodeHandle,
    /// The target side, assumed already reconciled by its own controller.
    pub target: NodeHandle,
}

impl RelationshipContext {
    /// Creates a relationship context.
    pub fn new(
        deployment_id: impl Into<String>,
        type_name: impl Into<String>,
        source: NodeHandle,
        target: NodeHandle,
    ) -> Self {
        Self {
            deployment_id: deployment_id.into(),
            type_name: type_name.into(),
            source,
            target,
        }
    }

    /// Returns true if the source is externally owned.
    pub fn source_external(&self) -> bool {
        self.source.properties.is_external()
    }
}
