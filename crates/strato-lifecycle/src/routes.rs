//! Route reconciler.
//!
//! Idempotent upsert/delete of individual routing entries inside a shared
//! routing table resource. Applied routes are tracked in the table's
//! runtime record so repeated invocations converge rather than duplicate:
//! a provider-reported "already exists" is still recorded locally, because
//! a prior invocation may have created the route without surviving long
//! enough to record it.

use crate::ctx::RuntimeRecord;
use crate::gateway::{self, ProviderError};
use crate::task::{LifecycleError, LifecycleResult};
use log::{debug, info};
use strato_types::RouteSpec;

/// Provider calls for manipulating routes within one routing table.
pub trait RouteApi {
    /// Creates a route. The provider reports duplicates by error message.
    fn create_route(&self, table_id: &str, route: &RouteSpec) -> Result<bool, ProviderError>;

    /// Deletes a route. The provider reports missing routes by error
    /// message; `Ok(false)` means the call completed but the route is not
    /// yet deletable.
    fn delete_route(&self, table_id: &str, route: &RouteSpec) -> Result<bool, ProviderError>;
}

/// Reconciles route entries against a routing table, with per-call-site
/// sentinel strings for the provider's duplicate/missing error messages.
#[derive(Debug, Clone)]
pub struct RouteReconciler {
    /// Fragment of the provider error meaning the route already exists.
    pub already_exists: String,
    /// Fragment of the provider error meaning the route does not exist.
    pub not_found: String,
}

impl Default for RouteReconciler {
    fn default() -> Self {
        Self {
            already_exists: "RouteAlreadyExists".to_string(),
            not_found: "InvalidRoute.NotFound".to_string(),
        }
    }
}

impl RouteReconciler {
    /// Creates a reconciler with custom sentinel fragments.
    pub fn new(already_exists: impl Into<String>, not_found: impl Into<String>) -> Self {
        Self {
            already_exists: already_exists.into(),
            not_found: not_found.into(),
        }
    }

    /// Creates one route in the table, converging across retries.
    ///
    /// The route's next-hop exclusivity is validated before any provider
    /// call. A duplicate reported by the provider is success; either
    /// success path appends the route to the table record's tracked list
    /// (when a record is supplied) unless an entry for the destination is
    /// already present.
    pub fn create_route(
        &self,
        api: &dyn RouteApi,
        table_id: &str,
        route: &RouteSpec,
        table_record: Option<&mut RuntimeRecord>,
    ) -> LifecycleResult<()> {
        route.next_hop()?;

        match gateway::execute("create_route", || api.create_route(table_id, route), true) {
            Ok(_) => {
                info!("created route {} in {}", route, table_id);
            }
            Err(LifecycleError::Provider { message })
                if message.contains(&self.already_exists) =>
            {
                debug!(
                    "route {} already exists in {}, treating as created",
                    route, table_id
                );
            }
            Err(err) => return Err(err),
        }

        if let Some(record) = table_record {
            if record.track_route(route) {
                debug!("tracking route {} in table record", route);
            }
        }

        Ok(())
    }

    /// Deletes one route from the table.
    ///
    /// A provider-reported "not found" is success (already deleted). A
    /// completed-but-unsuccessful provider result returns `Ok(false)`:
    /// the route is not yet deletable and the caller should retry. Either
    /// success path removes the tracked entry when a record is supplied.
    pub fn delete_route(
        &self,
        api: &dyn RouteApi,
        table_id: &str,
        route: &RouteSpec,
        table_record: Option<&mut RuntimeRecord>,
    ) -> LifecycleResult<bool> {
        let deleted = match gateway::execute(
            "delete_route",
            || api.delete_route(table_id, route),
            false,
        ) {
            Ok(true) => {
                info!("deleted route {} from {}", route, table_id);
                true
            }
            Ok(false) => {
                debug!("route {} in {} not yet deletable", route, table_id);
                return Ok(false);
            }
            Err(LifecycleError::Provider { message }) if message.contains(&self.not_found) => {
                debug!(
                    "route {} already absent from {}, treating as deleted",
                    route, table_id
                );
                true
            }
            Err(err) => return Err(err),
        };

        if let Some(record) = table_record {
            if record.untrack_route(&route.destination) {
                debug!("untracked route {} from table record", route);
            }
        }

        Ok(deleted)
    }
}
