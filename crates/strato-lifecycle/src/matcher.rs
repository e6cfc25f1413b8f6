//! Resource matcher.
//!
//! Locates provider-side records for a resource type via a list-style
//! query, distinguishing "not found" (normal zero matches) from real
//! provider errors by a per-resource sentinel string.

use crate::gateway::ProviderError;
use crate::task::{LifecycleError, LifecycleResult};
use strato_types::{record_str, Filters, Record};

/// Describes how one resource type is located at the provider.
///
/// Constructed once per handler and read-only thereafter.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    /// Filter key carrying the resource identifier (e.g. `vpc-id`).
    pub filter_key: String,
    /// Record field carrying the resource identifier (e.g. `VpcId`).
    pub id_field: String,
    /// Sentinel fragment in provider error messages meaning "not found".
    pub not_found: String,
}

impl ResourceQuery {
    /// Creates a query descriptor.
    pub fn new(
        filter_key: impl Into<String>,
        id_field: impl Into<String>,
        not_found: impl Into<String>,
    ) -> Self {
        Self {
            filter_key: filter_key.into(),
            id_field: id_field.into(),
            not_found: not_found.into(),
        }
    }

    /// Builds the filter set locating one resource by identifier.
    pub fn filters_for(&self, resource_id: &str) -> Filters {
        Filters::new().with(self.filter_key.clone(), resource_id)
    }
}

/// Runs a list-style provider query, returning matching records.
///
/// A provider error whose message contains `not_found` is normal "zero
/// matches" and yields an empty list; any other error is fatal and
/// propagated with the provider's message intact.
pub fn find_matching<F>(
    list: F,
    filters: &Filters,
    not_found: &str,
) -> LifecycleResult<Vec<Record>>
where
    F: FnOnce(&Filters) -> Result<Vec<Record>, ProviderError>,
{
    match list(filters) {
        Ok(records) => Ok(records),
        Err(err) if err.message().contains(not_found) => {
            log::debug!("no records match {}: {}", filters, err.message());
            Ok(Vec::new())
        }
        Err(err) => Err(LifecycleError::provider(err.message())),
    }
}

/// Narrows [`find_matching`] to at most one record.
///
/// Provider describe calls may prefix- or fuzzy-match server-side, so the
/// returned list is filtered for the record whose identifier exactly
/// equals the filter value used; `None` if no exact match exists.
pub fn find_single<F>(
    query: &ResourceQuery,
    list: F,
    filters: &Filters,
) -> LifecycleResult<Option<Record>>
where
    F: FnOnce(&Filters) -> Result<Vec<Record>, ProviderError>,
{
    let records = find_matching(list, filters, &query.not_found)?;

    let wanted = match filters.get(&query.filter_key) {
        Some(id) => id,
        None => return Ok(None),
    };

    Ok(records
        .into_iter()
        .find(|record| record_str(record, &query.id_field) == Some(wanted)))
}
