//! Provider record helpers.
//!
//! Provider describe/list calls return loosely-typed records; the engine
//! only ever inspects a handful of fields (identifier, state, addresses)
//! and persists the rest opaquely into the runtime record.

use serde_json::Value;

/// A single provider-side resource record.
///
/// Records are JSON objects as returned by the provider SDK; the field
/// names are provider-defined (e.g. `VpcId`, `State`).
pub type Record = Value;

/// A flat string-keyed attribute map, used for both provider requests and
/// persisted runtime state.
pub type Attributes = serde_json::Map<String, Value>;

/// Returns a field of a record, if present.
pub fn record_field<'a>(record: &'a Record, field: &str) -> Option<&'a Value> {
    record.as_object().and_then(|obj| obj.get(field))
}

/// Returns a string field of a record, if present and a string.
pub fn record_str<'a>(record: &'a Record, field: &str) -> Option<&'a str> {
    record_field(record, field).and_then(Value::as_str)
}
