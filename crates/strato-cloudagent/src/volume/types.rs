//! Volume property, attribute and provider-field names.

/// Declared property: volume size in gigabytes (required).
pub const SIZE_GB: &str = "size_gb";

/// Declared property: availability zone (required).
pub const AVAILABILITY_ZONE: &str = "availability_zone";

/// Declared property: device name used when attaching (required for the
/// attachment relationship).
pub const DEVICE_NAME: &str = "device_name";

/// Runtime attribute: the instance this volume is attached to.
pub const ATTACHED_INSTANCE_ATTR: &str = "attached_instance_id";

/// Runtime attribute: the device name of the live attachment.
pub const DEVICE_ATTR: &str = "device";

/// Provider record field holding the volume identifier.
pub const VOLUME_ID_FIELD: &str = "VolumeId";

/// Provider record field holding the volume state.
pub const STATE_FIELD: &str = "State";

/// Provider filter key locating a volume by identifier.
pub const VOLUME_ID_FILTER: &str = "volume-id";

/// Provider error fragment meaning the volume does not exist.
pub const NOT_FOUND: &str = "InvalidVolume.NotFound";

/// Provider volume state: being provisioned.
pub const STATE_CREATING: &str = "creating";

/// Provider volume state: ready, unattached.
pub const STATE_AVAILABLE: &str = "available";

/// Provider volume state: attached to an instance.
pub const STATE_IN_USE: &str = "in-use";
