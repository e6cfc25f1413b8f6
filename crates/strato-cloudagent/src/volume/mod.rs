//! Storage volume resource module.
//!
//! Volumes settle asynchronously on both sides of their lifecycle: the
//! node handler polls creating→available, and the attachment relationship
//! polls attaching→attached / detaching→available.

mod handler;
mod types;

pub use handler::{VolumeApi, VolumeAttachmentHandler, VolumeHandler};
pub use types::{
    ATTACHED_INSTANCE_ATTR, AVAILABILITY_ZONE, DEVICE_ATTR, DEVICE_NAME, NOT_FOUND, SIZE_GB,
    VOLUME_ID_FIELD, VOLUME_ID_FILTER,
};
