// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    BoundingBox, ComparisonOutcome, ComparisonResult, FaceMatch, ImageSource, LocalImageHandle,
    Notification, PermissionStatus, PickerOptions, Slot, StatusMessage, StoredObjectKey,
    StoredObjectRef, WorkflowPhase, GALLERY_KEY, IMAGE_CONTENT_TYPE, SELFIE_KEY,
};
pub use requests::{PickedAsset, PickerResult};
pub use responses::{AcquireResponse, CompareResponse, ErrorResponse, HealthResponse, SlotView, WorkflowStateResponse};
