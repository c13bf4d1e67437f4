use async_trait::async_trait;
use crate::models::{FaceMatch, LocalImageHandle, PermissionStatus, PickerOptions, PickerResult, StoredObjectKey, StoredObjectRef};
use crate::services::{CompareError, MediaError, StoreError};

/// Blob storage the images are uploaded to
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Store `bytes` under `key`, replacing any existing object
    async fn put(
        &self,
        key: &StoredObjectKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObjectRef, StoreError>;
}

/// Managed face-comparison service
#[async_trait]
pub trait FaceComparer: Send + Sync {
    /// Compare the face in `source` against faces in `target`.
    ///
    /// Returns the matches the service reports at or above
    /// `similarity_threshold`; the boundary policy is the service's own.
    async fn compare(
        &self,
        source: &StoredObjectRef,
        target: &StoredObjectRef,
        similarity_threshold: f32,
    ) -> Result<Vec<FaceMatch>, CompareError>;
}

/// Camera and photo library, plus access to the picked bytes
#[async_trait]
pub trait MediaSource: Send + Sync {
    async fn request_permission(&self) -> PermissionStatus;

    async fn capture_from_camera(&self, options: &PickerOptions) -> Result<PickerResult, MediaError>;

    async fn pick_from_library(&self, options: &PickerOptions) -> Result<PickerResult, MediaError>;

    /// Read the image bytes behind a local handle
    async fn load(&self, handle: &LocalImageHandle) -> Result<Vec<u8>, MediaError>;
}
