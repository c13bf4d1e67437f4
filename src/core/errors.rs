use crate::models::{Notification, Slot, StoredObjectKey};
use crate::services::{CompareError, MediaError, StoreError};
use thiserror::Error;

/// Why an upload step failed
#[derive(Debug, Error)]
pub enum UploadError {
    #[error("could not read image: {0}")]
    Load(#[source] MediaError),

    #[error("{0}")]
    Store(#[source] StoreError),
}

/// Errors surfaced by the upload-and-compare workflow
///
/// None of these are fatal; each one is logged, turned into a one-shot
/// notification and returned so the caller may retry the step.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("Media access permission denied: {0}")]
    PermissionDenied(String),

    #[error("The {0} acquisition was canceled")]
    Cancelled(Slot),

    #[error("No image was returned for the {0}")]
    EmptyAcquisition(Slot),

    #[error("Failed to acquire the {slot} image: {source}")]
    AcquisitionFailed {
        slot: Slot,
        #[source]
        source: MediaError,
    },

    #[error("Failed to upload {key}: {source}")]
    UploadFailed {
        key: StoredObjectKey,
        #[source]
        source: UploadError,
    },

    #[error("Failed to compare faces: {0}")]
    ComparisonFailed(#[source] CompareError),

    #[error("Please take a selfie and pick an image from the gallery")]
    MissingInputs { missing: Vec<Slot> },
}

impl WorkflowError {
    /// Stable machine-readable error code
    pub fn code(&self) -> &'static str {
        match self {
            WorkflowError::PermissionDenied(_) => "permission_denied",
            WorkflowError::Cancelled(_) => "acquisition_cancelled",
            WorkflowError::EmptyAcquisition(_) => "acquisition_empty",
            WorkflowError::AcquisitionFailed { .. } => "acquisition_failed",
            WorkflowError::UploadFailed { .. } => "upload_failed",
            WorkflowError::ComparisonFailed(_) => "comparison_failed",
            WorkflowError::MissingInputs { .. } => "missing_inputs",
        }
    }

    /// The message shown to the user for this error
    pub fn notification(&self) -> Notification {
        match self {
            WorkflowError::PermissionDenied(_) => Notification::new(
                "Permission required",
                "We need permission to access your media library to pick an image.",
            ),
            WorkflowError::Cancelled(Slot::Selfie) => {
                Notification::new("Selfie Canceled", "You canceled the selfie capture.")
            }
            WorkflowError::Cancelled(Slot::Gallery) => {
                Notification::new("Image Canceled", "You canceled picking an image.")
            }
            WorkflowError::EmptyAcquisition(_) => Notification::new("Error", "No image asset found."),
            WorkflowError::AcquisitionFailed { slot: Slot::Selfie, source } => {
                Notification::new("Error", format!("Failed to take a selfie: {}", source))
            }
            WorkflowError::AcquisitionFailed { slot: Slot::Gallery, source } => {
                Notification::new("Error", format!("Failed to pick an image: {}", source))
            }
            WorkflowError::UploadFailed { key, source } => {
                Notification::new("Upload Error", format!("Failed to upload {}: {}", key, source))
            }
            WorkflowError::ComparisonFailed(e) => {
                Notification::new("Comparison Error", format!("Failed to compare faces: {}", e))
            }
            WorkflowError::MissingInputs { .. } => Notification::new(
                "Missing Images",
                "Please take a selfie and pick an image from the gallery.",
            ),
        }
    }

    /// Cancellation is an expected outcome rather than a failure
    pub fn is_cancellation(&self) -> bool {
        matches!(self, WorkflowError::Cancelled(_))
    }
}
