//! Selfie Match - selfie-to-photo face comparison service
//!
//! Uploads a selfie and a gallery photo to S3 under fixed keys and asks
//! Rekognition whether both show the same person. The crate only sequences
//! those calls; capture, storage and face comparison are external services.

pub mod config;
pub mod core;
pub mod models;
pub mod routes;
pub mod services;

// Re-export commonly used types
pub use core::{FaceCompareWorkflow, WorkflowError};
pub use models::{ComparisonResult, PickerResult, Slot, StoredObjectRef};
