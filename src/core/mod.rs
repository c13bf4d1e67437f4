// Workflow exports
pub mod errors;
pub mod ports;
pub mod workflow;

pub use errors::{UploadError, WorkflowError};
pub use ports::{FaceComparer, MediaSource, ObjectStore};
pub use workflow::FaceCompareWorkflow;
