use serde::{Deserialize, Serialize};
use crate::models::domain::{ComparisonResult, FaceMatch, LocalImageHandle, Notification, Slot, StoredObjectRef, WorkflowPhase};

/// Response for the acquire-and-upload endpoints
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AcquireResponse {
    pub slot: Slot,
    pub uploaded: bool,
    pub canceled: bool,
    pub stored: Option<StoredObjectRef>,
}

/// Response for the compare endpoint
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompareResponse {
    pub matched: bool,
    pub result: ComparisonResult,
    pub message: String,
    pub best_similarity: Option<f32>,
    pub face_matches: Vec<FaceMatch>,
}

/// Per-slot view of the workflow state
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SlotView {
    pub slot: Slot,
    pub handle: Option<LocalImageHandle>,
    pub uploaded: bool,
    pub uploading: bool,
}

/// Snapshot of the workflow state as a UI would render it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowStateResponse {
    pub phase: WorkflowPhase,
    pub selfie: SlotView,
    pub gallery: SlotView,
    pub status: Option<String>,
    pub result: ComparisonResult,
    pub result_text: Option<String>,
    pub notifications: Vec<Notification>,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

/// Error response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,
    pub message: String,
    pub status_code: u16,
}
