use actix_web::{http::StatusCode, web, HttpResponse, Responder};
use validator::Validate;
use crate::core::{FaceCompareWorkflow, UploadError, WorkflowError};
use crate::models::{AcquireResponse, CompareResponse, ErrorResponse, HealthResponse, PickerResult, Slot};
use crate::services::{RekognitionClient, S3Client, SubmittedPicker, UriImageLoader};
use std::sync::Arc;

/// The workflow as wired to the real store and comparison service
pub type ServiceWorkflow = FaceCompareWorkflow<S3Client, RekognitionClient>;

/// Application state shared across all handlers
#[derive(Clone)]
pub struct AppState {
    pub workflow: Arc<ServiceWorkflow>,
    pub loader: Arc<UriImageLoader>,
}

/// Configure all face-comparison routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    // Fixed paths before `{slot}` so "compare" is never parsed as a slot
    cfg
        .route("/health", web::get().to(health_check))
        .route("/faces/compare", web::post().to(compare_faces))
        .route("/faces/state", web::get().to(workflow_state))
        .route("/faces/{slot}", web::post().to(acquire_image))
        .route("/faces/{slot}/upload", web::post().to(upload_image));
}

/// Health check endpoint
async fn health_check() -> impl Responder {
    HttpResponse::Ok().json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        timestamp: chrono::Utc::now(),
    })
}

/// Acquire-and-upload endpoint
///
/// POST /api/v1/faces/{selfie|gallery}
///
/// Request body is the picker result:
/// ```json
/// {
///   "canceled": false,
///   "assets": [{ "uri": "file:///path/to/image.jpg" }]
/// }
/// ```
async fn acquire_image(
    state: web::Data<AppState>,
    slot: web::Path<Slot>,
    req: web::Json<PickerResult>,
) -> impl Responder {
    let slot = slot.into_inner();

    if let Some(response) = validate_picker_result(&req) {
        return response;
    }

    tracing::info!("Acquire request for {} ({} assets)", slot, req.assets.len());

    let media = SubmittedPicker::new(req.into_inner(), state.loader.clone());
    match state.workflow.acquire(slot, &media).await {
        Ok(stored) => HttpResponse::Ok().json(AcquireResponse {
            slot,
            uploaded: true,
            canceled: false,
            stored: Some(stored),
        }),
        Err(e) if e.is_cancellation() => HttpResponse::Ok().json(AcquireResponse {
            slot,
            uploaded: false,
            canceled: true,
            stored: None,
        }),
        Err(e) => workflow_error_response(&e),
    }
}

/// Re-upload the slot's current image
///
/// POST /api/v1/faces/{selfie|gallery}/upload
async fn upload_image(state: web::Data<AppState>, slot: web::Path<Slot>) -> impl Responder {
    let slot = slot.into_inner();
    let media = SubmittedPicker::loader_only(state.loader.clone());

    match state.workflow.upload(slot, &media).await {
        Ok(stored) => HttpResponse::Ok().json(AcquireResponse {
            slot,
            uploaded: true,
            canceled: false,
            stored: Some(stored),
        }),
        Err(e) => workflow_error_response(&e),
    }
}

/// Compare endpoint
///
/// POST /api/v1/faces/compare
async fn compare_faces(state: web::Data<AppState>) -> impl Responder {
    match state.workflow.compare().await {
        Ok(outcome) => {
            let message = outcome
                .result
                .display_text()
                .unwrap_or_default()
                .to_string();
            HttpResponse::Ok().json(CompareResponse {
                matched: outcome.matched(),
                result: outcome.result,
                best_similarity: outcome.best_similarity(),
                message,
                face_matches: outcome.face_matches,
            })
        }
        Err(e) => workflow_error_response(&e),
    }
}

/// Current workflow state; pending notifications are delivered once
///
/// GET /api/v1/faces/state
async fn workflow_state(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.workflow.state_view().await)
}

fn validate_picker_result(req: &PickerResult) -> Option<HttpResponse> {
    let result = req
        .validate()
        .and_then(|_| req.assets.iter().try_for_each(|asset| asset.validate()));

    result.err().map(|errors| {
        tracing::info!("Validation failed for picker result: {:?}", errors);
        HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        })
    })
}

/// HTTP status for each workflow error
pub fn status_for(err: &WorkflowError) -> StatusCode {
    match err {
        WorkflowError::PermissionDenied(_) => StatusCode::FORBIDDEN,
        WorkflowError::Cancelled(_) => StatusCode::OK,
        WorkflowError::EmptyAcquisition(_) => StatusCode::UNPROCESSABLE_ENTITY,
        WorkflowError::AcquisitionFailed { .. } => StatusCode::BAD_REQUEST,
        WorkflowError::MissingInputs { .. } => StatusCode::CONFLICT,
        // The handle itself could not be read; the store was never reached
        WorkflowError::UploadFailed { source: UploadError::Load(_), .. } => StatusCode::BAD_REQUEST,
        WorkflowError::UploadFailed { .. } | WorkflowError::ComparisonFailed(_) => StatusCode::BAD_GATEWAY,
    }
}

fn workflow_error_response(err: &WorkflowError) -> HttpResponse {
    let status = status_for(err);
    HttpResponse::build(status).json(ErrorResponse {
        error: err.code().to_string(),
        message: err.to_string(),
        status_code: status.as_u16(),
    })
}
