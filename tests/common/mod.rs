// Shared fixtures for integration tests
#![allow(dead_code)]

use selfie_match::config::{MediaSettings, RekognitionSettings, StoreSettings};
use selfie_match::routes::{AppState, ServiceWorkflow};
use selfie_match::services::{RekognitionClient, S3Client, UriImageLoader};
use selfie_match::FaceCompareWorkflow;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

pub const BUCKET: &str = "faces";
pub const AUTH_PREFIX: &str = r"^AWS4-HMAC-SHA256 Credential=AKIDTEST/\d{8}/us-east-1/";

pub fn store_settings(s3_url: &str) -> StoreSettings {
    StoreSettings {
        region: "us-east-1".to_string(),
        bucket: BUCKET.to_string(),
        access_key_id: "AKIDTEST".to_string(),
        secret_access_key: "test-secret".to_string(),
        session_token: None,
        endpoint: Some(s3_url.to_string()),
        force_path_style: None,
    }
}

pub fn rekognition_settings(rekognition_url: &str) -> RekognitionSettings {
    RekognitionSettings {
        endpoint: Some(rekognition_url.to_string()),
        region: None,
        similarity_threshold: 90.0,
    }
}

pub fn workflow(s3_url: &str, rekognition_url: &str) -> ServiceWorkflow {
    let timeout = Duration::from_secs(5);
    let store_settings = store_settings(s3_url);
    let store = S3Client::new(&store_settings, timeout).unwrap();
    let comparer = RekognitionClient::new(&rekognition_settings(rekognition_url), &store_settings, timeout).unwrap();
    FaceCompareWorkflow::new(store, comparer, 90.0)
}

pub fn loader(root: &Path) -> Arc<UriImageLoader> {
    let settings = MediaSettings {
        root: Some(root.to_path_buf()),
        max_bytes: 1024 * 1024,
        allow_remote: false,
    };
    Arc::new(UriImageLoader::new(&settings, Duration::from_secs(5)).unwrap())
}

pub fn app_state(s3_url: &str, rekognition_url: &str, root: &Path) -> AppState {
    AppState {
        workflow: Arc::new(workflow(s3_url, rekognition_url)),
        loader: loader(root),
    }
}

/// Write an image into the media directory and return its file URI
pub fn image(dir: &TempDir, name: &str, bytes: &[u8]) -> String {
    let path: PathBuf = dir.path().join(name);
    std::fs::write(&path, bytes).unwrap();
    format!("file://{}", path.display())
}

pub fn compare_response(similarities: &[f32]) -> String {
    let matches: Vec<serde_json::Value> = similarities
        .iter()
        .map(|s| {
            serde_json::json!({
                "Similarity": s,
                "Face": {
                    "BoundingBox": {"Width": 0.4, "Height": 0.5, "Left": 0.3, "Top": 0.2},
                    "Confidence": 99.9
                }
            })
        })
        .collect();

    serde_json::json!({
        "SourceImageFace": {"Confidence": 99.9},
        "FaceMatches": matches,
        "UnmatchedFaces": []
    })
    .to_string()
}
