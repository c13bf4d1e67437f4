use crate::config::{RekognitionSettings, StoreSettings};
use crate::core::FaceComparer;
use crate::models::{BoundingBox, FaceMatch, StoredObjectRef};
use async_trait::async_trait;
use aws_sdk_rekognition::config::retry::RetryConfig;
use aws_sdk_rekognition::config::timeout::TimeoutConfig;
use aws_sdk_rekognition::config::{BehaviorVersion, Credentials, Region};
use aws_sdk_rekognition::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_rekognition::operation::compare_faces::CompareFacesError;
use aws_sdk_rekognition::types::{CompareFacesMatch, Image, S3Object};
use aws_sdk_rekognition::Client;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when calling the face-comparison service
#[derive(Debug, Error)]
pub enum CompareError {
    #[error("Request to comparison service failed: {0}")]
    RequestError(String),

    #[error("Service returned {status} {code}: {message}")]
    ApiError {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<SdkError<CompareFacesError>> for CompareError {
    fn from(err: SdkError<CompareFacesError>) -> Self {
        match err {
            SdkError::ServiceError(service) => {
                let status = service.raw().status().as_u16();
                let err = service.err();
                CompareError::ApiError {
                    status,
                    code: err.code().unwrap_or("Unknown").to_string(),
                    message: err.message().unwrap_or_default().to_string(),
                }
            }
            SdkError::ResponseError(e) => CompareError::InvalidResponse(format!("{:?}", e)),
            other => CompareError::RequestError(DisplayErrorContext(&other).to_string()),
        }
    }
}

/// Reference an uploaded object as a Rekognition image
fn s3_image(stored: &StoredObjectRef) -> Image {
    Image::builder()
        .s3_object(
            S3Object::builder()
                .bucket(&stored.bucket)
                .name(stored.key.as_str())
                .build(),
        )
        .build()
}

impl From<&CompareFacesMatch> for FaceMatch {
    fn from(m: &CompareFacesMatch) -> Self {
        let face = m.face();
        FaceMatch {
            similarity: m.similarity().unwrap_or(0.0),
            confidence: face.and_then(|f| f.confidence()),
            bounding_box: face.and_then(|f| f.bounding_box()).map(|b| BoundingBox {
                width: b.width().unwrap_or_default(),
                height: b.height().unwrap_or_default(),
                left: b.left().unwrap_or_default(),
                top: b.top().unwrap_or_default(),
            }),
        }
    }
}

/// Rekognition client for `CompareFaces`
///
/// References both images by bucket/key, so the service reads back what the
/// store just wrote. Credentials are shared with the object store.
pub struct RekognitionClient {
    client: Client,
    region: String,
}

impl RekognitionClient {
    pub fn new(
        settings: &RekognitionSettings,
        store: &StoreSettings,
        timeout: Duration,
    ) -> Result<Self, CompareError> {
        if let Some(endpoint) = &settings.endpoint {
            Url::parse(endpoint).map_err(|e| CompareError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        }

        let region = settings.region.clone().unwrap_or_else(|| store.region.clone());
        let credentials = Credentials::new(
            &store.access_key_id,
            &store.secret_access_key,
            store.session_token.clone(),
            None,
            "selfie-match-settings",
        );

        let mut config = aws_sdk_rekognition::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(region.clone()))
            .credentials_provider(credentials)
            .retry_config(RetryConfig::disabled())
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build());
        if let Some(endpoint) = &settings.endpoint {
            config = config.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(config.build()),
            region,
        })
    }

    /// Call `CompareFaces` and return the matches above the threshold
    pub async fn compare_faces(
        &self,
        source: &StoredObjectRef,
        target: &StoredObjectRef,
        similarity_threshold: f32,
    ) -> Result<Vec<FaceMatch>, CompareError> {
        tracing::debug!(
            "CompareFaces {}/{} vs {}/{} in {}",
            source.bucket,
            source.key,
            target.bucket,
            target.key,
            self.region
        );

        let output = self
            .client
            .compare_faces()
            .source_image(s3_image(source))
            .target_image(s3_image(target))
            .similarity_threshold(similarity_threshold)
            .send()
            .await
            .map_err(|e| {
                let err = CompareError::from(e);
                tracing::error!("CompareFaces failed: {}", err);
                err
            })?;

        tracing::debug!(
            "CompareFaces returned {} matches, {} unmatched faces",
            output.face_matches().len(),
            output.unmatched_faces().len()
        );

        Ok(output.face_matches().iter().map(FaceMatch::from).collect())
    }
}

#[async_trait]
impl FaceComparer for RekognitionClient {
    async fn compare(
        &self,
        source: &StoredObjectRef,
        target: &StoredObjectRef,
        similarity_threshold: f32,
    ) -> Result<Vec<FaceMatch>, CompareError> {
        self.compare_faces(source, target, similarity_threshold).await
    }
}
