use crate::config::StoreSettings;
use crate::core::ObjectStore;
use crate::models::{StoredObjectKey, StoredObjectRef};
use async_trait::async_trait;
use aws_sdk_s3::config::retry::RetryConfig;
use aws_sdk_s3::config::timeout::TimeoutConfig;
use aws_sdk_s3::config::{BehaviorVersion, Credentials, Region, RequestChecksumCalculation};
use aws_sdk_s3::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_s3::operation::put_object::PutObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::Client;
use reqwest::Url;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when interacting with the object store
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Request to object store failed: {0}")]
    RequestError(String),

    #[error("Store returned {status} {code}: {message}")]
    ApiError {
        status: u16,
        code: String,
        message: String,
    },

    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),
}

impl From<SdkError<PutObjectError>> for StoreError {
    fn from(err: SdkError<PutObjectError>) -> Self {
        match err {
            SdkError::ServiceError(service) => {
                let status = service.raw().status().as_u16();
                let err = service.err();
                StoreError::ApiError {
                    status,
                    code: err.code().unwrap_or("Unknown").to_string(),
                    message: err.message().unwrap_or_default().to_string(),
                }
            }
            other => StoreError::RequestError(DisplayErrorContext(&other).to_string()),
        }
    }
}

/// S3 client
///
/// Only `PutObject` is needed: images are written under fixed keys and the
/// comparison service reads them back itself. Retries are disabled so a
/// failed upload surfaces to the caller straight away.
pub struct S3Client {
    client: Client,
    bucket: String,
}

impl S3Client {
    /// Create a new S3 client from store settings
    pub fn new(settings: &StoreSettings, timeout: Duration) -> Result<Self, StoreError> {
        if let Some(endpoint) = &settings.endpoint {
            Url::parse(endpoint).map_err(|e| StoreError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        }

        let credentials = Credentials::new(
            &settings.access_key_id,
            &settings.secret_access_key,
            settings.session_token.clone(),
            None,
            "selfie-match-settings",
        );

        let mut config = aws_sdk_s3::config::Builder::new()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new(settings.region.clone()))
            .credentials_provider(credentials)
            .force_path_style(settings.path_style())
            .retry_config(RetryConfig::disabled())
            .timeout_config(TimeoutConfig::builder().operation_timeout(timeout).build())
            // Plain PutObject bodies, no aws-chunked checksum trailers
            .request_checksum_calculation(RequestChecksumCalculation::WhenRequired);
        if let Some(endpoint) = &settings.endpoint {
            config = config.endpoint_url(endpoint);
        }

        Ok(Self {
            client: Client::from_conf(config.build()),
            bucket: settings.bucket.clone(),
        })
    }

    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// Upload an object, replacing whatever is stored at `key`
    pub async fn put_object(
        &self,
        key: &StoredObjectKey,
        body: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObjectRef, StoreError> {
        tracing::debug!("PUT s3://{}/{} ({} bytes)", self.bucket, key, body.len());

        let output = self
            .client
            .put_object()
            .bucket(&self.bucket)
            .key(key.as_str())
            .content_type(content_type)
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| {
                let err = StoreError::from(e);
                tracing::error!("Failed to upload {}: {}", key, err);
                err
            })?;

        Ok(StoredObjectRef {
            bucket: self.bucket.clone(),
            key: key.clone(),
            etag: output.e_tag().map(|v| v.trim_matches('"').to_string()),
        })
    }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn put(
        &self,
        key: &StoredObjectKey,
        bytes: Vec<u8>,
        content_type: &str,
    ) -> Result<StoredObjectRef, StoreError> {
        self.put_object(key, bytes, content_type).await
    }
}
