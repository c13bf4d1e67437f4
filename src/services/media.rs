use crate::config::MediaSettings;
use crate::core::MediaSource;
use crate::models::{ImageSource, LocalImageHandle, PermissionStatus, PickerOptions, PickerResult};
use async_trait::async_trait;
use reqwest::Client;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while acquiring or reading images
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Fetching image returned status {0}")]
    HttpStatus(u16),

    #[error("Unsupported URI scheme: {0}")]
    UnsupportedScheme(String),

    #[error("Invalid URI: {0}")]
    InvalidUri(String),

    #[error("Image is {size} bytes, limit is {limit}")]
    TooLarge { size: u64, limit: u64 },

    #[error("Image is empty: {0}")]
    EmptyImage(String),

    #[error("No picker result was submitted")]
    NoPickerResult,
}

/// Reads image bytes behind local handles
///
/// Handles may be `file://` URIs, plain filesystem paths, or `http(s)://`
/// URIs. When a media root is configured, filesystem handles must resolve
/// inside it. Remote handles are refused unless `allow_remote` is set.
pub struct UriImageLoader {
    root: Option<PathBuf>,
    max_bytes: u64,
    allow_remote: bool,
    client: Client,
}

impl UriImageLoader {
    pub fn new(settings: &MediaSettings, timeout: Duration) -> Result<Self, MediaError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            root: settings.root.clone(),
            max_bytes: settings.max_bytes,
            allow_remote: settings.allow_remote,
            client,
        })
    }

    /// Granted unless a configured media root is missing or not a directory
    pub async fn permission(&self) -> PermissionStatus {
        let Some(root) = &self.root else {
            return PermissionStatus::Granted;
        };

        match tokio::fs::metadata(root).await {
            Ok(meta) if meta.is_dir() => PermissionStatus::Granted,
            Ok(_) => {
                tracing::warn!("Media root {:?} is not a directory", root);
                PermissionStatus::Denied
            }
            Err(e) => {
                tracing::warn!("Media root {:?} is not accessible: {}", root, e);
                PermissionStatus::Denied
            }
        }
    }

    /// Fetch the bytes behind a handle
    pub async fn load(&self, handle: &LocalImageHandle) -> Result<Vec<u8>, MediaError> {
        let uri = handle.uri().trim();
        if uri.is_empty() {
            return Err(MediaError::EmptyImage(uri.to_string()));
        }

        if let Some(rest) = uri.strip_prefix("file://") {
            let decoded = urlencoding::decode(rest).map_err(|e| MediaError::InvalidUri(format!("{}: {}", uri, e)))?;
            return self.load_path(Path::new(decoded.as_ref())).await;
        }

        if uri.starts_with("http://") || uri.starts_with("https://") {
            if !self.allow_remote {
                return Err(MediaError::PermissionDenied(format!("remote handles are disabled: {}", uri)));
            }
            return self.load_remote(uri).await;
        }

        if let Some((scheme, _)) = uri.split_once("://") {
            return Err(MediaError::UnsupportedScheme(scheme.to_string()));
        }

        self.load_path(Path::new(uri)).await
    }

    async fn load_path(&self, path: &Path) -> Result<Vec<u8>, MediaError> {
        let resolved = tokio::fs::canonicalize(path).await?;

        if let Some(root) = &self.root {
            let root = tokio::fs::canonicalize(root)
                .await
                .map_err(|e| MediaError::PermissionDenied(format!("media root {:?}: {}", root, e)))?;
            if !resolved.starts_with(&root) {
                return Err(MediaError::PermissionDenied(format!(
                    "{:?} is outside the media root",
                    path
                )));
            }
        }

        let size = tokio::fs::metadata(&resolved).await?.len();
        self.check_size(size)?;

        let bytes = tokio::fs::read(&resolved).await?;
        self.check_bytes(bytes, &resolved.display().to_string())
    }

    async fn load_remote(&self, uri: &str) -> Result<Vec<u8>, MediaError> {
        let mut response = self.client.get(uri).send().await?;

        if !response.status().is_success() {
            return Err(MediaError::HttpStatus(response.status().as_u16()));
        }
        if let Some(size) = response.content_length() {
            self.check_size(size)?;
        }

        // Chunked responses carry no length; enforce the limit while reading
        let mut bytes = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            self.check_size((bytes.len() + chunk.len()) as u64)?;
            bytes.extend_from_slice(&chunk);
        }

        self.check_bytes(bytes, uri)
    }

    fn check_size(&self, size: u64) -> Result<(), MediaError> {
        if size > self.max_bytes {
            return Err(MediaError::TooLarge { size, limit: self.max_bytes });
        }
        Ok(())
    }

    fn check_bytes(&self, bytes: Vec<u8>, origin: &str) -> Result<Vec<u8>, MediaError> {
        if bytes.is_empty() {
            return Err(MediaError::EmptyImage(origin.to_string()));
        }
        self.check_size(bytes.len() as u64)?;
        Ok(bytes)
    }
}

/// Media source for a single request
///
/// The picker ran on the client; this hands its submitted result back to
/// the workflow and reads the picked handle through the shared loader.
pub struct SubmittedPicker {
    result: Option<PickerResult>,
    loader: Arc<UriImageLoader>,
}

impl SubmittedPicker {
    pub fn new(result: PickerResult, loader: Arc<UriImageLoader>) -> Self {
        Self {
            result: Some(result),
            loader,
        }
    }

    /// A source that can only load handles, for re-uploading
    pub fn loader_only(loader: Arc<UriImageLoader>) -> Self {
        Self { result: None, loader }
    }

    fn submitted(&self, source: ImageSource, options: &PickerOptions) -> Result<PickerResult, MediaError> {
        tracing::debug!("Using submitted {:?} picker result (options: {:?})", source, options);
        self.result.clone().ok_or(MediaError::NoPickerResult)
    }
}

#[async_trait]
impl MediaSource for SubmittedPicker {
    async fn request_permission(&self) -> PermissionStatus {
        self.loader.permission().await
    }

    async fn capture_from_camera(&self, options: &PickerOptions) -> Result<PickerResult, MediaError> {
        self.submitted(ImageSource::Camera, options)
    }

    async fn pick_from_library(&self, options: &PickerOptions) -> Result<PickerResult, MediaError> {
        self.submitted(ImageSource::Library, options)
    }

    async fn load(&self, handle: &LocalImageHandle) -> Result<Vec<u8>, MediaError> {
        self.loader.load(handle).await
    }
}
