use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    pub store: StoreSettings,
    #[serde(default)]
    pub rekognition: RekognitionSettings,
    #[serde(default)]
    pub media: MediaSettings,
    #[serde(default)]
    pub http: HttpSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Object store location and credentials
#[derive(Clone, Deserialize)]
pub struct StoreSettings {
    #[serde(default = "default_region")]
    pub region: String,
    pub bucket: String,
    pub access_key_id: String,
    pub secret_access_key: String,
    #[serde(default)]
    pub session_token: Option<String>,
    /// Custom endpoint for S3-compatible stores
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Defaults to path-style whenever `endpoint` is set
    #[serde(default)]
    pub force_path_style: Option<bool>,
}

impl StoreSettings {
    pub fn path_style(&self) -> bool {
        self.force_path_style.unwrap_or(self.endpoint.is_some())
    }
}

impl fmt::Debug for StoreSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StoreSettings")
            .field("region", &self.region)
            .field("bucket", &self.bucket)
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field("session_token", &self.session_token.as_ref().map(|_| "<redacted>"))
            .field("endpoint", &self.endpoint)
            .field("force_path_style", &self.force_path_style)
            .finish()
    }
}

fn default_region() -> String { "us-east-1".to_string() }

#[derive(Debug, Clone, Deserialize)]
pub struct RekognitionSettings {
    #[serde(default)]
    pub endpoint: Option<String>,
    /// Falls back to the store region
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default = "default_similarity_threshold")]
    pub similarity_threshold: f32,
}

impl Default for RekognitionSettings {
    fn default() -> Self {
        Self {
            endpoint: None,
            region: None,
            similarity_threshold: default_similarity_threshold(),
        }
    }
}

fn default_similarity_threshold() -> f32 { 90.0 }

#[derive(Debug, Clone, Deserialize)]
pub struct MediaSettings {
    /// Directory local handles must resolve into
    #[serde(default)]
    pub root: Option<PathBuf>,
    #[serde(default = "default_max_bytes")]
    pub max_bytes: u64,
    /// Whether `http(s)://` handles may be fetched at all
    #[serde(default)]
    pub allow_remote: bool,
}

impl Default for MediaSettings {
    fn default() -> Self {
        Self {
            root: None,
            max_bytes: default_max_bytes(),
            allow_remote: false,
        }
    }
}

// Rekognition rejects S3-referenced images above 15MB
fn default_max_bytes() -> u64 { 15 * 1024 * 1024 }

#[derive(Debug, Clone, Deserialize)]
pub struct HttpSettings {
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for HttpSettings {
    fn default() -> Self {
        Self { timeout_secs: default_timeout_secs() }
    }
}

fn default_timeout_secs() -> u64 { 30 }

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "compact".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration files (config/default.toml, config/local.toml)
    /// 3. Environment variables (prefixed with SELFIE_MATCH__)
    /// 4. The conventional AWS_* variables
    pub fn load() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SELFIE_MATCH__STORE__BUCKET -> store.bucket
            .add_source(env_source())
            .build()?;

        let settings = apply_aws_env(settings, |name| std::env::var(name).ok())?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(env_source())
            .build()?;

        let settings = apply_aws_env(settings, |name| std::env::var(name).ok())?;

        settings.try_deserialize()
    }
}

fn env_source() -> Environment {
    Environment::with_prefix("SELFIE_MATCH")
        .prefix_separator("__")
        .separator("__")
        .try_parsing(true)
}

/// Overlay the standard AWS environment variables onto the store section
fn apply_aws_env<F>(settings: Config, lookup: F) -> Result<Config, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    const OVERRIDES: [(&str, &str); 5] = [
        ("AWS_REGION", "store.region"),
        ("AWS_ACCESS_KEY_ID", "store.access_key_id"),
        ("AWS_SECRET_ACCESS_KEY", "store.secret_access_key"),
        ("AWS_SESSION_TOKEN", "store.session_token"),
        ("AWS_BUCKET_NAME", "store.bucket"),
    ];

    let mut builder = Config::builder().add_source(settings);

    for (var, key) in OVERRIDES {
        if let Some(value) = lookup(var).filter(|v| !v.is_empty()) {
            builder = builder.set_override(key, value)?;
        }
    }

    builder.build()
}
