use serde::{Deserialize, Serialize};
use validator::Validate;

/// Result returned by a platform image picker
///
/// Mirrors what a mobile picker hands back: either `canceled`, or a list of
/// picked assets of which only the first is used.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PickerResult {
    #[serde(default, alias = "cancelled")]
    pub canceled: bool,
    #[validate(length(max = 10))]
    #[serde(default)]
    pub assets: Vec<PickedAsset>,
}

impl PickerResult {
    pub fn canceled() -> Self {
        Self {
            canceled: true,
            assets: vec![],
        }
    }

    pub fn with_uri(uri: impl Into<String>) -> Self {
        Self {
            canceled: false,
            assets: vec![PickedAsset::new(uri)],
        }
    }
}

/// A single asset chosen in the picker
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct PickedAsset {
    #[validate(length(max = 2048))]
    #[serde(default)]
    pub uri: Option<String>,
    #[serde(default)]
    pub width: Option<u32>,
    #[serde(default)]
    pub height: Option<u32>,
    #[serde(default, rename = "fileName")]
    pub file_name: Option<String>,
    #[serde(default, rename = "mimeType")]
    pub mime_type: Option<String>,
}

impl PickedAsset {
    pub fn new(uri: impl Into<String>) -> Self {
        Self {
            uri: Some(uri.into()),
            ..Default::default()
        }
    }
}
