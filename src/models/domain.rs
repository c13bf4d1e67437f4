use serde::{Deserialize, Serialize};
use std::fmt;

/// Fixed object key for the selfie image
pub const SELFIE_KEY: &str = "selfie.jpg";

/// Fixed object key for the gallery image
pub const GALLERY_KEY: &str = "gallery.jpg";

/// Content type used for every upload
pub const IMAGE_CONTENT_TYPE: &str = "image/jpeg";

/// One of the two image positions in the workflow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Slot {
    Selfie,
    Gallery,
}

impl Slot {
    pub const ALL: [Slot; 2] = [Slot::Selfie, Slot::Gallery];

    /// Fixed key this slot is stored under. Every session shares it.
    pub fn key(&self) -> StoredObjectKey {
        match self {
            Slot::Selfie => StoredObjectKey(SELFIE_KEY.to_string()),
            Slot::Gallery => StoredObjectKey(GALLERY_KEY.to_string()),
        }
    }

    /// Where the picker for this slot gets its image from
    pub fn source(&self) -> ImageSource {
        match self {
            Slot::Selfie => ImageSource::Camera,
            Slot::Gallery => ImageSource::Library,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Slot::Selfie => "selfie",
            Slot::Gallery => "gallery",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Device source a picker is launched against
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageSource {
    Camera,
    Library,
}

/// Opaque reference to a locally captured or picked image
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalImageHandle(String);

impl LocalImageHandle {
    pub fn new(uri: impl Into<String>) -> Self {
        Self(uri.into())
    }

    pub fn uri(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LocalImageHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Key an object is stored under in the bucket
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StoredObjectKey(String);

impl StoredObjectKey {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StoredObjectKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Location of an object that was successfully written
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredObjectRef {
    pub bucket: String,
    pub key: StoredObjectKey,
    #[serde(default)]
    pub etag: Option<String>,
}

/// Outcome of the last comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ComparisonResult {
    #[default]
    Unknown,
    Match,
    NoMatch,
}

impl ComparisonResult {
    pub fn from_matched(matched: bool) -> Self {
        if matched {
            ComparisonResult::Match
        } else {
            ComparisonResult::NoMatch
        }
    }

    /// Text shown to the user, if there is anything to show
    pub fn display_text(&self) -> Option<&'static str> {
        match self {
            ComparisonResult::Unknown => None,
            ComparisonResult::Match => Some("Faces match!"),
            ComparisonResult::NoMatch => Some("Faces do not match."),
        }
    }
}

/// Face bounding box as ratios of the image dimensions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BoundingBox {
    pub width: f32,
    pub height: f32,
    pub left: f32,
    pub top: f32,
}

/// One face the comparison service reported as matching
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FaceMatch {
    pub similarity: f32,
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub bounding_box: Option<BoundingBox>,
}

/// Reduced result of one comparison call
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComparisonOutcome {
    pub result: ComparisonResult,
    pub face_matches: Vec<FaceMatch>,
    pub similarity_threshold: f32,
    pub compared_at: chrono::DateTime<chrono::Utc>,
}

impl ComparisonOutcome {
    pub fn matched(&self) -> bool {
        self.result == ComparisonResult::Match
    }

    pub fn best_similarity(&self) -> Option<f32> {
        self.face_matches
            .iter()
            .map(|m| m.similarity)
            .fold(None, |best, s| Some(best.map_or(s, |b: f32| b.max(s))))
    }
}

/// Human-readable transient status of an in-flight step
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StatusMessage(String);

impl StatusMessage {
    pub fn uploading(key: &StoredObjectKey) -> Self {
        Self(format!("Uploading {}...", key))
    }

    pub fn comparing() -> Self {
        Self("Comparing faces...".to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One-shot message surfaced to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Notification {
    pub title: String,
    pub message: String,
}

impl Notification {
    pub fn new(title: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            message: message.into(),
        }
    }
}

/// Where the workflow currently is
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "phase", content = "slot", rename_all = "snake_case")]
pub enum WorkflowPhase {
    Idle,
    Acquiring(Slot),
    Uploading(Slot),
    Comparing,
    Matched,
    NotMatched,
}

/// Options handed to the platform picker
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PickerOptions {
    pub images_only: bool,
    pub allows_editing: bool,
    pub aspect: (u8, u8),
    pub quality: f32,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            images_only: true,
            allows_editing: true,
            aspect: (4, 3),
            quality: 1.0,
        }
    }
}

/// Media access permission state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PermissionStatus {
    Granted,
    Denied,
}
