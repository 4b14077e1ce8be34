//! JSON wire types shared by the transform client and the transform service.
//!
//! Field names are camelCase on the wire, except `duration_ms`, which keeps
//! its snake_case name for compatibility with existing callers.
//!
//! # Example
//!
//! ```
//! use festive_lens::{TransformRequest, TransformResponse};
//!
//! let request = TransformRequest::new(["snow", "santa"])
//!     .with_image_base64("aGVsbG8=")
//!     .with_prompt("make it snowy");
//! let json = request.to_json().unwrap();
//! assert!(json.contains("\"imageBase64\""));
//!
//! let response = TransformResponse::from_json(
//!     r#"{"url":"https://cdn/x.jpg","path":"u/1-a.jpg","duration_ms":42}"#,
//! )
//! .unwrap();
//! assert_eq!(response.duration_ms, 42);
//! ```

use serde::{Deserialize, Serialize};

// ============================================================================
// Request
// ============================================================================

/// Body of a transform call.
///
/// ```json
/// {
///   "imageBase64": "/9j/4AAQ...",
///   "filters": ["snow", "lights"],
///   "prompt": "optional custom prompt"
/// }
/// ```
///
/// `imageUrl` may replace `imageBase64`; the inline payload wins when both
/// are present. Filter identifiers outside the catalog are accepted and
/// ignored when building the prompt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct TransformRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_base64: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,

    #[serde(default)]
    pub filters: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prompt: Option<String>,
}

impl TransformRequest {
    pub fn new<I, S>(filters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            filters: filters.into_iter().map(Into::into).collect(),
            ..Self::default()
        }
    }

    pub fn with_image_base64(mut self, data: impl Into<String>) -> Self {
        self.image_base64 = Some(data.into());
        self
    }

    pub fn with_image_url(mut self, url: impl Into<String>) -> Self {
        self.image_url = Some(url.into());
        self
    }

    pub fn with_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.prompt = Some(prompt.into());
        self
    }

    /// Inline payload, if present and non-empty.
    pub fn inline_image(&self) -> Option<&str> {
        self.image_base64.as_deref().filter(|s| !s.is_empty())
    }

    /// Remote image reference, if present and non-empty.
    pub fn remote_image(&self) -> Option<&str> {
        self.image_url.as_deref().filter(|s| !s.is_empty())
    }

    /// True when the request carries an image in either form.
    pub fn has_image(&self) -> bool {
        self.inline_image().is_some() || self.remote_image().is_some()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

// ============================================================================
// Response
// ============================================================================

/// Why a successful response carries something other than a freshly
/// stored transformation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "kebab-case")]
pub enum Degradation {
    /// No vendor key: the stored image is the untouched original.
    VendorNotConfigured,
    /// Storage rejected the upload: `url` points at the vendor's copy.
    UploadFailed,
}

/// Successful transform result.
///
/// ```json
/// {
///   "url": "https://.../storage/v1/object/public/christmas-images/u/1700000000000-uuid.jpg",
///   "path": "u/1700000000000-uuid.jpg",
///   "duration_ms": 84210,
///   "taskId": "018a...",
///   "modelUrl": "https://assets.meshy.ai/.../model.glb",
///   "texturedModelUrl": "https://assets.meshy.ai/.../textured.glb"
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
#[serde(rename_all = "camelCase")]
pub struct TransformResponse {
    /// Public address of the result image.
    pub url: String,

    /// Storage path, absent when the result was not persisted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,

    #[serde(rename = "duration_ms")]
    pub duration_ms: u64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub task_id: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub textured_model_url: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub degraded: Option<Degradation>,
}

impl TransformResponse {
    pub fn is_degraded(&self) -> bool {
        self.degraded.is_some()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }
}

/// Body of every non-2xx service reply.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "jsonschema", derive(schemars::JsonSchema))]
pub struct ErrorBody {
    /// Short summary, e.g. `"Transformation failed"`.
    pub error: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ErrorBody {
    pub fn new(error: impl Into<String>) -> Self {
        Self {
            error: error.into(),
            detail: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// The most specific message available: the detail, else the summary.
    pub fn message(&self) -> &str {
        self.detail.as_deref().unwrap_or(&self.error)
    }
}

// ============================================================================
// Tests
// ============================================================================
