//! Collaborators of the capture flow: the native camera/library picker,
//! user-facing alerts and the share sheet.
//!
//! The editor only talks to these traits. [`FilePicker`] and
//! [`TracingAlerts`] are small implementations for hosts without a native
//! UI, such as the command-line tool.

use crate::photo::SizePx;
use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use std::path::PathBuf;

// ============================================================================
// Picker types
// ============================================================================

/// Outcome of a permission prompt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PermissionStatus {
    Granted,
    Denied,
    Undetermined,
}

/// Which picker to open.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureSource {
    Camera,
    Library,
}

/// Options passed to the native picker.
#[derive(Debug, Clone, PartialEq)]
pub struct PickerOptions {
    pub allows_editing: bool,
    /// Crop aspect offered while editing, width:height.
    pub aspect: (u32, u32),
    /// Compression quality in `[0, 1]`.
    pub quality: f32,
    pub include_base64: bool,
    pub allows_multiple: bool,
}

impl Default for PickerOptions {
    fn default() -> Self {
        Self {
            allows_editing: true,
            aspect: (4, 3),
            quality: 1.0,
            include_base64: true,
            allows_multiple: false,
        }
    }
}

/// One picked image as reported by the picker.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickedAsset {
    pub uri: Option<String>,
    pub base64: Option<String>,
    pub width: u32,
    pub height: u32,
}

/// What the picker returned.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PickerOutcome {
    pub canceled: bool,
    pub assets: Vec<PickedAsset>,
}

impl PickerOutcome {
    pub fn canceled() -> Self {
        Self {
            canceled: true,
            assets: Vec::new(),
        }
    }

    pub fn picked(asset: PickedAsset) -> Self {
        Self {
            canceled: false,
            assets: vec![asset],
        }
    }

    pub fn first_asset(&self) -> Option<&PickedAsset> {
        self.assets.first()
    }
}

/// The image the editor is working on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CapturedImage {
    pub uri: String,
    pub base64: Option<String>,
    /// Original pixel dimensions; zero when the picker did not report them.
    pub size: SizePx,
}

impl CapturedImage {
    /// Builds the captured image from a picked asset. `None` without a URI.
    pub fn from_asset(asset: &PickedAsset) -> Option<Self> {
        let uri = asset.uri.as_deref().filter(|u| !u.is_empty())?;
        Some(Self {
            uri: uri.to_string(),
            base64: asset.base64.clone().filter(|b| !b.is_empty()),
            size: SizePx::new(asset.width, asset.height),
        })
    }

    /// Decodes the inline payload, if any.
    pub fn bytes(&self) -> Option<Result<Vec<u8>, base64::DecodeError>> {
        self.base64.as_deref().map(|b| STANDARD.decode(b))
    }
}

/// Errors raised by capture collaborators.
#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("picker failed: {0}")]
    Picker(String),

    #[error("sharing failed: {0}")]
    Share(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Image(#[from] image::ImageError),
}

// ============================================================================
// Collaborator traits
// ============================================================================

/// Native camera and photo library.
#[async_trait]
pub trait MediaPicker: Send + Sync {
    async fn request_camera_permission(&self) -> Result<PermissionStatus, CaptureError>;

    async fn launch_camera(&self, options: &PickerOptions) -> Result<PickerOutcome, CaptureError>;

    async fn launch_library(&self, options: &PickerOptions) -> Result<PickerOutcome, CaptureError>;
}

/// Modal alerts shown to the user.
pub trait Alerts: Send + Sync {
    fn alert(&self, title: &str, message: &str);
}

/// Native share sheet.
#[async_trait]
pub trait ShareSheet: Send + Sync {
    async fn is_available(&self) -> bool;

    async fn share(&self, uri: &str, dialog_title: &str) -> Result<(), CaptureError>;
}

// ============================================================================
// Headless implementations
// ============================================================================

/// Alerts written to the log instead of a dialog.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAlerts;

impl Alerts for TracingAlerts {
    fn alert(&self, title: &str, message: &str) {
        tracing::warn!(title, message, "alert");
    }
}

/// "Picks" a file from disk, for both the camera and the library.
///
/// The reported asset carries a `file://` URI, the base64 payload and the
/// pixel dimensions read from the image header.
#[derive(Debug, Clone)]
pub struct FilePicker {
    path: PathBuf,
}

impl FilePicker {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    async fn pick(&self, options: &PickerOptions) -> Result<PickerOutcome, CaptureError> {
        let bytes = tokio::fs::read(&self.path).await?;
        let (width, height) = image::ImageReader::new(std::io::Cursor::new(&bytes))
            .with_guessed_format()?
            .into_dimensions()?;
        let uri = format!("file://{}", self.path.display());

        tracing::debug!(%uri, width, height, "file picked");
        Ok(PickerOutcome::picked(PickedAsset {
            uri: Some(uri),
            base64: options.include_base64.then(|| STANDARD.encode(&bytes)),
            width,
            height,
        }))
    }
}

#[async_trait]
impl MediaPicker for FilePicker {
    async fn request_camera_permission(&self) -> Result<PermissionStatus, CaptureError> {
        Ok(PermissionStatus::Granted)
    }

    async fn launch_camera(&self, options: &PickerOptions) -> Result<PickerOutcome, CaptureError> {
        self.pick(options).await
    }

    async fn launch_library(&self, options: &PickerOptions) -> Result<PickerOutcome, CaptureError> {
        self.pick(options).await
    }
}
