//! The photo editor session: capture, filter selection, overlay preview,
//! remote transform and sharing.

use crate::animation::Animator;
use crate::capture::{
    Alerts, CaptureError, CaptureSource, CapturedImage, MediaPicker, PermissionStatus,
    PickerOptions, PickerOutcome, ShareSheet,
};
use crate::client::{FunctionInvoker, TransformClient, TransformParams};
use crate::filter::{Filter, FilterSelection};
use crate::layer::OverlayPipeline;
use crate::photo::{fit_contain, Photo, PhotoError, RectPx, SizePx};
use crate::protocol::TransformResponse;
use std::sync::Arc;

/// Display container used when the host does not pick one: full width of a
/// typical phone column, 400 points tall.
pub const DEFAULT_CONTAINER: SizePx = SizePx {
    width: 360,
    height: 400,
};

/// Title of the share dialog.
pub const SHARE_DIALOG_TITLE: &str = "Share your Christmas photo!";

// ============================================================================
// Collaborators
// ============================================================================

/// Everything outside the process the editor talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub picker: Arc<dyn MediaPicker>,
    pub alerts: Arc<dyn Alerts>,
    pub share: Arc<dyn ShareSheet>,
    pub functions: Arc<dyn FunctionInvoker>,
}

/// How a capture request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureResult {
    Captured,
    Canceled,
    PermissionDenied,
    /// Another capture or transform was still running.
    Busy,
    Failed,
}

/// How a share request ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShareResult {
    Shared,
    NothingToShare,
    Unavailable,
    Failed,
}

/// Errors while building the overlay preview.
#[derive(Debug, thiserror::Error)]
pub enum PreviewError {
    #[error("the captured image has no inline payload")]
    MissingPayload,

    #[error("invalid base64 payload: {0}")]
    Payload(#[from] base64::DecodeError),

    #[error(transparent)]
    Photo(#[from] PhotoError),
}

// ============================================================================
// EditorSession
// ============================================================================

/// One editing session over a single captured photo at a time.
///
/// Access the overlay layers through [`pipeline`](Self::pipeline); the
/// selection drives which of them are enabled.
pub struct EditorSession {
    collaborators: Collaborators,
    transform: TransformClient<Arc<dyn FunctionInvoker>>,
    captured: Option<CapturedImage>,
    /// Decoded captured photo, filled on first preview.
    decoded: Option<Photo>,
    selection: FilterSelection,
    container: SizePx,
    layout: SizePx,
    transform_result: Option<TransformResponse>,
    busy: bool,
    animator: Animator,
    pub pipeline: OverlayPipeline,
}

impl EditorSession {
    pub fn new(collaborators: Collaborators) -> Self {
        Self::with_container(collaborators, DEFAULT_CONTAINER)
    }

    pub fn with_container(collaborators: Collaborators, container: SizePx) -> Self {
        let transform = TransformClient::new(collaborators.functions.clone());
        Self {
            collaborators,
            transform,
            captured: None,
            decoded: None,
            selection: FilterSelection::new(),
            container,
            layout: SizePx::default(),
            transform_result: None,
            busy: false,
            animator: Animator::new(),
            pipeline: OverlayPipeline::new(),
        }
    }

    pub fn captured(&self) -> Option<&CapturedImage> {
        self.captured.as_ref()
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn layout(&self) -> SizePx {
        self.layout
    }

    pub fn transform_result(&self) -> Option<&TransformResponse> {
        self.transform_result.as_ref()
    }

    pub fn transform_client(&self) -> &TransformClient<Arc<dyn FunctionInvoker>> {
        &self.transform
    }

    pub fn is_busy(&self) -> bool {
        self.busy
    }

    pub fn animator(&self) -> &Animator {
        &self.animator
    }

    // ------------------------------------------------------------------------
    // Capture
    // ------------------------------------------------------------------------

    /// Asks for camera permission, then opens the camera.
    pub async fn take_photo(&mut self) -> CaptureResult {
        if self.busy {
            return CaptureResult::Busy;
        }

        match self.collaborators.picker.request_camera_permission().await {
            Ok(PermissionStatus::Granted) => {}
            Ok(status) => {
                tracing::info!(?status, "camera permission denied");
                self.collaborators.alerts.alert(
                    "Permission Required",
                    "Camera permission is required to take photos.",
                );
                return CaptureResult::PermissionDenied;
            }
            Err(err) => {
                tracing::error!(error = %err, "camera permission request failed");
                self.collaborators
                    .alerts
                    .alert("Error", "Failed to request camera permissions.");
                return CaptureResult::Failed;
            }
        }

        self.capture(CaptureSource::Camera).await
    }

    /// Opens the photo library.
    pub async fn pick_image(&mut self) -> CaptureResult {
        if self.busy {
            return CaptureResult::Busy;
        }
        self.capture(CaptureSource::Library).await
    }

    async fn capture(&mut self, source: CaptureSource) -> CaptureResult {
        let options = PickerOptions::default();
        let picker = self.collaborators.picker.clone();

        self.busy = true;
        let outcome = match source {
            CaptureSource::Camera => picker.launch_camera(&options).await,
            CaptureSource::Library => picker.launch_library(&options).await,
        };
        self.busy = false;

        self.accept(source, outcome)
    }

    fn accept(
        &mut self,
        source: CaptureSource,
        outcome: Result<PickerOutcome, CaptureError>,
    ) -> CaptureResult {
        let (verb, noun) = match source {
            CaptureSource::Camera => ("take", "capture"),
            CaptureSource::Library => ("pick", "select"),
        };

        let outcome = match outcome {
            Ok(outcome) => outcome,
            Err(err) => {
                tracing::error!(error = %err, ?source, "picker failed");
                self.collaborators
                    .alerts
                    .alert("Error", &format!("Failed to {verb} photo: {err}"));
                return CaptureResult::Failed;
            }
        };

        if outcome.canceled {
            tracing::debug!(?source, "picker canceled");
            return CaptureResult::Canceled;
        }

        let Some(image) = outcome.first_asset().and_then(CapturedImage::from_asset) else {
            tracing::error!(?source, "picker returned no image uri");
            self.collaborators
                .alerts
                .alert("Error", &format!("Failed to {noun} photo. Please try again."));
            return CaptureResult::Failed;
        };

        tracing::info!(uri = %image.uri, width = image.size.width, height = image.size.height, "photo captured");
        self.captured = Some(image);
        self.decoded = None;
        self.selection.clear();
        self.pipeline.sync_selection(&self.selection);
        self.transform_result = None;
        self.transform.reset();
        CaptureResult::Captured
    }

    // ------------------------------------------------------------------------
    // Selection and layout
    // ------------------------------------------------------------------------

    /// Adds or removes a filter and updates the overlays to match.
    ///
    /// Returns true when the filter is selected afterwards.
    pub fn toggle_filter(&mut self, filter: Filter) -> bool {
        let selected = self.selection.toggle(filter);
        tracing::debug!(%filter, selected, "filter toggled");

        self.pipeline.sync_selection(&self.selection);
        if !self.layout.is_empty() {
            self.pipeline.mount(self.layout, &self.animator);
        }
        selected
    }

    /// Clears the photo, selection, geometry and any transform result.
    pub fn reset_image(&mut self) {
        tracing::info!("resetting image");
        self.captured = None;
        self.decoded = None;
        self.selection.clear();
        self.pipeline.sync_selection(&self.selection);
        self.pipeline.unmount();
        self.layout = SizePx::default();
        self.transform_result = None;
        self.transform.reset();
    }

    /// Records the measured size of the overlay area. Zero sizes are ignored.
    pub fn on_layout(&mut self, size: SizePx) -> bool {
        if size.is_empty() {
            return false;
        }
        self.layout = size;
        self.pipeline.mount(size, &self.animator);
        true
    }

    /// Where the captured photo is drawn inside the display container.
    pub fn displayed_geometry(&self) -> Option<RectPx> {
        let captured = self.captured.as_ref()?;
        fit_contain(captured.size, self.container)
    }

    /// The transform result if there is one, else the captured photo.
    pub fn displayed_uri(&self) -> Option<&str> {
        self.transform_result
            .as_ref()
            .map(|r| r.url.as_str())
            .or_else(|| self.captured.as_ref().map(|c| c.uri.as_str()))
    }

    // ------------------------------------------------------------------------
    // Preview
    // ------------------------------------------------------------------------

    /// Draws the captured photo, contain-fitted to the measured layout, with
    /// the selected overlays at the animator's current time.
    ///
    /// `Ok(None)` until both a photo and a layout exist.
    pub fn render_preview(&mut self) -> Result<Option<Photo>, PreviewError> {
        let Some(captured) = self.captured.as_ref() else {
            return Ok(None);
        };
        if self.layout.is_empty() {
            return Ok(None);
        }

        if self.decoded.is_none() {
            let bytes = captured.bytes().ok_or(PreviewError::MissingPayload)??;
            self.decoded = Some(Photo::from_bytes(&bytes)?);
        }
        let Some(base) = self.decoded.as_ref().and_then(|p| p.contained_in(self.layout)) else {
            return Ok(None);
        };

        Ok(Some(self.pipeline.render(&base, &self.animator)))
    }

    // ------------------------------------------------------------------------
    // Transform and share
    // ------------------------------------------------------------------------

    /// Sends the photo and selected filters to the transform function.
    ///
    /// A success replaces the current result; a failure alerts the user and
    /// leaves the previous result in place.
    pub async fn request_transform(&mut self, prompt: Option<String>) -> Option<TransformResponse> {
        if self.busy {
            return None;
        }

        let params = TransformParams {
            image_uri: self
                .captured
                .as_ref()
                .map(|c| c.uri.clone())
                .unwrap_or_default(),
            image_base64: self
                .captured
                .as_ref()
                .and_then(|c| c.base64.clone())
                .unwrap_or_default(),
            filters: self.selection.ids(),
            prompt,
        };

        self.busy = true;
        let result = self.transform.transform(params).await;
        self.busy = false;

        match result {
            Some(response) => {
                self.transform_result = Some(response.clone());
                Some(response)
            }
            None => {
                let message = self
                    .transform
                    .error()
                    .unwrap_or("Failed to transform image")
                    .to_string();
                self.collaborators.alerts.alert("Transformation Failed", &message);
                None
            }
        }
    }

    /// Opens the share sheet for the displayed photo.
    pub async fn share(&self) -> ShareResult {
        let Some(uri) = self.displayed_uri() else {
            tracing::debug!("no image to share");
            return ShareResult::NothingToShare;
        };

        if !self.collaborators.share.is_available().await {
            self.collaborators.alerts.alert(
                "Sharing Not Available",
                "Sharing is not available on this device.",
            );
            return ShareResult::Unavailable;
        }

        match self.collaborators.share.share(uri, SHARE_DIALOG_TITLE).await {
            Ok(()) => ShareResult::Shared,
            Err(err) => {
                tracing::error!(error = %err, "share failed");
                self.collaborators
                    .alerts
                    .alert("Error", "Failed to share image. Please try again.");
                ShareResult::Failed
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
