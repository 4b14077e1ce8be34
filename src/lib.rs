//! festive-lens: Christmas photo filters
//!
//! This crate provides the pieces of a festive photo editor: decorative
//! overlays drawn over a displayed photo, the editor session that captures
//! a photo and drives them, a client for the remote transform function, and
//! that function itself, which turns the photo into a festive image through
//! an AI vendor and stores the result.
//!
//! # Overlays
//!
//! ```
//! use festive_lens::{Animator, Filter, FilterSelection, OverlayPipeline, Photo, SizePx};
//!
//! let animator = Animator::new();
//! let mut pipeline = OverlayPipeline::new();
//!
//! // Enable overlays through a selection
//! let mut selection = FilterSelection::new();
//! selection.toggle(Filter::Snow);
//! selection.toggle(Filter::Frame);
//! pipeline.sync_selection(&selection);
//!
//! // Lay out for the measured size, then render a frame half a second in
//! pipeline.mount(SizePx::new(320, 240), &animator);
//! animator.advance(500.0);
//!
//! let photo = Photo::new(image::RgbaImage::new(320, 240));
//! let output = pipeline.render(&photo, &animator);
//! assert_eq!(output.dimensions(), SizePx::new(320, 240));
//!
//! // Unmounting stops every animation loop
//! pipeline.unmount();
//! assert_eq!(animator.active_loops(), 0);
//! ```
//!
//! # Prompts
//!
//! ```
//! use festive_lens::{FALLBACK_PROMPT, generate_prompt};
//!
//! let prompt = generate_prompt(&["snow", "lights"]);
//! assert!(prompt.starts_with("Transform this photo with Christmas holiday theme"));
//! assert_eq!(generate_prompt(&["glitter"]), FALLBACK_PROMPT);
//! ```

pub mod animation;
pub mod capture;
pub mod client;
pub mod editor;
pub mod filter;
pub mod layer;
pub mod photo;
pub mod protocol;
pub mod service;

pub use animation::{Animator, Easing, LoopHandle, LoopSpec, Segment};
pub use client::{
    FunctionInvoker, FunctionsConfig, FunctionsHttp, InvokeError, TransformClient,
    TransformParams, TransformState,
};
pub use editor::{CaptureResult, Collaborators, EditorSession, ShareResult};
pub use filter::{
    FALLBACK_PROMPT, Filter, FilterSelection, UnknownFilter, generate_prompt, resolve_prompt,
};
pub use layer::{
    FrameConfig, Layer, LayerConfig, LayerEffect, LightsConfig, OverlayPipeline, RenderContext,
    SantaHatConfig, SnowConfig, SvgSource,
};
pub use photo::{Photo, PhotoError, RectPx, SizePx, fit_contain};
pub use protocol::{Degradation, ErrorBody, TransformRequest, TransformResponse};
pub use service::{ServiceConfig, ServiceError, TransformService};
