//! Overlay layers drawn over the displayed photo.
//!
//! Each overlay config implements [`LayerEffect`], which defines:
//! - How the overlay lays itself out for a canvas size (its *scene*)
//! - Which animation loops the scene keeps running
//! - How the scene is drawn as SVG markup
//!
//! A [`Layer`] wraps a config with an enabled flag, a version counter, the
//! currently mounted scene and a raster cache for overlays that do not
//! animate. [`OverlayPipeline`] holds one layer per filter and composites the
//! active ones in a fixed order.
//!
//! Overlays are purely decorative: they only ever paint over the photo and
//! expose no input handling.

pub mod frame;
pub mod lights;
pub mod santa_hat;
pub mod snow;
pub mod svg;

pub use frame::{Band, FrameConfig, FrameLayout, Glyph, GlyphPlacement};
pub use lights::{Light, LightString, LightsConfig};
pub use santa_hat::{HatPlacement, SantaHatConfig};
pub use snow::{SnowConfig, SnowField, Snowflake};
pub use svg::SvgSource;

use crate::animation::Animator;
use crate::filter::{Filter, FilterSelection};
use crate::photo::{Photo, SizePx};
use image::RgbaImage;
use std::collections::HashMap;

// ============================================================================
// Render Context
// ============================================================================

/// Context that flows through the overlay pipeline.
pub struct RenderContext {
    /// The photo being decorated.
    pub image: Photo,
}

impl RenderContext {
    pub fn new(image: Photo) -> Self {
        Self { image }
    }

    pub fn size(&self) -> SizePx {
        self.image.dimensions()
    }
}

// ============================================================================
// Layer Traits
// ============================================================================

/// Trait for layer configuration types.
///
/// Implementations must detect when a configuration meaningfully differs
/// from another, which drives remounting and cache invalidation.
pub trait LayerConfig: Clone {
    /// Returns true if this config differs from another in a way that
    /// would produce different rendering output.
    fn differs_from(&self, other: &Self) -> bool;
}

/// Trait for overlay configurations that know how to draw themselves.
pub trait LayerEffect: LayerConfig {
    /// Elements laid out for one canvas size, including any running loops.
    type Scene;

    /// True when the drawn output changes with the animator clock.
    const ANIMATED: bool;

    /// Lays the overlay out for a non-empty canvas and starts its loops.
    fn mount(&self, size: SizePx, animator: &Animator) -> Self::Scene;

    /// SVG elements for the scene, in canvas pixel units.
    fn markup(&self, scene: &Self::Scene, size: SizePx) -> String;

    /// Rasterises the scene onto a transparent canvas.
    fn draw(&self, scene: &Self::Scene, size: SizePx) -> Option<RgbaImage> {
        svg::render_canvas(&svg::document(size, &self.markup(scene, size)), size)
    }
}

// ============================================================================
// Generic Layer
// ============================================================================

struct Mounted<S> {
    size: SizePx,
    scene: S,
}

/// A generic layer with configuration, mounting and version tracking.
///
/// The layer tracks:
/// - Optional configuration of type `C`
/// - Whether the layer is enabled (can be toggled without losing config)
/// - A version number that increments on any state change
/// - The scene mounted for the last canvas size, if any
/// - A cache of static overlay rasters keyed by canvas size
pub struct Layer<C: LayerEffect> {
    config: Option<C>,
    enabled: bool,
    version: u64,
    mounted: Option<Mounted<C::Scene>>,
    cache: HashMap<SizePx, RgbaImage>,
}

impl<C: LayerEffect> Default for Layer<C> {
    fn default() -> Self {
        Self {
            config: None,
            enabled: true,
            version: 0,
            mounted: None,
            cache: HashMap::new(),
        }
    }
}

impl<C: LayerEffect> Layer<C> {
    /// Creates a layer with a config in the given enabled state.
    pub fn new(config: C, enabled: bool) -> Self {
        Self {
            config: Some(config),
            enabled,
            ..Self::default()
        }
    }

    pub fn config(&self) -> Option<&C> {
        self.config.as_ref()
    }

    /// Returns true if this layer is active (has config AND is enabled).
    pub fn is_active(&self) -> bool {
        self.enabled && self.config.is_some()
    }

    pub fn has_config(&self) -> bool {
        self.config.is_some()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    /// Sets whether the layer is enabled.
    ///
    /// Returns true if the enabled state changed. Disabling unmounts the
    /// scene, stopping its loops.
    pub fn set_enabled(&mut self, enabled: bool) -> bool {
        if self.enabled != enabled {
            self.enabled = enabled;
            self.invalidate();
            true
        } else {
            false
        }
    }

    /// Sets the configuration. Returns true if it changed.
    pub fn set_config(&mut self, config: Option<C>) -> bool {
        let differs = match (&self.config, &config) {
            (None, None) => false,
            (Some(_), None) | (None, Some(_)) => true,
            (Some(old), Some(new)) => old.differs_from(new),
        };

        if differs {
            self.config = config;
            self.invalidate();
            true
        } else {
            false
        }
    }

    /// Drops the mounted scene and cache, and bumps the version.
    pub fn invalidate(&mut self) {
        self.version = self.version.wrapping_add(1);
        self.mounted = None;
        self.cache.clear();
    }

    /// Size of the mounted scene, if any.
    pub fn mounted_size(&self) -> Option<SizePx> {
        self.mounted.as_ref().map(|m| m.size)
    }

    pub fn scene(&self) -> Option<&C::Scene> {
        self.mounted.as_ref().map(|m| &m.scene)
    }

    /// Ensures a scene is mounted for `size`.
    ///
    /// A scene mounted for a different size is torn down first. Inactive
    /// layers and empty sizes leave nothing mounted. Returns true when a
    /// scene is mounted afterwards.
    pub fn mount(&mut self, size: SizePx, animator: &Animator) -> bool {
        let Some(config) = self.config.as_ref().filter(|_| self.enabled) else {
            self.mounted = None;
            return false;
        };
        if size.is_empty() {
            self.mounted = None;
            return false;
        }
        if self.mounted.as_ref().is_some_and(|m| m.size == size) {
            return true;
        }

        // Old loops stop before new ones start.
        self.mounted = None;
        let scene = config.mount(size, animator);
        self.mounted = Some(Mounted { size, scene });
        true
    }

    /// Tears down the mounted scene, stopping its loops.
    pub fn unmount(&mut self) {
        self.mounted = None;
    }

    /// Draws the layer over the context image, mounting for its size first.
    ///
    /// Inactive layers and empty canvases leave the context untouched.
    pub fn apply(&mut self, ctx: &mut RenderContext, animator: &Animator) {
        let size = ctx.size();
        if !self.mount(size, animator) {
            return;
        }
        let (Some(config), Some(mounted)) = (self.config.as_ref(), self.mounted.as_ref()) else {
            return;
        };

        if !C::ANIMATED {
            if let Some(cached) = self.cache.get(&size) {
                svg::composite_over(&mut ctx.image.data, cached, 0, 0);
                return;
            }
        }

        let Some(raster) = config.draw(&mounted.scene, size) else {
            return;
        };
        svg::composite_over(&mut ctx.image.data, &raster, 0, 0);

        if !C::ANIMATED {
            self.cache.insert(size, raster);
        }
    }
}

// ============================================================================
// Overlay Pipeline
// ============================================================================

/// One layer per filter, composited bottom to top:
///
/// ```text
/// Photo
///   │
///   ▼
/// Frame ─► Santa Hat ─► Lights ─► Snow
/// ```
///
/// All layers carry their default config and start disabled;
/// [`sync_selection`](Self::sync_selection) enables the selected ones.
pub struct OverlayPipeline {
    pub frame: Layer<FrameConfig>,
    pub santa_hat: Layer<SantaHatConfig>,
    pub lights: Layer<LightsConfig>,
    pub snow: Layer<SnowConfig>,
}

impl Default for OverlayPipeline {
    fn default() -> Self {
        Self {
            frame: Layer::new(FrameConfig::default(), false),
            santa_hat: Layer::new(SantaHatConfig::default(), false),
            lights: Layer::new(LightsConfig::default(), false),
            snow: Layer::new(SnowConfig::default(), false),
        }
    }
}

impl OverlayPipeline {
    pub fn new() -> Self {
        Self::default()
    }

    /// Enables exactly the layers whose filter is selected.
    pub fn sync_selection(&mut self, selection: &FilterSelection) {
        for filter in Filter::ALL {
            self.set_filter_enabled(filter, selection.contains(filter));
        }
    }

    /// Enables or disables the layer drawing `filter`.
    pub fn set_filter_enabled(&mut self, filter: Filter, enabled: bool) -> bool {
        match filter {
            Filter::Frame => self.frame.set_enabled(enabled),
            Filter::Santa => self.santa_hat.set_enabled(enabled),
            Filter::Lights => self.lights.set_enabled(enabled),
            Filter::Snow => self.snow.set_enabled(enabled),
        }
    }

    pub fn is_active(&self, filter: Filter) -> bool {
        match filter {
            Filter::Frame => self.frame.is_active(),
            Filter::Santa => self.santa_hat.is_active(),
            Filter::Lights => self.lights.is_active(),
            Filter::Snow => self.snow.is_active(),
        }
    }

    /// Filters currently drawn, in compositing order.
    pub fn active_filters(&self) -> Vec<Filter> {
        [Filter::Frame, Filter::Santa, Filter::Lights, Filter::Snow]
            .into_iter()
            .filter(|f| self.is_active(*f))
            .collect()
    }

    /// Mounts every active layer for a measured canvas size.
    ///
    /// Called on layout; a changed size tears down and rebuilds each scene.
    pub fn mount(&mut self, size: SizePx, animator: &Animator) {
        self.frame.mount(size, animator);
        self.santa_hat.mount(size, animator);
        self.lights.mount(size, animator);
        self.snow.mount(size, animator);
    }

    /// Unmounts every layer, stopping all overlay loops.
    pub fn unmount(&mut self) {
        self.frame.unmount();
        self.santa_hat.unmount();
        self.lights.unmount();
        self.snow.unmount();
    }

    /// Combined version of all layers, changes whenever any layer does.
    pub fn version(&self) -> u64 {
        [
            self.frame.version(),
            self.santa_hat.version(),
            self.lights.version(),
            self.snow.version(),
        ]
        .iter()
        .fold(0u64, |acc, v| acc.wrapping_add(*v))
    }

    /// Draws every active overlay over a copy of `base` at the animator's
    /// current time.
    pub fn render(&mut self, base: &Photo, animator: &Animator) -> Photo {
        let mut ctx = RenderContext::new(base.clone());

        self.frame.apply(&mut ctx, animator);
        self.santa_hat.apply(&mut ctx, animator);
        self.lights.apply(&mut ctx, animator);
        self.snow.apply(&mut ctx, animator);

        ctx.image
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgba;

    fn photo(width: u32, height: u32) -> Photo {
        Photo::new(RgbaImage::from_pixel(width, height, Rgba([40, 40, 40, 255])))
    }

    fn all_selected() -> FilterSelection {
        Filter::ALL.into_iter().collect()
    }

    #[test]
    fn pipeline_starts_with_every_layer_disabled() {
        let pipeline = OverlayPipeline::new();
        assert!(pipeline.active_filters().is_empty());
        assert!(pipeline.frame.has_config());
        assert!(!pipeline.frame.is_active());
    }

    #[test]
    fn sync_selection_enables_selected_layers_only() {
        let mut pipeline = OverlayPipeline::new();
        let selection: FilterSelection = [Filter::Snow, Filter::Frame].into_iter().collect();
        pipeline.sync_selection(&selection);

        assert_eq!(pipeline.active_filters(), vec![Filter::Frame, Filter::Snow]);
    }

    #[test]
    fn zero_sized_canvas_renders_nothing_for_every_overlay() {
        let animator = Animator::new();
        let mut pipeline = OverlayPipeline::new();
        pipeline.sync_selection(&all_selected());

        pipeline.mount(SizePx::new(0, 0), &animator);
        assert_eq!(animator.active_loops(), 0);
        assert!(pipeline.frame.scene().is_none());
        assert!(pipeline.santa_hat.scene().is_none());
        assert!(pipeline.lights.scene().is_none());
        assert!(pipeline.snow.scene().is_none());

        let empty = Photo::new(RgbaImage::new(0, 0));
        let out = pipeline.render(&empty, &animator);
        assert_eq!(out.dimensions(), SizePx::new(0, 0));
        assert_eq!(animator.active_loops(), 0);
    }

    #[test]
    fn disabled_pipeline_leaves_photo_untouched() {
        let animator = Animator::new();
        let mut pipeline = OverlayPipeline::new();
        let base = photo(64, 48);
        assert_eq!(pipeline.render(&base, &animator), base);
    }

    #[test]
    fn enabled_pipeline_paints_over_photo() {
        let animator = Animator::new();
        let mut pipeline = OverlayPipeline::new();
        pipeline.sync_selection(&all_selected());

        let base = photo(200, 160);
        let out = pipeline.render(&base, &animator);
        assert_eq!(out.dimensions(), base.dimensions());
        assert_ne!(out, base);
    }

    #[test]
    fn mounting_starts_loops_and_unmount_stops_them() {
        let animator = Animator::new();
        let mut pipeline = OverlayPipeline::new();
        pipeline.sync_selection(&all_selected());

        pipeline.mount(SizePx::new(300, 200), &animator);
        let lights = LightsConfig::default().count;
        let flakes = SnowConfig::default().count;
        assert_eq!(animator.active_loops(), lights + flakes * 2);

        pipeline.unmount();
        assert_eq!(animator.active_loops(), 0);
    }

    #[test]
    fn resize_replaces_loops_instead_of_leaking() {
        let animator = Animator::new();
        let mut pipeline = OverlayPipeline::new();
        pipeline.sync_selection(&all_selected());

        pipeline.mount(SizePx::new(300, 200), &animator);
        let expected = animator.active_loops();

        for width in [320, 280, 400, 301] {
            pipeline.mount(SizePx::new(width, 210), &animator);
            assert_eq!(animator.active_loops(), expected);
            assert_eq!(pipeline.snow.mounted_size(), Some(SizePx::new(width, 210)));
        }
    }

    #[test]
    fn remount_at_same_size_keeps_scene() {
        let animator = Animator::new();
        let mut layer = Layer::new(SnowConfig::default(), true);
        layer.mount(SizePx::new(100, 100), &animator);
        let first: Vec<f32> = layer.scene().unwrap().flakes().map(|f| f.x).collect();

        layer.mount(SizePx::new(100, 100), &animator);
        let second: Vec<f32> = layer.scene().unwrap().flakes().map(|f| f.x).collect();
        assert_eq!(first, second);
    }

    #[test]
    fn disabling_a_layer_stops_its_loops() {
        let animator = Animator::new();
        let mut pipeline = OverlayPipeline::new();
        pipeline.set_filter_enabled(Filter::Lights, true);
        pipeline.mount(SizePx::new(300, 200), &animator);
        assert_eq!(animator.active_loops(), LightsConfig::default().count);

        pipeline.set_filter_enabled(Filter::Lights, false);
        assert_eq!(animator.active_loops(), 0);
        assert!(pipeline.lights.scene().is_none());
    }

    #[test]
    fn layer_generic_set_config() {
        let mut layer: Layer<SantaHatConfig> = Layer::default();

        assert!(layer.is_enabled());
        assert!(!layer.has_config());
        assert!(!layer.is_active());
        assert_eq!(layer.version(), 0);

        assert!(layer.set_config(Some(SantaHatConfig::default())));
        assert!(layer.is_active());
        assert_eq!(layer.version(), 1);

        assert!(!layer.set_config(Some(SantaHatConfig::default())));
        assert_eq!(layer.version(), 1);

        let wider = SantaHatConfig {
            width_ratio: 0.6,
            ..SantaHatConfig::default()
        };
        assert!(layer.set_config(Some(wider)));
        assert_eq!(layer.version(), 2);
    }

    #[test]
    fn layer_toggle_without_losing_config() {
        let mut layer = Layer::new(FrameConfig::default(), true);

        assert!(layer.set_enabled(false));
        assert!(!layer.is_active());
        assert!(layer.has_config());

        assert!(layer.set_enabled(true));
        assert!(layer.is_active());
        assert!(!layer.set_enabled(true));
    }

    #[test]
    fn static_layer_output_is_stable_across_frames() {
        let animator = Animator::new();
        let mut pipeline = OverlayPipeline::new();
        pipeline.set_filter_enabled(Filter::Frame, true);
        pipeline.set_filter_enabled(Filter::Santa, true);

        let base = photo(240, 180);
        let first = pipeline.render(&base, &animator);
        animator.advance(750.0);
        let second = pipeline.render(&base, &animator);
        assert_eq!(first, second);
    }

    #[test]
    fn animated_layer_output_changes_over_time() {
        let animator = Animator::new();
        let mut pipeline = OverlayPipeline::new();
        pipeline.set_filter_enabled(Filter::Lights, true);

        let base = photo(240, 180);
        let first = pipeline.render(&base, &animator);
        animator.advance(2_000.0);
        let second = pipeline.render(&base, &animator);
        assert_ne!(first, second);
    }
}
