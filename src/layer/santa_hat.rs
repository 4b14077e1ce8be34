//! Santa hat overlay: one vector hat near the top of the photo.

use super::{LayerConfig, LayerEffect};
use crate::animation::Animator;
use crate::photo::SizePx;

/// Side length of the square view box the hat artwork is drawn in.
const ARTWORK_BOX: f32 = 100.0;

/// Hat artwork in view box units: body, fur trim, pom-pom, then shading on top.
const ARTWORK: &str = r##"<path d="M 50 10 L 20 70 L 80 70 Z" fill="#DC143C" stroke="#8B0000" stroke-width="1"/><ellipse cx="50" cy="70" rx="32" ry="8" fill="#FFFFFF"/><ellipse cx="50" cy="10" rx="10" ry="10" fill="#FFFFFF"/><path d="M 50 10 L 20 70 L 35 70 Z" fill="#B22222" opacity="0.3"/>"##;

// ============================================================================
// SantaHatConfig
// ============================================================================

/// Configuration for the Santa hat overlay.
///
/// Sizes are fractions of the canvas: the hat box is `width_ratio` of the
/// width, `height_ratio` of the height, horizontally centered and
/// `top_ratio` of the height below the top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SantaHatConfig {
    pub width_ratio: f32,
    pub height_ratio: f32,
    pub top_ratio: f32,
}

impl Default for SantaHatConfig {
    fn default() -> Self {
        Self {
            width_ratio: 0.4,
            height_ratio: 0.3,
            top_ratio: 0.05,
        }
    }
}

impl LayerConfig for SantaHatConfig {
    fn differs_from(&self, other: &Self) -> bool {
        (self.width_ratio - other.width_ratio).abs() > 0.0001
            || (self.height_ratio - other.height_ratio).abs() > 0.0001
            || (self.top_ratio - other.top_ratio).abs() > 0.0001
    }
}

/// The hat's box on the canvas, in pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HatPlacement {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl HatPlacement {
    /// Uniform scale and offset that fit the square artwork inside the box,
    /// centered on the shorter axis.
    fn artwork_transform(&self) -> (f32, f32, f32) {
        let scale = (self.width / ARTWORK_BOX).min(self.height / ARTWORK_BOX);
        let dx = self.left + (self.width - ARTWORK_BOX * scale) / 2.0;
        let dy = self.top + (self.height - ARTWORK_BOX * scale) / 2.0;
        (dx, dy, scale)
    }
}

impl SantaHatConfig {
    /// Computes where the hat goes. `None` for an empty canvas.
    pub fn placement(&self, size: SizePx) -> Option<HatPlacement> {
        if size.is_empty() {
            return None;
        }
        let (w, h) = (size.width as f32, size.height as f32);
        let width = w * self.width_ratio;
        Some(HatPlacement {
            left: (w - width) / 2.0,
            top: h * self.top_ratio,
            width,
            height: h * self.height_ratio,
        })
    }
}

impl LayerEffect for SantaHatConfig {
    type Scene = HatPlacement;

    const ANIMATED: bool = false;

    fn mount(&self, size: SizePx, _animator: &Animator) -> HatPlacement {
        self.placement(size).unwrap_or(HatPlacement {
            left: 0.0,
            top: 0.0,
            width: 0.0,
            height: 0.0,
        })
    }

    fn markup(&self, scene: &HatPlacement, _size: SizePx) -> String {
        let (dx, dy, scale) = scene.artwork_transform();
        format!(r#"<g transform="translate({dx:.3} {dy:.3}) scale({scale:.5})">{ARTWORK}</g>"#)
    }
}
