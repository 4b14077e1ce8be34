//! Falling snow overlay.
//!
//! Flakes are scattered with fresh, unseeded randomness every time the
//! layer mounts, so two mounts never look alike.

use super::{LayerConfig, LayerEffect};
use crate::animation::{Animator, Easing, LoopHandle, LoopSpec, Segment};
use crate::photo::SizePx;
use rand::Rng;
use std::fmt::Write;

// ============================================================================
// SnowConfig
// ============================================================================

/// Configuration for the snow overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct SnowConfig {
    /// Number of flakes.
    pub count: usize,
    /// Flake diameter range in pixels, `[min, max)`.
    pub size_range: (f32, f32),
    /// Time for one fall from above the top edge to below the bottom edge.
    pub fall_ms_range: (f64, f64),
    /// Period of one left-right-left sway.
    pub sway_ms_range: (f64, f64),
    /// Horizontal sway distance in pixels.
    pub sway_px: f32,
    /// How far above and below the canvas a fall starts and ends.
    pub overshoot_px: f32,
    pub opacity: f32,
}

impl Default for SnowConfig {
    fn default() -> Self {
        Self {
            count: 25,
            size_range: (4.0, 12.0),
            fall_ms_range: (2000.0, 5000.0),
            sway_ms_range: (2000.0, 4000.0),
            sway_px: 20.0,
            overshoot_px: 20.0,
            opacity: 0.8,
        }
    }
}

impl LayerConfig for SnowConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self != other
    }
}

/// One flake's randomised parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Snowflake {
    /// Horizontal start position.
    pub x: f32,
    /// Diameter.
    pub size: f32,
    pub fall_ms: f64,
    pub sway_ms: f64,
}

fn sample<R: Rng + ?Sized>(rng: &mut R, (lo, hi): (f64, f64)) -> f64 {
    if hi > lo { rng.gen_range(lo..hi) } else { lo }
}

impl SnowConfig {
    /// Draws flake parameters for a canvas. Empty canvases get no flakes.
    pub fn scatter<R: Rng + ?Sized>(&self, size: SizePx, rng: &mut R) -> Vec<Snowflake> {
        if size.is_empty() {
            return Vec::new();
        }
        let width = size.width as f64;
        let sizes = (self.size_range.0 as f64, self.size_range.1 as f64);

        (0..self.count)
            .map(|_| Snowflake {
                x: sample(rng, (0.0, width)) as f32,
                size: sample(rng, sizes) as f32,
                fall_ms: sample(rng, self.fall_ms_range),
                sway_ms: sample(rng, self.sway_ms_range),
            })
            .collect()
    }
}

// ============================================================================
// SnowField
// ============================================================================

struct FallingFlake {
    flake: Snowflake,
    fall: LoopHandle,
    sway: LoopHandle,
}

/// Mounted snow: the flakes plus their fall and sway loops.
pub struct SnowField {
    flakes: Vec<FallingFlake>,
}

impl SnowField {
    pub fn flakes(&self) -> impl Iterator<Item = &Snowflake> {
        self.flakes.iter().map(|f| &f.flake)
    }

    pub fn len(&self) -> usize {
        self.flakes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.flakes.is_empty()
    }

    /// Top-left corner of every flake at the animator's current time.
    pub fn positions(&self) -> Vec<(f32, f32)> {
        self.flakes
            .iter()
            .map(|f| {
                let dx = f.sway.value().unwrap_or(0.0);
                let y = f.fall.value().unwrap_or(0.0);
                (f.flake.x + dx, y)
            })
            .collect()
    }
}

impl LayerEffect for SnowConfig {
    type Scene = SnowField;

    const ANIMATED: bool = true;

    fn mount(&self, size: SizePx, animator: &Animator) -> SnowField {
        let flakes = self
            .scatter(size, &mut rand::thread_rng())
            .into_iter()
            .map(|flake| {
                let fall = animator.start(LoopSpec::timing(
                    Segment::new(
                        -self.overshoot_px,
                        size.height as f32 + self.overshoot_px,
                        flake.fall_ms,
                    )
                    .with_easing(Easing::Linear),
                ));
                let half = flake.sway_ms / 2.0;
                let sway = animator.start(LoopSpec::sequence(vec![
                    Segment::new(0.0, self.sway_px, half),
                    Segment::new(self.sway_px, 0.0, half),
                ]));
                FallingFlake { flake, fall, sway }
            })
            .collect();

        tracing::debug!(width = size.width, height = size.height, "snow mounted");
        SnowField { flakes }
    }

    fn markup(&self, scene: &SnowField, _size: SizePx) -> String {
        let mut out = String::new();
        for (flake, (x, y)) in scene.flakes().zip(scene.positions()) {
            let r = flake.size / 2.0;
            let _ = write!(
                out,
                r##"<circle cx="{:.2}" cy="{:.2}" r="{:.2}" fill="#ffffff" fill-opacity="{:.2}"/>"##,
                x + r,
                y + r,
                r,
                self.opacity
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    #[test]
    fn scatter_respects_ranges() {
        let config = SnowConfig::default();
        let mut rng = StdRng::seed_from_u64(7);
        let flakes = config.scatter(SizePx::new(320, 240), &mut rng);

        assert_eq!(flakes.len(), 25);
        for flake in &flakes {
            assert!((0.0..320.0).contains(&flake.x));
            assert!((4.0..12.0).contains(&flake.size));
            assert!((2000.0..5000.0).contains(&flake.fall_ms));
            assert!((2000.0..4000.0).contains(&flake.sway_ms));
        }
    }

    #[test]
    fn scatter_on_empty_canvas_is_empty() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(SnowConfig::default().scatter(SizePx::new(0, 0), &mut rng).is_empty());
        assert!(SnowConfig::default().scatter(SizePx::new(100, 0), &mut rng).is_empty());
    }

    #[test]
    fn flakes_start_above_the_top_edge() {
        let animator = Animator::new();
        let field = SnowConfig::default().mount(SizePx::new(200, 100), &animator);

        for (_, y) in field.positions() {
            assert!((y + 20.0).abs() < 1e-3);
        }
    }

    #[test]
    fn flakes_fall_and_stay_within_overshoot() {
        let animator = Animator::new();
        let field = SnowConfig::default().mount(SizePx::new(200, 100), &animator);

        for step in 0..40 {
            animator.set_time(step as f64 * 137.0);
            for (flake, (x, y)) in field.flakes().zip(field.positions()) {
                assert!((-20.0..=120.0).contains(&y));
                assert!(x >= flake.x - 1e-3 && x <= flake.x + 20.0 + 1e-3);
            }
        }
    }

    #[test]
    fn each_mount_draws_fresh_positions() {
        let animator = Animator::new();
        let config = SnowConfig::default();
        let a: Vec<f32> = config.mount(SizePx::new(500, 500), &animator).flakes().map(|f| f.x).collect();
        let b: Vec<f32> = config.mount(SizePx::new(500, 500), &animator).flakes().map(|f| f.x).collect();
        assert_ne!(a, b);
    }

    #[test]
    fn dropping_the_field_stops_both_loops_per_flake() {
        let animator = Animator::new();
        let field = SnowConfig::default().mount(SizePx::new(200, 100), &animator);
        assert_eq!(animator.active_loops(), 50);
        drop(field);
        assert_eq!(animator.active_loops(), 0);
    }

    #[test]
    fn markup_draws_one_circle_per_flake() {
        let animator = Animator::new();
        let config = SnowConfig::default();
        let field = config.mount(SizePx::new(200, 100), &animator);
        let markup = config.markup(&field, SizePx::new(200, 100));
        assert_eq!(markup.matches("<circle").count(), 25);
    }
}
