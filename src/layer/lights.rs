//! String lights along the top edge, each bulb blinking on its own loop.

use super::svg::hex;
use super::{LayerConfig, LayerEffect};
use crate::animation::{Animator, LoopHandle, LoopSpec, Segment};
use crate::photo::SizePx;
use palette::{LinSrgb, Mix, Srgb};
use std::fmt::Write;

/// Bulb colours, assigned by index and cycling.
pub const LIGHT_PALETTE: [Srgb<u8>; 6] = [
    Srgb::new(0xFF, 0x00, 0x00),
    Srgb::new(0x00, 0xFF, 0x00),
    Srgb::new(0x00, 0x00, 0xFF),
    Srgb::new(0xFF, 0xFF, 0x00),
    Srgb::new(0xFF, 0x00, 0xFF),
    Srgb::new(0x00, 0xFF, 0xFF),
];

// ============================================================================
// LightsConfig
// ============================================================================

/// Configuration for the lights overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct LightsConfig {
    /// Number of bulbs, spread from the left edge to the right edge.
    pub count: usize,
    /// Bulb diameter in pixels.
    pub diameter: f32,
    /// Distance from the top edge to the top of each bulb.
    pub top: f32,
    pub bright_opacity: f32,
    pub dim_opacity: f32,
    /// Duration of the dim-to-bright phase.
    pub brighten_ms: f64,
    /// Duration of the bright-to-dim phase.
    pub dim_ms: f64,
    /// Start offset between consecutive bulbs.
    pub stagger_ms: f64,
    pub palette: Vec<Srgb<u8>>,
}

impl Default for LightsConfig {
    fn default() -> Self {
        Self {
            count: 10,
            diameter: 16.0,
            top: 10.0,
            bright_opacity: 1.0,
            dim_opacity: 0.3,
            brighten_ms: 500.0,
            dim_ms: 500.0,
            stagger_ms: 150.0,
            palette: LIGHT_PALETTE.to_vec(),
        }
    }
}

impl LayerConfig for LightsConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self != other
    }
}

impl LightsConfig {
    /// Replaces the palette with colours parsed from `#rrggbb` strings.
    pub fn with_palette(mut self, colors: &[&str]) -> Result<Self, palette::rgb::FromHexError> {
        self.palette = colors
            .iter()
            .map(|c| c.parse::<Srgb<u8>>())
            .collect::<Result<_, _>>()?;
        Ok(self)
    }

    /// Bulb positions and colours for a canvas width. Empty canvases and
    /// empty palettes get no bulbs.
    pub fn layout(&self, size: SizePx) -> Vec<Light> {
        if size.is_empty() || self.palette.is_empty() {
            return Vec::new();
        }

        let width = size.width as f32;
        let spacing = if self.count > 1 {
            width / (self.count - 1) as f32
        } else {
            0.0
        };

        (0..self.count)
            .map(|index| Light {
                index,
                x: if self.count > 1 { spacing * index as f32 } else { width / 2.0 },
                y: self.top,
                color: self.palette[index % self.palette.len()],
                delay_ms: self.stagger_ms * index as f64,
            })
            .collect()
    }

    fn blink(&self, delay_ms: f64) -> LoopSpec {
        LoopSpec::sequence(vec![
            Segment::new(self.dim_opacity, self.bright_opacity, self.brighten_ms),
            Segment::new(self.bright_opacity, self.dim_opacity, self.dim_ms),
        ])
        .with_delay(delay_ms)
    }
}

// ============================================================================
// LightString
// ============================================================================

/// One bulb. `x` is the bulb's horizontal center, `y` its top edge.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Light {
    pub index: usize,
    pub x: f32,
    pub y: f32,
    pub color: Srgb<u8>,
    pub delay_ms: f64,
}

impl Light {
    /// Soft halo colour, the bulb colour washed towards white.
    pub fn glow(&self) -> Srgb<u8> {
        let bulb: LinSrgb = self.color.into_format::<f32>().into_linear();
        let white = LinSrgb::new(1.0, 1.0, 1.0);
        Srgb::<f32>::from_linear(bulb.mix(white, 0.6)).into_format()
    }
}

/// Mounted lights: bulbs and their blink loops.
pub struct LightString {
    lights: Vec<(Light, LoopHandle)>,
}

impl LightString {
    pub fn lights(&self) -> impl Iterator<Item = &Light> {
        self.lights.iter().map(|(light, _)| light)
    }

    pub fn len(&self) -> usize {
        self.lights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lights.is_empty()
    }

    /// Current opacity of every bulb.
    pub fn opacities(&self) -> Vec<f32> {
        self.lights
            .iter()
            .map(|(_, blink)| blink.value().unwrap_or(0.0))
            .collect()
    }
}

impl LayerEffect for LightsConfig {
    type Scene = LightString;

    const ANIMATED: bool = true;

    fn mount(&self, size: SizePx, animator: &Animator) -> LightString {
        let lights = self
            .layout(size)
            .into_iter()
            .map(|light| {
                let blink = animator.start(self.blink(light.delay_ms));
                (light, blink)
            })
            .collect();
        LightString { lights }
    }

    fn markup(&self, scene: &LightString, _size: SizePx) -> String {
        let r = self.diameter / 2.0;
        let mut out = String::new();
        for (light, opacity) in scene.lights().zip(scene.opacities()) {
            let glow = light.glow();
            let cy = light.y + r;
            let _ = write!(
                out,
                r#"<circle cx="{x:.2}" cy="{cy:.2}" r="{halo:.2}" fill="{glow}" fill-opacity="{glow_opacity:.3}"/><circle cx="{x:.2}" cy="{cy:.2}" r="{r:.2}" fill="{color}" fill-opacity="{opacity:.3}"/>"#,
                x = light.x,
                halo = r * 1.6,
                glow = hex((glow.red, glow.green, glow.blue)),
                glow_opacity = opacity * 0.35,
                color = hex((light.color.red, light.color.green, light.color.blue)),
            );
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bulbs_span_the_top_edge() {
        let lights = LightsConfig::default().layout(SizePx::new(360, 200));
        assert_eq!(lights.len(), 10);
        assert_eq!(lights.first().unwrap().x, 0.0);
        assert!((lights.last().unwrap().x - 360.0).abs() < 1e-3);
        assert!((lights[1].x - 40.0).abs() < 1e-3);
        assert!(lights.iter().all(|l| l.y == 10.0));
    }

    #[test]
    fn colours_cycle_through_palette() {
        let lights = LightsConfig::default().layout(SizePx::new(360, 200));
        assert_eq!(lights[0].color, LIGHT_PALETTE[0]);
        assert_eq!(lights[5].color, LIGHT_PALETTE[5]);
        assert_eq!(lights[6].color, LIGHT_PALETTE[0]);
        assert_eq!(lights[9].color, LIGHT_PALETTE[3]);
    }

    #[test]
    fn start_times_are_staggered() {
        let lights = LightsConfig::default().layout(SizePx::new(360, 200));
        for (i, light) in lights.iter().enumerate() {
            assert_eq!(light.delay_ms, 150.0 * i as f64);
        }
    }

    #[test]
    fn empty_canvas_has_no_bulbs() {
        assert!(LightsConfig::default().layout(SizePx::new(0, 0)).is_empty());
    }

    #[test]
    fn single_bulb_is_centered() {
        let config = LightsConfig {
            count: 1,
            ..LightsConfig::default()
        };
        let lights = config.layout(SizePx::new(100, 50));
        assert_eq!(lights[0].x, 50.0);
    }

    #[test]
    fn bulbs_blink_between_dim_and_bright() {
        let animator = Animator::new();
        let scene = LightsConfig::default().mount(SizePx::new(360, 200), &animator);

        for step in 0..60 {
            animator.set_time(step as f64 * 53.0);
            for opacity in scene.opacities() {
                assert!((0.3 - 1e-4..=1.0 + 1e-4).contains(&opacity));
            }
        }

        // First bulb is bright at the end of its first phase; the second is
        // still waiting on its stagger offset.
        animator.set_time(499.9);
        let opacities = scene.opacities();
        assert!(opacities[0] > 0.99);
        assert!(opacities[1] < opacities[0]);
    }

    #[test]
    fn staggered_bulbs_do_not_blink_in_sync() {
        let animator = Animator::new();
        let scene = LightsConfig::default().mount(SizePx::new(360, 200), &animator);
        animator.set_time(2_300.0);
        let opacities = scene.opacities();
        assert!(opacities.windows(2).any(|w| (w[0] - w[1]).abs() > 0.05));
    }

    #[test]
    fn dropping_scene_stops_every_blink_loop() {
        let animator = Animator::new();
        let scene = LightsConfig::default().mount(SizePx::new(360, 200), &animator);
        assert_eq!(animator.active_loops(), 10);
        drop(scene);
        assert_eq!(animator.active_loops(), 0);
    }

    #[test]
    fn custom_palette_parses_hex() {
        let config = LightsConfig::default()
            .with_palette(&["#FFD700", "165B33"])
            .unwrap();
        assert_eq!(config.palette, vec![Srgb::new(0xFF, 0xD7, 0x00), Srgb::new(0x16, 0x5B, 0x33)]);
        assert!(LightsConfig::default().with_palette(&["#nothex"]).is_err());
    }

    #[test]
    fn glow_is_lighter_than_bulb() {
        let light = LightsConfig::default().layout(SizePx::new(100, 100))[0];
        let glow = light.glow();
        assert_eq!(glow.red, 255);
        assert!(glow.green > 0 && glow.blue > 0);
    }
}
