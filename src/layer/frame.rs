//! Ornamental frame overlay: four border bands with a gold inner edge,
//! festive glyphs spread along each band and one glyph in every corner.

use super::svg::{composite_over, document, hex, render_canvas, render_source, SvgSource};
use super::{LayerConfig, LayerEffect};
use crate::animation::Animator;
use crate::photo::SizePx;
use image::RgbaImage;
use palette::Srgb;
use std::fmt::Write;

// ============================================================================
// Glyph
// ============================================================================

/// A decorative glyph drawn on the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Glyph {
    Tree,
    Star,
    Gift,
    Santa,
    Snowflake,
    Bell,
}

impl Glyph {
    pub fn emoji(self) -> &'static str {
        match self {
            Glyph::Tree => "🎄",
            Glyph::Star => "⭐",
            Glyph::Gift => "🎁",
            Glyph::Santa => "🎅",
            Glyph::Snowflake => "❄️",
            Glyph::Bell => "🔔",
        }
    }

    /// Built-in vector artwork in a 100×100 view box.
    pub fn vector(self) -> &'static str {
        match self {
            Glyph::Tree => {
                r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><rect x="42" y="78" width="16" height="18" fill="#6B3E1F"/><path d="M 50 4 L 14 80 L 86 80 Z" fill="#1E8C3A"/><circle cx="40" cy="52" r="5" fill="#DC143C"/><circle cx="60" cy="66" r="5" fill="#FFD700"/></svg>"##
            }
            Glyph::Star => {
                r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><path d="M 50 4 L 62 38 L 97 38 L 69 59 L 79 94 L 50 73 L 21 94 L 31 59 L 3 38 L 38 38 Z" fill="#FFD700"/></svg>"##
            }
            Glyph::Gift => {
                r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><rect x="10" y="34" width="80" height="60" fill="#DC143C"/><rect x="6" y="24" width="88" height="16" fill="#B22222"/><rect x="44" y="24" width="12" height="70" fill="#FFD700"/><path d="M 50 24 C 30 4 20 20 50 24 C 80 20 70 4 50 24 Z" fill="#FFD700"/></svg>"##
            }
            Glyph::Santa => {
                r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><path d="M 22 44 L 54 6 L 78 44 Z" fill="#DC143C"/><circle cx="54" cy="8" r="7" fill="#FFFFFF"/><circle cx="50" cy="58" r="22" fill="#F5C9A3"/><path d="M 24 62 Q 50 104 76 62 Q 50 76 24 62 Z" fill="#FFFFFF"/><rect x="18" y="40" width="64" height="10" rx="5" fill="#FFFFFF"/></svg>"##
            }
            Glyph::Snowflake => {
                r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><g stroke="#DDF3FF" stroke-width="7" stroke-linecap="round"><line x1="50" y1="6" x2="50" y2="94"/><line x1="12" y1="28" x2="88" y2="72"/><line x1="12" y1="72" x2="88" y2="28"/></g></svg>"##
            }
            Glyph::Bell => {
                r##"<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><path d="M 50 8 C 26 8 24 34 24 54 L 12 78 L 88 78 L 76 54 C 76 34 74 8 50 8 Z" fill="#FFD700"/><circle cx="50" cy="86" r="9" fill="#DAA520"/></svg>"##
            }
        }
    }

    /// The emoji artwork when available, the vector artwork otherwise.
    pub fn source(self) -> SvgSource {
        #[cfg(feature = "twemoji")]
        let emoji = SvgSource::from_emoji(self.emoji());
        #[cfg(not(feature = "twemoji"))]
        let emoji: Option<SvgSource> = None;

        emoji.unwrap_or_else(|| SvgSource::from_svg(self.vector()))
    }
}

// ============================================================================
// FrameConfig
// ============================================================================

/// Configuration for the frame overlay.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameConfig {
    /// Band thickness: height of top/bottom bands, width of side bands.
    pub thickness: f32,
    /// Width of the gold edge along each band's inner side.
    pub edge_width: f32,
    pub band_color: Srgb<u8>,
    pub edge_color: Srgb<u8>,
    /// Glyph size on the top and bottom bands.
    pub glyph_size: f32,
    /// Glyph size on the side bands.
    pub side_glyph_size: f32,
    pub corner_glyph_size: f32,
    /// Offset of corner glyphs from the canvas edges.
    pub corner_inset: f32,
    pub top: Vec<Glyph>,
    pub bottom: Vec<Glyph>,
    /// Used for both the left and right bands.
    pub sides: Vec<Glyph>,
    /// Top-left, top-right, bottom-left, bottom-right.
    pub corners: [Glyph; 4],
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            thickness: 45.0,
            edge_width: 3.0,
            band_color: Srgb::new(0x16, 0x5B, 0x33),
            edge_color: Srgb::new(0xFF, 0xD7, 0x00),
            glyph_size: 26.0,
            side_glyph_size: 22.0,
            corner_glyph_size: 36.0,
            corner_inset: 4.0,
            top: vec![Glyph::Tree, Glyph::Star, Glyph::Gift, Glyph::Tree],
            bottom: vec![Glyph::Santa, Glyph::Snowflake, Glyph::Bell, Glyph::Santa],
            sides: vec![Glyph::Tree, Glyph::Star, Glyph::Gift],
            corners: [Glyph::Tree, Glyph::Tree, Glyph::Gift, Glyph::Gift],
        }
    }
}

impl LayerConfig for FrameConfig {
    fn differs_from(&self, other: &Self) -> bool {
        self != other
    }
}

// ============================================================================
// Layout
// ============================================================================

/// An axis-aligned rectangle in canvas pixels.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Band {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// A glyph's square box in canvas pixels, by top-left corner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphPlacement {
    pub glyph: Glyph,
    pub x: f32,
    pub y: f32,
    pub size: f32,
}

/// Everything the frame draws for one canvas size.
#[derive(Debug, Clone, PartialEq)]
pub struct FrameLayout {
    /// Top, bottom, left, right.
    pub bands: [Band; 4],
    /// The gold edge strip of each band, same order.
    pub edges: [Band; 4],
    pub glyphs: Vec<GlyphPlacement>,
}

/// Offsets of `count` items of `item` length spread along `length` with
/// equal space around each item.
fn space_around(length: f32, item: f32, count: usize) -> Vec<f32> {
    if count == 0 {
        return Vec::new();
    }
    let gap = (length - item * count as f32) / count as f32;
    (0..count)
        .map(|i| gap / 2.0 + i as f32 * (item + gap))
        .collect()
}

impl FrameConfig {
    /// Lays out bands, edges and glyphs. `None` for an empty canvas.
    pub fn layout(&self, size: SizePx) -> Option<FrameLayout> {
        if size.is_empty() {
            return None;
        }
        let (w, h) = (size.width as f32, size.height as f32);
        let t = self.thickness;
        let e = self.edge_width;
        let side_len = (h - 2.0 * t).max(0.0);

        let bands = [
            Band { x: 0.0, y: 0.0, width: w, height: t },
            Band { x: 0.0, y: h - t, width: w, height: t },
            Band { x: 0.0, y: t, width: t, height: side_len },
            Band { x: w - t, y: t, width: t, height: side_len },
        ];
        let edges = [
            Band { x: 0.0, y: t - e, width: w, height: e },
            Band { x: 0.0, y: h - t, width: w, height: e },
            Band { x: t - e, y: t, width: e, height: side_len },
            Band { x: w - t, y: t, width: e, height: side_len },
        ];

        let mut glyphs = Vec::new();

        // Horizontal bands center glyphs in the part not covered by the edge.
        let s = self.glyph_size;
        let top_y = (t - e - s) / 2.0;
        let bottom_y = h - t + e + (t - e - s) / 2.0;
        for (glyph, x) in self.top.iter().zip(space_around(w, s, self.top.len())) {
            glyphs.push(GlyphPlacement { glyph: *glyph, x, y: top_y, size: s });
        }
        for (glyph, x) in self.bottom.iter().zip(space_around(w, s, self.bottom.len())) {
            glyphs.push(GlyphPlacement { glyph: *glyph, x, y: bottom_y, size: s });
        }

        let s = self.side_glyph_size;
        let left_x = (t - e - s) / 2.0;
        let right_x = w - t + e + (t - e - s) / 2.0;
        for (glyph, dy) in self.sides.iter().zip(space_around(side_len, s, self.sides.len())) {
            glyphs.push(GlyphPlacement { glyph: *glyph, x: left_x, y: t + dy, size: s });
        }
        for (glyph, dy) in self.sides.iter().zip(space_around(side_len, s, self.sides.len())) {
            glyphs.push(GlyphPlacement { glyph: *glyph, x: right_x, y: t + dy, size: s });
        }

        let s = self.corner_glyph_size;
        let i = self.corner_inset;
        let corners = [(i, i), (w - i - s, i), (i, h - i - s), (w - i - s, h - i - s)];
        for (glyph, (x, y)) in self.corners.iter().zip(corners) {
            glyphs.push(GlyphPlacement { glyph: *glyph, x, y, size: s });
        }

        Some(FrameLayout { bands, edges, glyphs })
    }
}

impl LayerEffect for FrameConfig {
    type Scene = FrameLayout;

    const ANIMATED: bool = false;

    fn mount(&self, size: SizePx, _animator: &Animator) -> FrameLayout {
        self.layout(size).unwrap_or(FrameLayout {
            bands: [Band { x: 0.0, y: 0.0, width: 0.0, height: 0.0 }; 4],
            edges: [Band { x: 0.0, y: 0.0, width: 0.0, height: 0.0 }; 4],
            glyphs: Vec::new(),
        })
    }

    /// Bands and edges only; glyphs are rasterised separately in [`draw`](Self::draw).
    fn markup(&self, scene: &FrameLayout, _size: SizePx) -> String {
        let mut out = String::new();
        let fills = [
            (&scene.bands, hex((self.band_color.red, self.band_color.green, self.band_color.blue))),
            (&scene.edges, hex((self.edge_color.red, self.edge_color.green, self.edge_color.blue))),
        ];
        for (rects, fill) in fills {
            for r in rects.iter().filter(|r| r.width > 0.0 && r.height > 0.0) {
                let _ = write!(
                    out,
                    r#"<rect x="{:.2}" y="{:.2}" width="{:.2}" height="{:.2}" fill="{fill}"/>"#,
                    r.x, r.y, r.width, r.height
                );
            }
        }
        out
    }

    fn draw(&self, scene: &FrameLayout, size: SizePx) -> Option<RgbaImage> {
        let mut canvas = render_canvas(&document(size, &self.markup(scene, size)), size)?;

        for placement in &scene.glyphs {
            let px = placement.size.round() as u32;
            if px == 0 {
                continue;
            }
            let Some(glyph) = render_source(&placement.glyph.source(), px) else {
                tracing::warn!(glyph = ?placement.glyph, "frame glyph failed to render");
                continue;
            };
            composite_over(
                &mut canvas,
                &glyph,
                placement.x.round() as i32,
                placement.y.round() as i32,
            );
        }

        Some(canvas)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn layout(w: u32, h: u32) -> FrameLayout {
        FrameConfig::default().layout(SizePx::new(w, h)).unwrap()
    }

    #[test]
    fn bands_hug_the_edges() {
        let frame = layout(400, 300);
        assert_eq!(frame.bands[0], Band { x: 0.0, y: 0.0, width: 400.0, height: 45.0 });
        assert_eq!(frame.bands[1], Band { x: 0.0, y: 255.0, width: 400.0, height: 45.0 });
        assert_eq!(frame.bands[2], Band { x: 0.0, y: 45.0, width: 45.0, height: 210.0 });
        assert_eq!(frame.bands[3], Band { x: 355.0, y: 45.0, width: 45.0, height: 210.0 });
    }

    #[test]
    fn gold_edges_face_inward() {
        let frame = layout(400, 300);
        assert_eq!(frame.edges[0].y, 42.0);
        assert_eq!(frame.edges[1].y, 255.0);
        assert_eq!(frame.edges[2].x, 42.0);
        assert_eq!(frame.edges[3].x, 355.0);
    }

    #[test]
    fn glyph_counts_per_band() {
        let frame = layout(400, 300);
        let count = |glyph| frame.glyphs.iter().filter(|p| p.glyph == glyph).count();
        // 2 top, 1 per side, 2 corners.
        assert_eq!(count(Glyph::Tree), 6);
        assert_eq!(count(Glyph::Star), 3);
        assert_eq!(count(Glyph::Gift), 5);
        assert_eq!(count(Glyph::Santa), 2);
        assert_eq!(count(Glyph::Snowflake), 1);
        assert_eq!(count(Glyph::Bell), 1);
        assert_eq!(frame.glyphs.len(), 4 + 4 + 3 + 3 + 4);
    }

    #[test]
    fn top_glyphs_are_spaced_around() {
        let frame = layout(400, 300);
        let xs: Vec<f32> = frame.glyphs[..4].iter().map(|p| p.x).collect();
        // (400 - 4 * 26) / 4 = 74 of space per glyph.
        assert_eq!(xs, vec![37.0, 137.0, 237.0, 337.0]);
        assert!(frame.glyphs[..4].iter().all(|p| p.y == 8.0));
    }

    #[test]
    fn corner_glyphs_are_inset() {
        let frame = layout(400, 300);
        let corners: Vec<(f32, f32)> = frame.glyphs[frame.glyphs.len() - 4..]
            .iter()
            .map(|p| (p.x, p.y))
            .collect();
        assert_eq!(corners, vec![(4.0, 4.0), (360.0, 4.0), (4.0, 260.0), (360.0, 260.0)]);
    }

    #[test]
    fn layout_is_deterministic() {
        assert_eq!(layout(321, 123), layout(321, 123));
    }

    #[test]
    fn empty_canvas_has_no_frame() {
        assert!(FrameConfig::default().layout(SizePx::new(0, 10)).is_none());
        assert!(FrameConfig::default().layout(SizePx::new(10, 0)).is_none());
    }

    #[test]
    fn short_canvas_collapses_side_bands() {
        let frame = layout(200, 60);
        assert_eq!(frame.bands[2].height, 0.0);
        let markup = FrameConfig::default().markup(&frame, SizePx::new(200, 60));
        assert_eq!(markup.matches("<rect").count(), 4);
    }

    #[test]
    fn draw_paints_bands_and_leaves_center_clear() {
        let config = FrameConfig::default();
        let size = SizePx::new(300, 240);
        let scene = config.mount(size, &Animator::new());
        let img = config.draw(&scene, size).unwrap();

        // Band colour between the first two top glyphs.
        assert_eq!(img.get_pixel(75, 2).0, [0x16, 0x5B, 0x33, 255]);
        // Gold edge under the top band.
        assert_eq!(img.get_pixel(150, 43).0, [0xFF, 0xD7, 0x00, 255]);
        assert_eq!(img.get_pixel(150, 120)[3], 0);
    }

    #[test]
    fn every_glyph_has_renderable_artwork() {
        for glyph in [
            Glyph::Tree,
            Glyph::Star,
            Glyph::Gift,
            Glyph::Santa,
            Glyph::Snowflake,
            Glyph::Bell,
        ] {
            assert!(render_source(&SvgSource::from_svg(glyph.vector()), 24).is_some());
            assert!(render_source(&glyph.source(), 24).is_some());
        }
    }
}
