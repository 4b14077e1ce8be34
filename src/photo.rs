//! Photo buffers and display geometry.
//!
//! A [`Photo`] is the RGBA raster overlays are composited onto. The geometry
//! helpers describe where a photo lands inside the fixed display container
//! when scaled with "contain" semantics.

use image::{ImageFormat, RgbaImage};
use std::io::Cursor;

/// A rectangle defined in pixel coordinates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RectPx {
    /// X offset from the left edge of the container
    pub x: u32,
    /// Y offset from the top edge of the container
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl RectPx {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    /// Creates a rectangle starting at origin (0, 0) with the given dimensions.
    pub fn from_size(width: u32, height: u32) -> Self {
        Self { x: 0, y: 0, width, height }
    }

    /// Returns the right edge coordinate (x + width).
    pub fn right(&self) -> u32 {
        self.x + self.width
    }

    /// Returns the bottom edge coordinate (y + height).
    pub fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn size(&self) -> SizePx {
        SizePx::new(self.width, self.height)
    }
}

/// A 2D size in pixel units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct SizePx {
    pub width: u32,
    pub height: u32,
}

impl SizePx {
    pub fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    /// True until layout has produced both a width and a height.
    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    pub fn aspect_ratio(&self) -> Option<f32> {
        if self.is_empty() {
            None
        } else {
            Some(self.width as f32 / self.height as f32)
        }
    }
}

/// Scales `image` to fit entirely inside `container`, preserving aspect
/// ratio, and centers it.
///
/// Returns `None` while either size is still unknown (zero).
pub fn fit_contain(image: SizePx, container: SizePx) -> Option<RectPx> {
    if image.is_empty() || container.is_empty() {
        return None;
    }

    let scale = (container.width as f32 / image.width as f32)
        .min(container.height as f32 / image.height as f32);
    let width = ((image.width as f32 * scale).round() as u32).clamp(1, container.width);
    let height = ((image.height as f32 * scale).round() as u32).clamp(1, container.height);

    Some(RectPx::new(
        (container.width - width) / 2,
        (container.height - height) / 2,
        width,
        height,
    ))
}

// ============================================================================
// Photo
// ============================================================================

/// Errors raised while decoding or encoding photos.
#[derive(Debug, thiserror::Error)]
pub enum PhotoError {
    #[error("failed to decode photo: {0}")]
    Decode(#[source] image::ImageError),

    #[error("failed to encode photo: {0}")]
    Encode(#[source] image::ImageError),
}

/// An RGBA photo that overlays are drawn on.
#[derive(Debug, Clone, PartialEq)]
pub struct Photo {
    pub data: RgbaImage,
}

impl Photo {
    pub fn new(data: RgbaImage) -> Self {
        Self { data }
    }

    /// Decodes any format the `image` crate recognises.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self, PhotoError> {
        let decoded = image::load_from_memory(bytes).map_err(PhotoError::Decode)?;
        Ok(Self::new(decoded.to_rgba8()))
    }

    pub fn dimensions(&self) -> SizePx {
        SizePx::new(self.data.width(), self.data.height())
    }

    pub fn to_png(&self) -> Result<Vec<u8>, PhotoError> {
        let mut out = Cursor::new(Vec::new());
        self.data
            .write_to(&mut out, ImageFormat::Png)
            .map_err(PhotoError::Encode)?;
        Ok(out.into_inner())
    }

    /// Scales the photo to fit `canvas` and centers it on a transparent
    /// canvas of exactly that size. `None` while either size is zero.
    pub fn contained_in(&self, canvas: SizePx) -> Option<Photo> {
        let rect = fit_contain(self.dimensions(), canvas)?;
        let scaled = image::imageops::resize(
            &self.data,
            rect.width,
            rect.height,
            image::imageops::FilterType::Triangle,
        );
        let mut out = RgbaImage::new(canvas.width, canvas.height);
        image::imageops::overlay(&mut out, &scaled, rect.x as i64, rect.y as i64);
        Some(Photo::new(out))
    }

    /// Encodes as JPEG, dropping the alpha channel.
    pub fn to_jpeg(&self) -> Result<Vec<u8>, PhotoError> {
        let rgb = image::DynamicImage::ImageRgba8(self.data.clone()).to_rgb8();
        let mut out = Cursor::new(Vec::new());
        rgb.write_to(&mut out, ImageFormat::Jpeg)
            .map_err(PhotoError::Encode)?;
        Ok(out.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rect_px_edges() {
        let rect = RectPx::new(10, 20, 100, 200);
        assert_eq!(rect.right(), 110);
        assert_eq!(rect.bottom(), 220);
        assert_eq!(rect.size(), SizePx::new(100, 200));
    }

    #[test]
    fn contain_fit_letterboxes_wide_image() {
        let fitted = fit_contain(SizePx::new(4000, 2000), SizePx::new(400, 400)).unwrap();
        assert_eq!(fitted, RectPx::new(0, 100, 400, 200));
    }

    #[test]
    fn contain_fit_pillarboxes_tall_image() {
        let fitted = fit_contain(SizePx::new(300, 600), SizePx::new(400, 400)).unwrap();
        assert_eq!(fitted, RectPx::new(100, 0, 200, 400));
    }

    #[test]
    fn contain_fit_preserves_aspect_ratio() {
        let image = SizePx::new(1600, 1200);
        let fitted = fit_contain(image, SizePx::new(350, 400)).unwrap();
        let ratio = fitted.size().aspect_ratio().unwrap();
        assert!((ratio - image.aspect_ratio().unwrap()).abs() < 0.01);
        assert_eq!(fitted.width, 350);
    }

    #[test]
    fn contain_fit_needs_both_sizes() {
        assert!(fit_contain(SizePx::new(0, 0), SizePx::new(400, 400)).is_none());
        assert!(fit_contain(SizePx::new(100, 100), SizePx::new(400, 0)).is_none());
    }

    #[test]
    fn png_round_trip_keeps_dimensions() {
        let photo = Photo::new(RgbaImage::from_pixel(8, 6, image::Rgba([10, 20, 30, 255])));
        let bytes = photo.to_png().unwrap();
        let decoded = Photo::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.dimensions(), SizePx::new(8, 6));
        assert_eq!(decoded.data.get_pixel(3, 3).0, [10, 20, 30, 255]);
    }

    #[test]
    fn contained_photo_is_letterboxed() {
        let photo = Photo::new(RgbaImage::from_pixel(40, 20, image::Rgba([200, 0, 0, 255])));
        let boxed = photo.contained_in(SizePx::new(40, 40)).unwrap();
        assert_eq!(boxed.dimensions(), SizePx::new(40, 40));
        assert_eq!(boxed.data.get_pixel(20, 2)[3], 0);
        assert_eq!(boxed.data.get_pixel(20, 20).0, [200, 0, 0, 255]);
        assert!(photo.contained_in(SizePx::new(0, 40)).is_none());
    }

    #[test]
    fn garbage_bytes_fail_to_decode() {
        assert!(matches!(
            Photo::from_bytes(b"not an image"),
            Err(PhotoError::Decode(_))
        ));
    }
}
