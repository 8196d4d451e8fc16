//! Lossy-compression look-alike.
//!
//! Real JPEG quantisation is not attempted. Instead the image is shrunk
//! with a smooth filter and blown back up with nearest-neighbour
//! sampling, which gives the blocky, detail-losing look of a low-quality
//! encode at a fraction of the cost.

use image::imageops::{self, FilterType};

use crate::raster::RasterImage;

/// Smallest per-axis size the intermediate image is shrunk to.
pub const MIN_BLOCK_SIDE: u32 = 8;

/// Fraction of the original size kept per axis at `quality`.
///
/// `quality` is clamped to `1..=100`; the scale is `quality / 100`
/// clamped to `0.2..=1.0`.
#[must_use]
pub fn quality_scale(quality: u8) -> f32 {
    let q = quality.clamp(1, 100);
    (f32::from(q) / 100.0).clamp(0.2, 1.0)
}

/// Intermediate size for one axis: `max(8, round(dim * scale))`.
#[must_use]
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    clippy::cast_precision_loss
)]
pub fn reduced_side(dim: u32, scale: f32) -> u32 {
    let scaled = (f64::from(dim) * f64::from(scale)).round() as u32;
    scaled.max(MIN_BLOCK_SIDE)
}

/// Degrade `image` as if saved at `quality` (1..=100, clamped).
///
/// Downscales to [`reduced_side`] per axis with a triangle filter, then
/// upscales back to the original size with nearest-neighbour sampling.
/// Alpha goes through the same resampling.
#[must_use = "returns the degraded image"]
pub fn compression_artifacts(image: &RasterImage, quality: u8) -> RasterImage {
    let scale = quality_scale(quality);
    let (w, h) = (image.width(), image.height());
    let small = imageops::resize(
        image.as_rgba(),
        reduced_side(w, scale),
        reduced_side(h, scale),
        FilterType::Triangle,
    );
    let restored = imageops::resize(&small, w, h, FilterType::Nearest);
    image.rebuild(|x, y| restored.get_pixel(x, y).0)
}
