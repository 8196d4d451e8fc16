//! The raster buffer every filter reads and writes.
//!
//! [`RasterImage`] wraps an [`image::RgbaImage`] and adds the two
//! guarantees the engine relies on: the image is never empty (at least
//! 1x1), and the buffer is always exactly `4 * width * height` bytes.
//! Images are immutable once built; filters produce new images.
//!
//! The boundary helpers live here too. Spatial filters read neighbours
//! through [`RasterImage::sample`], so out-of-range coordinates are
//! edge-replicated. [`clamp_channel`] is the only
//! way floating-point channel math is turned back into bytes.

use crate::types::{Dimensions, PipelineError, RgbaImage};

/// Rec. 709 luma weights shared by threshold, canny and the histogram.
pub const LUMA_WEIGHTS: [f32; 3] = [0.2126, 0.7152, 0.0722];

/// One pixel as `[red, green, blue, alpha]`.
pub type Pixel = [u8; 4];

/// Round a floating-point channel value and clamp it into `0..=255`.
///
/// NaN maps to 0. Every filter stores its output through this function.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_channel(value: f32) -> u8 {
    if value.is_nan() {
        return 0;
    }
    value.round().clamp(0.0, 255.0) as u8
}

/// Rounded Rec. 709 luminance of a pixel, ignoring alpha.
#[must_use]
pub fn luminance(pixel: Pixel) -> u8 {
    let [r, g, b, _] = pixel;
    clamp_channel(
        LUMA_WEIGHTS[0].mul_add(
            f32::from(r),
            LUMA_WEIGHTS[1].mul_add(f32::from(g), LUMA_WEIGHTS[2] * f32::from(b)),
        ),
    )
}

/// Clamp a signed coordinate into `0..len` (edge-replicate).
///
/// `len` must be non-zero, which [`RasterImage`] guarantees for both axes.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn clamp_coord(value: i64, len: u32) -> u32 {
    value.clamp(0, i64::from(len) - 1) as u32
}

/// An RGBA8 image of at least 1x1 pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RasterImage(RgbaImage);

impl RasterImage {
    /// Wrap a decoded image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyImage`] if either dimension is zero.
    pub fn new(image: RgbaImage) -> Result<Self, PipelineError> {
        if image.width() == 0 || image.height() == 0 {
            return Err(PipelineError::EmptyImage);
        }
        Ok(Self(image))
    }

    /// Build an image from a raw row-major RGBA byte buffer.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyImage`] if either dimension is zero
    /// and [`PipelineError::BufferSizeMismatch`] if `data` is not exactly
    /// `4 * width * height` bytes long.
    pub fn from_raw(width: u32, height: u32, data: Vec<u8>) -> Result<Self, PipelineError> {
        if width == 0 || height == 0 {
            return Err(PipelineError::EmptyImage);
        }
        let expected = 4 * width as usize * height as usize;
        if data.len() != expected {
            return Err(PipelineError::BufferSizeMismatch {
                expected,
                actual: data.len(),
            });
        }
        RgbaImage::from_raw(width, height, data)
            .map(Self)
            .ok_or(PipelineError::BufferSizeMismatch {
                expected,
                actual: 0,
            })
    }

    /// Build an image by evaluating `f` at every coordinate.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyImage`] if either dimension is zero.
    pub fn from_fn(
        width: u32,
        height: u32,
        mut f: impl FnMut(u32, u32) -> Pixel,
    ) -> Result<Self, PipelineError> {
        Self::new(RgbaImage::from_fn(width, height, |x, y| {
            image::Rgba(f(x, y))
        }))
    }

    /// Build a uniformly coloured image.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::EmptyImage`] if either dimension is zero.
    pub fn from_pixel(width: u32, height: u32, pixel: Pixel) -> Result<Self, PipelineError> {
        Self::new(RgbaImage::from_pixel(width, height, image::Rgba(pixel)))
    }

    /// Build a new image with the same dimensions as `self`, evaluating
    /// `f` at every coordinate.
    #[must_use]
    pub fn rebuild(&self, mut f: impl FnMut(u32, u32) -> Pixel) -> Self {
        Self(RgbaImage::from_fn(self.width(), self.height(), |x, y| {
            image::Rgba(f(x, y))
        }))
    }

    /// Build a new image by transforming every pixel independently.
    #[must_use]
    pub fn map_pixels(&self, mut f: impl FnMut(Pixel) -> Pixel) -> Self {
        self.rebuild(|x, y| f(self.pixel(x, y)))
    }

    /// Width in pixels (always at least 1).
    #[must_use]
    pub fn width(&self) -> u32 {
        self.0.width()
    }

    /// Height in pixels (always at least 1).
    #[must_use]
    pub fn height(&self) -> u32 {
        self.0.height()
    }

    /// Width and height together.
    #[must_use]
    pub fn dimensions(&self) -> Dimensions {
        Dimensions {
            width: self.width(),
            height: self.height(),
        }
    }

    /// The pixel at an in-bounds coordinate.
    ///
    /// Out-of-range coordinates are clamped to the nearest edge, exactly
    /// as [`sample`](Self::sample) does.
    #[must_use]
    pub fn pixel(&self, x: u32, y: u32) -> Pixel {
        self.sample(i64::from(x), i64::from(y))
    }

    /// The pixel at `(x, y)` with edge-replicate boundary handling.
    ///
    /// `x` is clamped to `[0, width - 1]` and `y` to `[0, height - 1]`.
    #[must_use]
    pub fn sample(&self, x: i64, y: i64) -> Pixel {
        let cx = clamp_coord(x, self.width());
        let cy = clamp_coord(y, self.height());
        self.0.get_pixel(cx, cy).0
    }

    /// The raw row-major RGBA bytes.
    #[must_use]
    pub fn as_raw(&self) -> &[u8] {
        self.0.as_raw()
    }

    /// Borrow as an [`RgbaImage`].
    #[must_use]
    pub const fn as_rgba(&self) -> &RgbaImage {
        &self.0
    }

    /// Unwrap into the underlying [`RgbaImage`].
    #[must_use]
    pub fn into_rgba(self) -> RgbaImage {
        self.0
    }
}

impl TryFrom<RgbaImage> for RasterImage {
    type Error = PipelineError;

    fn try_from(image: RgbaImage) -> Result<Self, Self::Error> {
        Self::new(image)
    }
}

impl From<RasterImage> for RgbaImage {
    fn from(raster: RasterImage) -> Self {
        raster.0
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn numbered_3x2() -> RasterImage {
        // Red channel encodes the pixel index so samples are easy to check.
        RasterImage::from_fn(3, 2, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let i = (y * 3 + x) as u8;
            [i, 0, 0, 255]
        })
        .unwrap()
    }

    #[test]
    fn clamp_channel_rounds_half_away_from_zero() {
        assert_eq!(clamp_channel(127.5), 128);
        assert_eq!(clamp_channel(127.49), 127);
    }

    #[test]
    fn clamp_channel_saturates() {
        assert_eq!(clamp_channel(-40.0), 0);
        assert_eq!(clamp_channel(300.0), 255);
        assert_eq!(clamp_channel(f32::INFINITY), 255);
        assert_eq!(clamp_channel(f32::NEG_INFINITY), 0);
    }

    #[test]
    fn clamp_channel_nan_is_zero() {
        assert_eq!(clamp_channel(f32::NAN), 0);
    }

    #[test]
    fn luminance_of_primaries_orders_green_red_blue() {
        let r = luminance([255, 0, 0, 255]);
        let g = luminance([0, 255, 0, 255]);
        let b = luminance([0, 0, 255, 255]);
        assert_eq!((r, g, b), (54, 182, 18));
    }

    #[test]
    fn luminance_of_gray_is_identity() {
        for v in [0u8, 1, 77, 128, 254, 255] {
            assert_eq!(luminance([v, v, v, 0]), v);
        }
    }

    #[test]
    fn empty_dimensions_rejected() {
        assert_eq!(
            RasterImage::from_pixel(0, 4, [0; 4]),
            Err(PipelineError::EmptyImage)
        );
        assert_eq!(
            RasterImage::new(RgbaImage::new(4, 0)),
            Err(PipelineError::EmptyImage)
        );
    }

    #[test]
    fn from_raw_checks_buffer_length() {
        let result = RasterImage::from_raw(2, 2, vec![0; 15]);
        assert_eq!(
            result,
            Err(PipelineError::BufferSizeMismatch {
                expected: 16,
                actual: 15,
            })
        );
        assert!(RasterImage::from_raw(2, 2, vec![0; 16]).is_ok());
    }

    #[test]
    fn sample_in_bounds_matches_pixel() {
        let img = numbered_3x2();
        assert_eq!(img.sample(2, 1)[0], 5);
        assert_eq!(img.pixel(1, 0)[0], 1);
    }

    #[test]
    fn sample_replicates_edges() {
        let img = numbered_3x2();
        assert_eq!(img.sample(-1, 0)[0], 0);
        assert_eq!(img.sample(-100, -100)[0], 0);
        assert_eq!(img.sample(3, 0)[0], 2);
        assert_eq!(img.sample(99, 99)[0], 5);
        assert_eq!(img.sample(1, -5)[0], 1);
        assert_eq!(img.sample(1, 7)[0], 4);
    }

    #[test]
    fn clone_is_independent() {
        let img = numbered_3x2();
        let copy = img.clone();
        let changed = copy.map_pixels(|[r, g, b, a]| [r, g, b.wrapping_add(1), a]);
        assert_ne!(img, changed);
        assert_eq!(img, numbered_3x2());
    }

    #[test]
    fn raw_length_is_four_bytes_per_pixel() {
        let img = RasterImage::from_pixel(5, 3, [1, 2, 3, 4]).unwrap();
        assert_eq!(img.as_raw().len(), 4 * 5 * 3);
        assert_eq!(img.dimensions().pixel_count(), 15);
    }
}
