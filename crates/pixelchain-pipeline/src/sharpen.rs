//! Unsharp-mask sharpening.

use crate::blur::gaussian_blur;
use crate::raster::{RasterImage, clamp_channel};

/// Sharpen by adding back the difference from a Gaussian-blurred copy.
///
/// Per RGB channel: `c' = c + amount * (c - blurred)`, where `blurred`
/// is [`gaussian_blur`] with `sigma = radius`. `amount` is clamped to
/// `0..=2` and `radius` to `0.2..=5`. Alpha is copied from the input.
#[must_use = "returns the sharpened image"]
pub fn unsharp_mask(image: &RasterImage, amount: f32, radius: f32) -> RasterImage {
    let amount = if amount.is_nan() { 0.0 } else { amount.clamp(0.0, 2.0) };
    let radius = if radius.is_nan() { 1.0 } else { radius.clamp(0.2, 5.0) };
    let blurred = gaussian_blur(image, radius);

    image.rebuild(|x, y| {
        let src = image.pixel(x, y);
        let soft = blurred.pixel(x, y);
        let mut out = src;
        for c in 0..3 {
            let v = f32::from(src[c]);
            out[c] = clamp_channel(amount.mul_add(v - f32::from(soft[c]), v));
        }
        out
    })
}
