//! Per-pixel tone adjustments: brightness/contrast, gamma, threshold.
//!
//! These operate on each channel independently, so the curve for each
//! is evaluated once into a 256-entry lookup table and then mapped
//! over the image. Alpha is never touched.

use crate::raster::{RasterImage, clamp_channel, luminance};

/// Evaluate a channel curve at every 8-bit input value.
fn lookup_table(curve: impl Fn(f32) -> f32) -> [u8; 256] {
    std::array::from_fn(|i| {
        #[allow(clippy::cast_possible_truncation)]
        let v = f32::from(i as u8);
        clamp_channel(curve(v))
    })
}

/// Map the RGB channels through a lookup table, keeping alpha.
fn apply_rgb_table(image: &RasterImage, table: &[u8; 256]) -> RasterImage {
    image.map_pixels(|[r, g, b, a]| {
        [
            table[usize::from(r)],
            table[usize::from(g)],
            table[usize::from(b)],
            a,
        ]
    })
}

/// Linear brightness offset and contrast stretch around 128.
///
/// Per RGB channel: `c' = f*c + 128*(1 - f) + o` with
/// `f = contrast/100 + 1` and `o = brightness/100 * 255`. Both inputs
/// are clamped to `-100..=100`; `(0, 0)` is the identity.
#[must_use = "returns the adjusted image"]
pub fn brightness_contrast(image: &RasterImage, brightness: f32, contrast: f32) -> RasterImage {
    let brightness = brightness.clamp(-100.0, 100.0);
    let contrast = contrast.clamp(-100.0, 100.0);
    let factor = contrast / 100.0 + 1.0;
    let offset = brightness / 100.0 * 255.0;
    let table = lookup_table(|c| factor.mul_add(c, 128.0f32.mul_add(1.0 - factor, offset)));
    apply_rgb_table(image, &table)
}

/// Power-law curve `c' = 255 * (c/255)^(1/g)`, with `g` clamped to
/// `0.1..=5.0`. Values above 1 brighten the midtones.
#[must_use = "returns the adjusted image"]
pub fn gamma(image: &RasterImage, gamma: f32) -> RasterImage {
    let g = if gamma.is_nan() { 1.0 } else { gamma.clamp(0.1, 5.0) };
    let exponent = 1.0 / g;
    let table = lookup_table(|c| 255.0 * (c / 255.0).powf(exponent));
    apply_rgb_table(image, &table)
}

/// Binarise on Rec. 709 luminance: black below `thresh`, white otherwise.
///
/// All three colour channels of an output pixel are equal.
#[must_use = "returns the binary image"]
pub fn threshold(image: &RasterImage, thresh: u8) -> RasterImage {
    image.map_pixels(|pixel| {
        let v = if luminance(pixel) < thresh { 0 } else { 255 };
        [v, v, v, pixel[3]]
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    /// 16x4 image: red ramps left to right, green top to bottom, blue
    /// fixed, alpha varying so tests can check alpha is untouched.
    #[allow(clippy::cast_possible_truncation)]
    fn gradient() -> RasterImage {
        RasterImage::from_fn(16, 4, |x, y| [(x * 17) as u8, (y * 85) as u8, 60, (100 + x) as u8])
            .unwrap()
    }

    fn max_channel_diff(a: &RasterImage, b: &RasterImage) -> u8 {
        a.as_raw()
            .iter()
            .zip(b.as_raw())
            .map(|(x, y)| x.abs_diff(*y))
            .max()
            .unwrap_or(0)
    }

    #[test]
    fn brightness_contrast_zero_is_identity() {
        let img = gradient();
        assert_eq!(brightness_contrast(&img, 0.0, 0.0), img);
    }

    #[test]
    fn full_brightness_saturates_mid_gray() {
        let img = RasterImage::from_pixel(2, 2, [128, 128, 128, 255]).unwrap();
        let out = brightness_contrast(&img, 100.0, 0.0);
        for px in out.as_raw().chunks_exact(4) {
            assert_eq!(px, [255, 255, 255, 255]);
        }
    }

    #[test]
    fn negative_brightness_darkens() {
        let img = RasterImage::from_pixel(1, 1, [200, 100, 50, 255]).unwrap();
        let out = brightness_contrast(&img, -20.0, 0.0);
        // offset = -51
        assert_eq!(out.pixel(0, 0), [149, 49, 0, 255]);
    }

    #[test]
    fn contrast_pivots_on_128() {
        let img = RasterImage::from_fn(3, 1, |x, _| match x {
            0 => [64, 64, 64, 255],
            1 => [128, 128, 128, 255],
            _ => [192, 192, 192, 255],
        })
        .unwrap();
        let out = brightness_contrast(&img, 0.0, 50.0);
        assert_eq!(out.pixel(0, 0)[0], 32);
        assert_eq!(out.pixel(1, 0)[0], 128);
        assert_eq!(out.pixel(2, 0)[0], 224);
    }

    #[test]
    fn minimum_contrast_flattens_to_gray() {
        let out = brightness_contrast(&gradient(), 0.0, -100.0);
        for px in out.as_raw().chunks_exact(4) {
            assert_eq!(&px[..3], &[128, 128, 128]);
        }
    }

    #[test]
    fn brightness_contrast_inputs_are_clamped() {
        let img = gradient();
        assert_eq!(
            brightness_contrast(&img, 500.0, -900.0),
            brightness_contrast(&img, 100.0, -100.0)
        );
    }

    #[test]
    fn brightness_leaves_alpha_alone() {
        let img = gradient();
        let out = brightness_contrast(&img, 40.0, 30.0);
        for (a, b) in img.as_raw().chunks_exact(4).zip(out.as_raw().chunks_exact(4)) {
            assert_eq!(a[3], b[3]);
        }
    }

    #[test]
    fn gamma_one_is_identity_within_rounding() {
        let img = gradient();
        assert!(max_channel_diff(&gamma(&img, 1.0), &img) <= 1);
    }

    #[test]
    fn gamma_above_one_brightens_midtones() {
        let img = RasterImage::from_pixel(1, 1, [64, 128, 192, 255]).unwrap();
        let out = gamma(&img, 2.0).pixel(0, 0);
        assert!(out[0] > 64 && out[1] > 128 && out[2] > 192, "{out:?}");
        // 255 * (128/255)^0.5 = 180.67
        assert_eq!(out[1], 181);
    }

    #[test]
    fn gamma_keeps_black_and_white_fixed() {
        let img = RasterImage::from_fn(2, 1, |x, _| if x == 0 { [0; 4] } else { [255; 4] }).unwrap();
        for g in [0.1, 0.5, 2.0, 5.0] {
            assert_eq!(gamma(&img, g), img, "gamma {g}");
        }
    }

    #[test]
    fn gamma_is_clamped() {
        let img = gradient();
        assert_eq!(gamma(&img, 0.0), gamma(&img, 0.1));
        assert_eq!(gamma(&img, 50.0), gamma(&img, 5.0));
    }

    #[test]
    fn threshold_output_is_binary() {
        let out = threshold(&gradient(), 128);
        for px in out.as_raw().chunks_exact(4) {
            assert!(px[..3] == [0, 0, 0] || px[..3] == [255, 255, 255], "{px:?}");
        }
    }

    #[test]
    fn threshold_boundary_is_inclusive_white() {
        let img = RasterImage::from_fn(2, 1, |x, _| if x == 0 { [127; 4] } else { [128; 4] }).unwrap();
        let out = threshold(&img, 128);
        assert_eq!(out.pixel(0, 0), [0, 0, 0, 127]);
        assert_eq!(out.pixel(1, 0), [255, 255, 255, 128]);
    }

    #[test]
    fn threshold_uses_luminance_weights() {
        // Pure green (L=182) passes 128, pure red (L=54) does not.
        let img = RasterImage::from_fn(2, 1, |x, _| {
            if x == 0 { [255, 0, 0, 255] } else { [0, 255, 0, 255] }
        })
        .unwrap();
        let out = threshold(&img, 128);
        assert_eq!(out.pixel(0, 0)[0], 0);
        assert_eq!(out.pixel(1, 0)[0], 255);
    }

    #[test]
    fn threshold_zero_is_all_white() {
        let out = threshold(&gradient(), 0);
        assert!(out.as_raw().chunks_exact(4).all(|px| px[..3] == [255, 255, 255]));
    }
}
