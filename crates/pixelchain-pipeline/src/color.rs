//! Saturation and hue adjustment in HSL space.
//!
//! All three HSL components are kept in `0.0..=1.0` (hue as a fraction
//! of a full turn) so hue rotation is a plain wrap-around add.

use crate::raster::{RasterImage, clamp_channel};

/// Convert normalised RGB (`0.0..=1.0`) to `(hue, saturation, lightness)`,
/// each in `0.0..=1.0`.
#[must_use]
pub fn rgb_to_hsl(r: f32, g: f32, b: f32) -> (f32, f32, f32) {
    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let l = (max + min) / 2.0;
    let d = max - min;

    if d == 0.0 {
        return (0.0, 0.0, l);
    }

    let s = if l > 0.5 {
        d / (2.0 - max - min)
    } else {
        d / (max + min)
    };

    #[allow(clippy::float_cmp)]
    let sector = if max == r {
        (g - b) / d + if g < b { 6.0 } else { 0.0 }
    } else if max == g {
        (b - r) / d + 2.0
    } else {
        (r - g) / d + 4.0
    };

    (sector / 6.0, s, l)
}

/// Convert `(hue, saturation, lightness)` in `0.0..=1.0` back to
/// normalised RGB.
#[must_use]
pub fn hsl_to_rgb(h: f32, s: f32, l: f32) -> (f32, f32, f32) {
    if s == 0.0 {
        return (l, l, l);
    }

    let q = if l < 0.5 {
        l * (1.0 + s)
    } else {
        l.mul_add(-s, l + s)
    };
    let p = 2.0f32.mul_add(l, -q);

    (
        hue_to_channel(p, q, h + 1.0 / 3.0),
        hue_to_channel(p, q, h),
        hue_to_channel(p, q, h - 1.0 / 3.0),
    )
}

fn hue_to_channel(p: f32, q: f32, t: f32) -> f32 {
    let t = t.rem_euclid(1.0);
    if t < 1.0 / 6.0 {
        ((q - p) * 6.0).mul_add(t, p)
    } else if t < 0.5 {
        q
    } else if t < 2.0 / 3.0 {
        ((q - p) * (2.0 / 3.0 - t)).mul_add(6.0, p)
    } else {
        p
    }
}

/// Shift saturation and rotate hue.
///
/// `saturation` (clamped to `-100..=100`) is added to HSL saturation as
/// percentage points, then the result is clamped to `0..=1`. `hue`
/// (clamped to `-180..=180`) rotates by that many degrees. Lightness and
/// alpha are preserved; `(0, 0)` is the identity up to rounding.
#[must_use = "returns the adjusted image"]
pub fn saturation_hue(image: &RasterImage, saturation: f32, hue: f32) -> RasterImage {
    let sat_delta = saturation.clamp(-100.0, 100.0) / 100.0;
    let hue_delta = hue.clamp(-180.0, 180.0) / 360.0;

    image.map_pixels(|[r, g, b, a]| {
        let (h, s, l) = rgb_to_hsl(
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        );
        let h = (h + hue_delta + 1.0).rem_euclid(1.0);
        let s = (s + sat_delta).clamp(0.0, 1.0);
        let (r, g, b) = hsl_to_rgb(h, s, l);
        [
            clamp_channel(r * 255.0),
            clamp_channel(g * 255.0),
            clamp_channel(b * 255.0),
            a,
        ]
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn close(a: f32, b: f32) -> bool {
        (a - b).abs() < 1e-4
    }

    #[allow(clippy::cast_possible_truncation)]
    fn colorful() -> RasterImage {
        RasterImage::from_fn(8, 8, |x, y| {
            [(x * 36) as u8, (y * 36) as u8, ((x + y) * 17) as u8, 255]
        })
        .unwrap()
    }

    #[test]
    fn primaries_to_hsl() {
        let (h, s, l) = rgb_to_hsl(1.0, 0.0, 0.0);
        assert!(close(h, 0.0) && close(s, 1.0) && close(l, 0.5));
        let (h, _, _) = rgb_to_hsl(0.0, 1.0, 0.0);
        assert!(close(h, 1.0 / 3.0));
        let (h, _, _) = rgb_to_hsl(0.0, 0.0, 1.0);
        assert!(close(h, 2.0 / 3.0));
    }

    #[test]
    fn gray_has_zero_saturation() {
        let (h, s, l) = rgb_to_hsl(0.4, 0.4, 0.4);
        assert!(close(h, 0.0) && close(s, 0.0) && close(l, 0.4));
    }

    #[test]
    fn magenta_hue_wraps_below_one() {
        // max == r with g < b lands in the last sector.
        let (h, _, _) = rgb_to_hsl(1.0, 0.0, 1.0);
        assert!(close(h, 5.0 / 6.0), "{h}");
    }

    #[test]
    fn hsl_round_trip() {
        for &(r, g, b) in &[
            (0.2, 0.5, 0.9),
            (0.9, 0.1, 0.3),
            (0.5, 0.5, 0.1),
            (0.05, 0.8, 0.8),
        ] {
            let (h, s, l) = rgb_to_hsl(r, g, b);
            let (r2, g2, b2) = hsl_to_rgb(h, s, l);
            assert!(close(r, r2) && close(g, g2) && close(b, b2), "({r},{g},{b})");
        }
    }

    #[test]
    fn zero_adjustment_is_identity_within_rounding() {
        let img = colorful();
        let out = saturation_hue(&img, 0.0, 0.0);
        for (a, b) in img.as_raw().iter().zip(out.as_raw()) {
            assert!(a.abs_diff(*b) <= 1, "{a} vs {b}");
        }
    }

    #[test]
    fn full_desaturation_produces_gray() {
        let out = saturation_hue(&colorful(), -100.0, 0.0);
        for px in out.as_raw().chunks_exact(4) {
            assert!(px[0] == px[1] && px[1] == px[2], "{px:?}");
        }
    }

    #[test]
    fn hue_rotation_cycles_primaries() {
        let red = RasterImage::from_pixel(1, 1, [255, 0, 0, 255]).unwrap();
        assert_eq!(saturation_hue(&red, 0.0, 120.0).pixel(0, 0), [0, 255, 0, 255]);
        assert_eq!(saturation_hue(&red, 0.0, -120.0).pixel(0, 0), [0, 0, 255, 255]);
    }

    #[test]
    fn half_turn_both_ways_agree() {
        let img = colorful();
        let a = saturation_hue(&img, 0.0, 180.0);
        let b = saturation_hue(&img, 0.0, -180.0);
        for (x, y) in a.as_raw().iter().zip(b.as_raw()) {
            assert!(x.abs_diff(*y) <= 1);
        }
    }

    #[test]
    fn alpha_is_preserved() {
        let img = RasterImage::from_pixel(2, 2, [10, 200, 90, 33]).unwrap();
        let out = saturation_hue(&img, 50.0, 45.0);
        assert!(out.as_raw().chunks_exact(4).all(|px| px[3] == 33));
    }

    #[test]
    fn inputs_are_clamped() {
        let img = colorful();
        assert_eq!(
            saturation_hue(&img, 400.0, 900.0),
            saturation_hue(&img, 100.0, 180.0)
        );
    }
}
