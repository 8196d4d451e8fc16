//! Neighbourhood smoothing: mean (box), median, and separable Gaussian.
//!
//! All three see a replicated edge near the border rather than zero
//! padding: the box filter reads through [`RasterImage::sample`], the
//! Gaussian applies the same [`clamp_coord`] rule to its float buffer and
//! the median relies on `imageproc`, which clamps identically. All four
//! channels, alpha included, are filtered.

use crate::raster::{RasterImage, clamp_channel, clamp_coord};

/// Smallest and largest accepted window size.
pub const KERNEL_RANGE: (u32, u32) = (3, 9);

/// Force a window size into `3..=9` and make it odd (even sizes round up).
#[must_use]
pub const fn odd_kernel_size(kernel: u32) -> u32 {
    let k = if kernel < KERNEL_RANGE.0 {
        KERNEL_RANGE.0
    } else if kernel > KERNEL_RANGE.1 {
        KERNEL_RANGE.1
    } else {
        kernel
    };
    if k % 2 == 0 { k + 1 } else { k }
}

/// Average every channel over a `kernel x kernel` window.
#[must_use = "returns the blurred image"]
#[allow(clippy::cast_precision_loss)]
pub fn mean_blur(image: &RasterImage, kernel: u32) -> RasterImage {
    let k = odd_kernel_size(kernel);
    let half = i64::from(k / 2);
    let count = (k * k) as f32;

    image.rebuild(|x, y| {
        let (cx, cy) = (i64::from(x), i64::from(y));
        let mut sums = [0u32; 4];
        for dy in -half..=half {
            for dx in -half..=half {
                let px = image.sample(cx + dx, cy + dy);
                for (sum, &v) in sums.iter_mut().zip(&px) {
                    *sum += u32::from(v);
                }
            }
        }
        sums.map(|sum| clamp_channel(sum as f32 / count))
    })
}

/// Per-channel median over a `kernel x kernel` window.
///
/// Delegates to [`imageproc::filter::median_filter`], which replicates
/// edge pixels the same way [`RasterImage::sample`] does. Window sizes are
/// always odd, so the median is the true middle element.
#[must_use = "returns the filtered image"]
pub fn median_blur(image: &RasterImage, kernel: u32) -> RasterImage {
    let radius = odd_kernel_size(kernel) / 2;
    let filtered = imageproc::filter::median_filter(image.as_rgba(), radius, radius);
    image.rebuild(|x, y| filtered.get_pixel(x, y).0)
}

/// Smallest and largest accepted Gaussian sigma.
pub const SIGMA_RANGE: (f32, f32) = (0.1, 5.0);

/// Normalised 1-D Gaussian weights for `sigma` (clamped to
/// [`SIGMA_RANGE`]).
///
/// The radius is `max(1, round(2 * sigma))`, giving `2 * radius + 1`
/// taps of `exp(-i^2 / (2 sigma^2))` that sum to 1.
#[must_use]
#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
pub fn gaussian_kernel(sigma: f32) -> Vec<f32> {
    let sigma = if sigma.is_nan() {
        SIGMA_RANGE.0
    } else {
        sigma.clamp(SIGMA_RANGE.0, SIGMA_RANGE.1)
    };
    let radius = ((2.0 * sigma).round() as i32).max(1);
    let denom = 2.0 * sigma * sigma;

    #[allow(clippy::cast_precision_loss)]
    let mut weights: Vec<f32> = (-radius..=radius)
        .map(|i| (-((i * i) as f32) / denom).exp())
        .collect();
    let sum: f32 = weights.iter().sum();
    for w in &mut weights {
        *w /= sum;
    }
    weights
}

/// Separable Gaussian blur over all four channels.
///
/// The horizontal pass reads the source through edge-replicate
/// sampling into a float buffer; the vertical pass reads that buffer
/// with the same clamping. Rounding happens once, at the end.
#[must_use = "returns the blurred image"]
#[allow(clippy::cast_possible_wrap)]
pub fn gaussian_blur(image: &RasterImage, sigma: f32) -> RasterImage {
    let weights = gaussian_kernel(sigma);
    let radius = (weights.len() / 2) as i64;
    let (w, h) = (image.width(), image.height());
    let idx = |x: u32, y: u32| (y as usize * w as usize + x as usize) * 4;

    // Horizontal pass.
    let mut horizontal = vec![0.0f32; w as usize * h as usize * 4];
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0.0f32; 4];
            for (i, &weight) in weights.iter().enumerate() {
                let sx = i64::from(x) + i as i64 - radius;
                let px = image.sample(sx, i64::from(y));
                for (a, &v) in acc.iter_mut().zip(&px) {
                    *a = weight.mul_add(f32::from(v), *a);
                }
            }
            let base = idx(x, y);
            horizontal[base..base + 4].copy_from_slice(&acc);
        }
    }

    // Vertical pass.
    image.rebuild(|x, y| {
        let mut acc = [0.0f32; 4];
        for (i, &weight) in weights.iter().enumerate() {
            let sy = clamp_coord(i64::from(y) + i as i64 - radius, h);
            let base = idx(x, sy);
            for (c, a) in acc.iter_mut().enumerate() {
                *a = weight.mul_add(horizontal[base + c], *a);
            }
        }
        acc.map(clamp_channel)
    })
}
