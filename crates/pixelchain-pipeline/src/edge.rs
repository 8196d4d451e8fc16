//! Gradient edge detection (Sobel/Prewitt) and a three-level Canny-style
//! edge map.
//!
//! The gradient filters convolve each colour channel separately with a
//! 3x3 kernel pair and report `hypot(gx, gy)` per channel. The Canny
//! variant here is intentionally simple: blur, gradient, then bucket the
//! gradient luminance into 0 / 128 / 255. There is no non-maximum
//! suppression and no hysteresis tracing.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::blur::gaussian_blur;
use crate::catalog::EDGE_OPERATORS;
use crate::raster::{RasterImage, clamp_channel, luminance};
use crate::types::PipelineError;

/// Which 3x3 kernel pair a gradient filter uses.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EdgeOperator {
    /// Centre row/column weighted by 2.
    #[default]
    Sobel,
    /// Uniform weights.
    Prewitt,
}

impl EdgeOperator {
    /// Lower-case name, as stored in stage parameters.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Sobel => "sobel",
            Self::Prewitt => "prewitt",
        }
    }

    /// Horizontal kernel `gx`; the vertical kernel is its transpose.
    const fn horizontal_kernel(self) -> [[i32; 3]; 3] {
        match self {
            Self::Sobel => [[-1, 0, 1], [-2, 0, 2], [-1, 0, 1]],
            Self::Prewitt => [[-1, 0, 1], [-1, 0, 1], [-1, 0, 1]],
        }
    }
}

impl fmt::Display for EdgeOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for EdgeOperator {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        match EDGE_OPERATORS
            .iter()
            .position(|name| name.eq_ignore_ascii_case(wanted))
        {
            Some(0) => Ok(Self::Sobel),
            Some(_) => Ok(Self::Prewitt),
            None => Err(PipelineError::InvalidParameterValue {
                name: "operator".to_string(),
                value: s.to_string(),
            }),
        }
    }
}

/// Per-channel gradient magnitude with the chosen operator.
///
/// Neighbours are read with edge replication, so a uniform region gives
/// zero right up to the border. Each RGB channel becomes
/// `clamp(hypot(gx, gy))`; alpha is copied from the input.
#[must_use = "returns the gradient image"]
#[allow(clippy::cast_precision_loss)]
pub fn gradient_magnitude(image: &RasterImage, operator: EdgeOperator) -> RasterImage {
    let kx = operator.horizontal_kernel();

    image.rebuild(|x, y| {
        let (cx, cy) = (i64::from(x), i64::from(y));
        let mut gx = [0i32; 3];
        let mut gy = [0i32; 3];
        for (row, dy) in (-1..=1).enumerate() {
            for (col, dx) in (-1..=1).enumerate() {
                let wx = kx[row][col];
                // gy is the transpose of gx.
                let wy = kx[col][row];
                if wx == 0 && wy == 0 {
                    continue;
                }
                let px = image.sample(cx + dx, cy + dy);
                for c in 0..3 {
                    let v = i32::from(px[c]);
                    gx[c] += wx * v;
                    gy[c] += wy * v;
                }
            }
        }
        let source = image.pixel(x, y);
        let magnitude = |c: usize| clamp_channel((gx[c] as f32).hypot(gy[c] as f32));
        [magnitude(0), magnitude(1), magnitude(2), source[3]]
    })
}

/// Blur sigma applied before the gradient in [`canny`].
pub const CANNY_SIGMA: f32 = 1.2;

/// Three-level edge map.
///
/// The image is blurred with [`CANNY_SIGMA`], passed through the Sobel
/// [`gradient_magnitude`], and the luminance `L` of each gradient pixel
/// is bucketed: `L < low` gives 0, `low <= L < high` gives 128, and
/// `L >= high` gives 255, written to all three colour channels.
///
/// `low` is clamped to be at most `high`. Alpha is copied from the input.
#[must_use = "returns the edge map"]
pub fn canny(image: &RasterImage, low: u8, high: u8) -> RasterImage {
    let low = low.min(high);
    let gradient = gradient_magnitude(&gaussian_blur(image, CANNY_SIGMA), EdgeOperator::Sobel);

    image.rebuild(|x, y| {
        let l = luminance(gradient.pixel(x, y));
        let v = if l >= high {
            255
        } else if l >= low {
            128
        } else {
            0
        };
        [v, v, v, image.pixel(x, y)[3]]
    })
}
