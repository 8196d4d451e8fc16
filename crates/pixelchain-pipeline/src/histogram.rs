//! 256-bin luminance histogram.
//!
//! Every pixel is reduced to its Rec. 709 luminance (the same weights the
//! threshold and edge filters use) and counted, so the bins always sum to
//! `width * height`. Bins are `u64`, so no image is too large to count.

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::raster::{RasterImage, luminance};

/// Number of bins, one per 8-bit luminance value.
pub const BIN_COUNT: usize = 256;

/// Luminance counts for one image.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    bins: [u64; BIN_COUNT],
}

impl Histogram {
    /// Wrap raw bin counts.
    #[must_use]
    pub const fn from_bins(bins: [u64; BIN_COUNT]) -> Self {
        Self { bins }
    }

    /// Raw bin counts, indexed by luminance.
    #[must_use]
    pub const fn bins(&self) -> &[u64; BIN_COUNT] {
        &self.bins
    }

    /// Count for one luminance value.
    #[must_use]
    pub const fn count(&self, luma: u8) -> u64 {
        self.bins[luma as usize]
    }

    /// Sum of all bins (the image's pixel count).
    #[must_use]
    pub fn total(&self) -> u64 {
        self.bins.iter().sum()
    }

    /// Largest single bin, for scaling a plot.
    #[must_use]
    pub fn max_count(&self) -> u64 {
        self.bins.iter().copied().max().unwrap_or(0)
    }

    /// Mean luminance, or `None` for an empty histogram.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn mean(&self) -> Option<f64> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let weighted: u64 = (0u64..)
            .zip(&self.bins)
            .map(|(luma, &c)| luma * c)
            .sum();
        Some(weighted as f64 / total as f64)
    }

    /// Smallest luminance at which at least `p` percent of pixels have
    /// been counted. `p` is clamped to `0..=100`; `None` when empty.
    #[must_use]
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    pub fn percentile(&self, p: f64) -> Option<u8> {
        let total = self.total();
        if total == 0 {
            return None;
        }
        let p = if p.is_nan() { 0.0 } else { p.clamp(0.0, 100.0) };
        let target = ((p / 100.0 * total as f64).ceil() as u64).max(1);
        let mut seen = 0u64;
        for (luma, &c) in (0u8..=u8::MAX).zip(&self.bins) {
            seen += c;
            if seen >= target {
                return Some(luma);
            }
        }
        Some(u8::MAX)
    }
}

impl Serialize for Histogram {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.bins.as_slice().serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Histogram {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let bins = Vec::<u64>::deserialize(deserializer)?;
        let len = bins.len();
        let bins: [u64; BIN_COUNT] = bins.try_into().map_err(|_| {
            serde::de::Error::invalid_length(len, &"exactly 256 histogram bins")
        })?;
        Ok(Self { bins })
    }
}

/// Count the luminance of every pixel in `image`.
#[must_use = "returns the histogram"]
pub fn build_histogram(image: &RasterImage) -> Histogram {
    let mut bins = [0u64; BIN_COUNT];
    for px in image.as_rgba().pixels() {
        bins[usize::from(luminance(px.0))] += 1;
    }
    Histogram { bins }
}
