//! Typed filters and the dispatch from catalog kinds to algorithms.
//!
//! [`Filter`] is the strongly-typed form of a stage: one variant per
//! [`FilterKind`] carrying its parameters as plain numbers. Every
//! algorithm it dispatches to is a pure `&RasterImage -> RasterImage`
//! function that clamps its own arguments, so a `Filter` built by hand
//! behaves exactly like one read from a stage.

use crate::catalog::{FilterKind, Params};
use crate::edge::EdgeOperator;
use crate::raster::RasterImage;

/// A fully-parameterised filter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Filter {
    /// See [`crate::tone::brightness_contrast`].
    BrightnessContrast {
        /// -100..=100, 100 adds a full 255 offset.
        brightness: f32,
        /// -100..=100, 0 is identity.
        contrast: f32,
    },
    /// See [`crate::tone::gamma`].
    Gamma {
        /// 0.1..=5.0, 1.0 is identity.
        gamma: f32,
    },
    /// See [`crate::color::saturation_hue`].
    SaturationHue {
        /// -100..=100 percentage points of HSL saturation.
        saturation: f32,
        /// -180..=180 degrees of hue rotation.
        hue: f32,
    },
    /// See [`crate::tone::threshold`].
    Threshold {
        /// Luminance cut-off.
        thresh: u8,
    },
    /// See [`crate::blur::mean_blur`].
    Mean {
        /// Window size, forced odd in 3..=9.
        kernel: u32,
    },
    /// See [`crate::blur::median_blur`].
    Median {
        /// Window size, forced odd in 3..=9.
        kernel: u32,
    },
    /// See [`crate::blur::gaussian_blur`].
    Gaussian {
        /// Standard deviation, 0.1..=5.0.
        sigma: f32,
    },
    /// See [`crate::sharpen::unsharp_mask`].
    Sharpen {
        /// 0..=2.
        amount: f32,
        /// Blur sigma, 0.2..=5.0.
        radius: f32,
    },
    /// See [`crate::edge::gradient_magnitude`].
    Sobel {
        /// Kernel pair.
        operator: EdgeOperator,
    },
    /// See [`crate::edge::canny`].
    Canny {
        /// Below this luminance the output is 0.
        low: u8,
        /// At or above this luminance the output is 255.
        high: u8,
    },
    /// See [`crate::jpeg::compression_artifacts`].
    Jpeg {
        /// 1..=100.
        quality: u8,
    },
}

impl Filter {
    /// Read a typed filter from a kind and its parameter map.
    ///
    /// Missing or mistyped entries fall back to the schema default, and
    /// numbers are clamped into the schema range.
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn from_params(kind: FilterKind, params: &Params) -> Self {
        let number = |name: &str| -> f64 {
            let default = kind.param(name).map_or(0.0, |spec| spec.default);
            let raw = params.number(name).unwrap_or(default);
            kind.normalize_param(name, &raw.into())
                .ok()
                .and_then(|v| v.as_f64())
                .unwrap_or(default)
        };
        let float = |name: &str| number(name) as f32;
        let byte = |name: &str| number(name).round().clamp(0.0, 255.0) as u8;

        match kind {
            FilterKind::BrightnessContrast => Self::BrightnessContrast {
                brightness: float("brightness"),
                contrast: float("contrast"),
            },
            FilterKind::Gamma => Self::Gamma {
                gamma: float("gamma"),
            },
            FilterKind::SaturationHue => Self::SaturationHue {
                saturation: float("saturation"),
                hue: float("hue"),
            },
            FilterKind::Threshold => Self::Threshold {
                thresh: byte("thresh"),
            },
            FilterKind::Mean => Self::Mean {
                kernel: u32::from(byte("kernel")),
            },
            FilterKind::Median => Self::Median {
                kernel: u32::from(byte("kernel")),
            },
            FilterKind::Gaussian => Self::Gaussian {
                sigma: float("sigma"),
            },
            FilterKind::Sharpen => Self::Sharpen {
                amount: float("amount"),
                radius: float("radius"),
            },
            FilterKind::Sobel => Self::Sobel {
                operator: params
                    .choice("operator")
                    .and_then(|s| s.parse().ok())
                    .unwrap_or_default(),
            },
            FilterKind::Canny => Self::Canny {
                low: byte("low"),
                high: byte("high"),
            },
            FilterKind::Jpeg => Self::Jpeg {
                quality: byte("quality"),
            },
        }
    }

    /// The catalog kind of this filter.
    #[must_use]
    pub const fn kind(&self) -> FilterKind {
        match self {
            Self::BrightnessContrast { .. } => FilterKind::BrightnessContrast,
            Self::Gamma { .. } => FilterKind::Gamma,
            Self::SaturationHue { .. } => FilterKind::SaturationHue,
            Self::Threshold { .. } => FilterKind::Threshold,
            Self::Mean { .. } => FilterKind::Mean,
            Self::Median { .. } => FilterKind::Median,
            Self::Gaussian { .. } => FilterKind::Gaussian,
            Self::Sharpen { .. } => FilterKind::Sharpen,
            Self::Sobel { .. } => FilterKind::Sobel,
            Self::Canny { .. } => FilterKind::Canny,
            Self::Jpeg { .. } => FilterKind::Jpeg,
        }
    }

    /// Run the filter. The output always has the input's dimensions.
    #[must_use = "returns the filtered image"]
    pub fn apply(&self, image: &RasterImage) -> RasterImage {
        match *self {
            Self::BrightnessContrast {
                brightness,
                contrast,
            } => crate::tone::brightness_contrast(image, brightness, contrast),
            Self::Gamma { gamma } => crate::tone::gamma(image, gamma),
            Self::SaturationHue { saturation, hue } => {
                crate::color::saturation_hue(image, saturation, hue)
            }
            Self::Threshold { thresh } => crate::tone::threshold(image, thresh),
            Self::Mean { kernel } => crate::blur::mean_blur(image, kernel),
            Self::Median { kernel } => crate::blur::median_blur(image, kernel),
            Self::Gaussian { sigma } => crate::blur::gaussian_blur(image, sigma),
            Self::Sharpen { amount, radius } => {
                crate::sharpen::unsharp_mask(image, amount, radius)
            }
            Self::Sobel { operator } => crate::edge::gradient_magnitude(image, operator),
            Self::Canny { low, high } => crate::edge::canny(image, low, high),
            Self::Jpeg { quality } => crate::jpeg::compression_artifacts(image, quality),
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::catalog::ParamValue;

    #[test]
    fn defaults_produce_expected_filters() {
        let expected = [
            Filter::BrightnessContrast {
                brightness: 0.0,
                contrast: 0.0,
            },
            Filter::Gamma { gamma: 1.0 },
            Filter::SaturationHue {
                saturation: 0.0,
                hue: 0.0,
            },
            Filter::Threshold { thresh: 128 },
            Filter::Mean { kernel: 3 },
            Filter::Median { kernel: 3 },
            Filter::Gaussian { sigma: 1.0 },
            Filter::Sharpen {
                amount: 0.5,
                radius: 1.0,
            },
            Filter::Sobel {
                operator: EdgeOperator::Sobel,
            },
            Filter::Canny { low: 30, high: 90 },
            Filter::Jpeg { quality: 70 },
        ];
        for (kind, want) in FilterKind::ALL.into_iter().zip(expected) {
            let got = Filter::from_params(kind, &kind.default_params());
            assert_eq!(got, want, "{kind}");
            assert_eq!(got.kind(), kind);
        }
    }

    #[test]
    fn missing_params_fall_back_to_defaults() {
        let filter = Filter::from_params(FilterKind::Jpeg, &Params::default());
        assert_eq!(filter, Filter::Jpeg { quality: 70 });
    }

    #[test]
    fn out_of_range_params_are_clamped_on_read() {
        let mut params = Params::default();
        params.insert("kernel", ParamValue::Number(12.0));
        assert_eq!(
            Filter::from_params(FilterKind::Median, &params),
            Filter::Median { kernel: 9 }
        );
    }

    #[test]
    fn prewitt_choice_is_read() {
        let mut params = FilterKind::Sobel.default_params();
        params.insert("operator", ParamValue::Choice("prewitt".to_string()));
        assert_eq!(
            Filter::from_params(FilterKind::Sobel, &params),
            Filter::Sobel {
                operator: EdgeOperator::Prewitt
            }
        );
    }

    #[test]
    fn every_filter_preserves_dimensions() {
        let img = RasterImage::from_fn(7, 5, |x, y| {
            #[allow(clippy::cast_possible_truncation)]
            let v = (x * 30 + y * 11) as u8;
            [v, v / 2, 255 - v, 200]
        })
        .unwrap();
        for kind in FilterKind::ALL {
            let out = Filter::from_params(kind, &kind.default_params()).apply(&img);
            assert_eq!(out.dimensions(), img.dimensions(), "{kind}");
        }
    }
}
