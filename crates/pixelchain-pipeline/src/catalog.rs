//! Filter catalog: the closed set of filter kinds and their parameter
//! schemas.
//!
//! Every kind lists its parameters as static [`ParamSpec`]s (name,
//! domain, default). The schema is the single source of truth for
//! defaults and for clamping: [`ParamSpec::normalize`] is the write path
//! used by stage creation, `set_param` and preset loading, so a stored
//! parameter is always inside its range.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::types::PipelineError;

/// Every filter the pipeline can run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum FilterKind {
    /// Linear brightness offset and contrast stretch around mid-gray.
    BrightnessContrast,
    /// Power-law tone curve.
    Gamma,
    /// Saturation offset and hue rotation in HSL space.
    SaturationHue,
    /// Luminance binarisation to black/white.
    Threshold,
    /// Box (mean) blur.
    Mean,
    /// Median denoise.
    Median,
    /// Separable Gaussian blur.
    Gaussian,
    /// Unsharp mask.
    Sharpen,
    /// Sobel or Prewitt gradient magnitude.
    Sobel,
    /// Simplified three-level Canny.
    Canny,
    /// Lossy-compression simulation by down/up resampling.
    Jpeg,
}

impl FilterKind {
    /// All kinds in catalog order.
    pub const ALL: [Self; 11] = [
        Self::BrightnessContrast,
        Self::Gamma,
        Self::SaturationHue,
        Self::Threshold,
        Self::Mean,
        Self::Median,
        Self::Gaussian,
        Self::Sharpen,
        Self::Sobel,
        Self::Canny,
        Self::Jpeg,
    ];

    /// Stable identifier used in presets and by [`FromStr`].
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::BrightnessContrast => "brightnessContrast",
            Self::Gamma => "gamma",
            Self::SaturationHue => "saturationHue",
            Self::Threshold => "threshold",
            Self::Mean => "mean",
            Self::Median => "median",
            Self::Gaussian => "gaussian",
            Self::Sharpen => "sharpen",
            Self::Sobel => "sobel",
            Self::Canny => "canny",
            Self::Jpeg => "jpeg",
        }
    }

    /// Human-readable label for UI lists.
    #[must_use]
    pub const fn label(self) -> &'static str {
        match self {
            Self::BrightnessContrast => "Brightness / Contrast",
            Self::Gamma => "Gamma",
            Self::SaturationHue => "Saturation / Hue",
            Self::Threshold => "Threshold",
            Self::Mean => "Mean Blur",
            Self::Median => "Median",
            Self::Gaussian => "Gaussian Blur",
            Self::Sharpen => "Sharpen",
            Self::Sobel => "Sobel / Prewitt",
            Self::Canny => "Canny (simplified)",
            Self::Jpeg => "JPEG Artifacts",
        }
    }

    /// The parameter schema for this kind.
    #[must_use]
    pub const fn params(self) -> &'static [ParamSpec] {
        match self {
            Self::BrightnessContrast => &BRIGHTNESS_CONTRAST,
            Self::Gamma => &GAMMA,
            Self::SaturationHue => &SATURATION_HUE,
            Self::Threshold => &THRESHOLD,
            Self::Mean | Self::Median => &KERNEL,
            Self::Gaussian => &GAUSSIAN,
            Self::Sharpen => &SHARPEN,
            Self::Sobel => &SOBEL,
            Self::Canny => &CANNY,
            Self::Jpeg => &JPEG,
        }
    }

    /// Look up one parameter by name.
    #[must_use]
    pub fn param(self, name: &str) -> Option<&'static ParamSpec> {
        self.params().iter().find(|spec| spec.name == name)
    }

    /// A parameter map holding every schema default.
    #[must_use]
    pub fn default_params(self) -> Params {
        Params(
            self.params()
                .iter()
                .map(|spec| (spec.name.to_string(), spec.default_value()))
                .collect(),
        )
    }

    /// Validate `value` against this kind's schema for `name`, returning
    /// the clamped value that would be stored.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownParameter`] if `name` is not in the
    /// schema, or [`PipelineError::InvalidParameterValue`] if the value
    /// cannot be interpreted (see [`ParamSpec::normalize`]).
    pub fn normalize_param(self, name: &str, value: &ParamValue) -> Result<ParamValue, PipelineError> {
        let spec = self
            .param(name)
            .ok_or_else(|| PipelineError::UnknownParameter {
                kind: self.name().to_string(),
                name: name.to_string(),
            })?;
        spec.normalize(value)
    }
}

impl fmt::Display for FilterKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FilterKind {
    type Err = PipelineError;

    /// Parse a catalog name, ignoring ASCII case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.name().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| PipelineError::InvalidFilterKind(s.to_string()))
    }
}

// ───────────────────────── Schema ──────────────────────────

/// The set of values a parameter may take.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ParamDomain {
    /// Any real number in `min..=max`.
    Float {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// Whole numbers in `min..=max`.
    Integer {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// Odd whole numbers in `min..=max` (both bounds odd).
    OddInteger {
        /// Inclusive lower bound.
        min: f64,
        /// Inclusive upper bound.
        max: f64,
    },
    /// One of a fixed list of names.
    Choice(&'static [&'static str]),
}

/// Schema entry for one filter parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParamSpec {
    /// Parameter name as used by `set_param` and presets.
    pub name: &'static str,
    /// Allowed values.
    pub domain: ParamDomain,
    /// Default value. For [`ParamDomain::Choice`] this is the option index.
    pub default: f64,
}

impl ParamSpec {
    const fn float(name: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self {
            name,
            domain: ParamDomain::Float { min, max },
            default,
        }
    }

    const fn integer(name: &'static str, min: f64, max: f64, default: f64) -> Self {
        Self {
            name,
            domain: ParamDomain::Integer { min, max },
            default,
        }
    }

    /// The default as a stored [`ParamValue`].
    #[must_use]
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
    pub fn default_value(&self) -> ParamValue {
        match self.domain {
            ParamDomain::Choice(options) => {
                ParamValue::Choice(options[self.default as usize].to_string())
            }
            _ => ParamValue::Number(self.default),
        }
    }

    /// Clamp `value` into this parameter's domain.
    ///
    /// Numeric domains clamp into `[min, max]`; integer domains round
    /// first; [`ParamDomain::OddInteger`] then moves even values up to the
    /// next odd value (down when that would leave the range). Infinities
    /// clamp to the nearest bound. A choice domain accepts an option name
    /// (ASCII case-insensitive) or a number, which is rounded and clamped
    /// to an option index. A numeric domain also accepts a choice string
    /// that parses as a number.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidParameterValue`] for NaN, for a
    /// string that is not a known option or a number.
    pub fn normalize(&self, value: &ParamValue) -> Result<ParamValue, PipelineError> {
        let clamped = match self.domain {
            ParamDomain::Choice(options) => return self.normalize_choice(options, value),
            ParamDomain::Float { min, max } => self.numeric(value)?.clamp(min, max),
            ParamDomain::Integer { min, max } => self.numeric(value)?.round().clamp(min, max),
            ParamDomain::OddInteger { min, max } => {
                let k = self.numeric(value)?.round().clamp(min, max);
                if k.rem_euclid(2.0) != 0.0 {
                    k
                } else if k + 1.0 <= max {
                    k + 1.0
                } else {
                    k - 1.0
                }
            }
        };
        Ok(ParamValue::Number(clamped))
    }

    fn invalid(&self, value: &ParamValue) -> PipelineError {
        PipelineError::InvalidParameterValue {
            name: self.name.to_string(),
            value: value.to_string(),
        }
    }

    fn numeric(&self, value: &ParamValue) -> Result<f64, PipelineError> {
        let n = match value {
            ParamValue::Number(n) => *n,
            ParamValue::Choice(s) => s
                .trim()
                .parse::<f64>()
                .map_err(|_| self.invalid(value))?,
        };
        if n.is_nan() {
            return Err(self.invalid(value));
        }
        Ok(n)
    }

    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        clippy::cast_precision_loss
    )]
    fn normalize_choice(
        &self,
        options: &'static [&'static str],
        value: &ParamValue,
    ) -> Result<ParamValue, PipelineError> {
        let option = match value {
            ParamValue::Choice(s) => options
                .iter()
                .find(|opt| opt.eq_ignore_ascii_case(s.trim()))
                .ok_or_else(|| self.invalid(value))?,
            ParamValue::Number(_) => {
                let last = (options.len() - 1) as f64;
                let index = self.numeric(value)?.round().clamp(0.0, last) as usize;
                &options[index]
            }
        };
        Ok(ParamValue::Choice((*option).to_string()))
    }
}

const BRIGHTNESS_CONTRAST: [ParamSpec; 2] = [
    ParamSpec::float("brightness", -100.0, 100.0, 0.0),
    ParamSpec::float("contrast", -100.0, 100.0, 0.0),
];
const GAMMA: [ParamSpec; 1] = [ParamSpec::float("gamma", 0.1, 5.0, 1.0)];
const SATURATION_HUE: [ParamSpec; 2] = [
    ParamSpec::float("saturation", -100.0, 100.0, 0.0),
    ParamSpec::float("hue", -180.0, 180.0, 0.0),
];
const THRESHOLD: [ParamSpec; 1] = [ParamSpec::integer("thresh", 0.0, 255.0, 128.0)];
const KERNEL: [ParamSpec; 1] = [ParamSpec {
    name: "kernel",
    domain: ParamDomain::OddInteger { min: 3.0, max: 9.0 },
    default: 3.0,
}];
const GAUSSIAN: [ParamSpec; 1] = [ParamSpec::float("sigma", 0.1, 5.0, 1.0)];
const SHARPEN: [ParamSpec; 2] = [
    ParamSpec::float("amount", 0.0, 2.0, 0.5),
    ParamSpec::float("radius", 0.2, 5.0, 1.0),
];
/// Option names for the gradient operator, in index order.
pub const EDGE_OPERATORS: &[&str] = &["sobel", "prewitt"];
const SOBEL: [ParamSpec; 1] = [ParamSpec {
    name: "operator",
    domain: ParamDomain::Choice(EDGE_OPERATORS),
    default: 0.0,
}];
const CANNY: [ParamSpec; 2] = [
    ParamSpec::integer("low", 0.0, 255.0, 30.0),
    ParamSpec::integer("high", 0.0, 255.0, 90.0),
];
const JPEG: [ParamSpec; 1] = [ParamSpec::integer("quality", 1.0, 100.0, 70.0)];

// ───────────────────────── Values ──────────────────────────

/// A stored or requested parameter value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParamValue {
    /// Numeric parameter (also accepted for choices, as an option index).
    Number(f64),
    /// Named option of a choice parameter.
    Choice(String),
}

impl ParamValue {
    /// The number, if this is a numeric value.
    #[must_use]
    pub const fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Choice(_) => None,
        }
    }

    /// The option name, if this is a choice value.
    #[must_use]
    pub fn as_choice(&self) -> Option<&str> {
        match self {
            Self::Number(_) => None,
            Self::Choice(s) => Some(s),
        }
    }
}

impl fmt::Display for ParamValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::Choice(s) => f.write_str(s),
        }
    }
}

impl From<f64> for ParamValue {
    fn from(n: f64) -> Self {
        Self::Number(n)
    }
}

impl From<&str> for ParamValue {
    fn from(s: &str) -> Self {
        Self::Choice(s.to_string())
    }
}

/// Parameter values of one stage, keyed by name.
///
/// Only built from a schema ([`FilterKind::default_params`]) and updated
/// through normalized writes, so every entry is in range.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Params(BTreeMap<String, ParamValue>);

impl Params {
    /// The stored value for `name`.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&ParamValue> {
        self.0.get(name)
    }

    /// The numeric value for `name`, if stored and numeric.
    #[must_use]
    pub fn number(&self, name: &str) -> Option<f64> {
        self.get(name).and_then(ParamValue::as_f64)
    }

    /// The choice value for `name`, if stored and a choice.
    #[must_use]
    pub fn choice(&self, name: &str) -> Option<&str> {
        self.get(name).and_then(ParamValue::as_choice)
    }

    /// Iterate over `(name, value)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ParamValue)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of stored parameters.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether no parameters are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub(crate) fn insert(&mut self, name: &str, value: ParamValue) {
        self.0.insert(name.to_string(), value);
    }
}
