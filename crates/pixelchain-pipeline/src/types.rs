//! Shared types for the pixelchain filter pipeline.

use serde::{Deserialize, Serialize};

use crate::stage::StageId;

/// Re-export `RgbaImage` so downstream crates can hand decoded images
/// to the engine without depending on `image` directly.
pub use image::RgbaImage;

/// Image dimensions in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimensions {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
}

impl Dimensions {
    /// Total number of pixels (`width * height`).
    #[must_use]
    pub const fn pixel_count(self) -> u64 {
        self.width as u64 * self.height as u64
    }
}

impl std::fmt::Display for Dimensions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Errors that can occur while editing or running a pipeline.
///
/// Out-of-range parameter values are deliberately absent: they are
/// clamped into the schema range at write time and never surface as
/// errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PipelineError {
    /// The requested filter kind is not in the catalog.
    #[error("unknown filter kind: {0:?}")]
    InvalidFilterKind(String),

    /// No stage with this id exists in the pipeline.
    #[error("no stage with id {0}")]
    UnknownStage(StageId),

    /// The parameter name is not part of the filter's schema.
    #[error("filter {kind} has no parameter named {name:?}")]
    UnknownParameter {
        /// Catalog name of the filter kind.
        kind: String,
        /// The rejected parameter name.
        name: String,
    },

    /// The value cannot be interpreted for this parameter at all
    /// (a non-finite number, or a choice that is not one of the options).
    #[error("invalid value {value:?} for parameter {name:?}")]
    InvalidParameterValue {
        /// Parameter name.
        name: String,
        /// Textual form of the rejected value.
        value: String,
    },

    /// A raster image must be at least 1x1.
    #[error("raster image must be at least 1x1 pixels")]
    EmptyImage,

    /// A raw pixel buffer does not hold exactly `4 * width * height` bytes.
    #[error("pixel buffer holds {actual} bytes, expected {expected}")]
    BufferSizeMismatch {
        /// Required byte length.
        expected: usize,
        /// Supplied byte length.
        actual: usize,
    },

    /// A filter returned an image whose size differs from its input.
    ///
    /// This is an internal invariant violation, not a user error. The
    /// executor aborts the run when it sees one.
    #[error("stage {stage} changed image size from {expected} to {actual}")]
    DimensionMismatch {
        /// The stage whose filter misbehaved.
        stage: StageId,
        /// Dimensions of the filter input.
        expected: Dimensions,
        /// Dimensions of the filter output.
        actual: Dimensions,
    },
}
