//! pixelchain-pipeline: Order-sensitive pixel filter pipeline (sans-IO).
//!
//! A source [`RasterImage`] is run through an ordered [`Pipeline`] of
//! configurable filter stages (tone, colour, blur, sharpen, edge and
//! compression filters), producing a final image and a 256-bin
//! luminance [`Histogram`]. Stages can be added, removed, toggled,
//! reordered and re-parameterised; every parameter is clamped into its
//! schema range on write.
//!
//! This crate has **no I/O dependencies** -- it operates on decoded
//! in-memory images. Decoding and encoding image files lives in
//! `pixelchain-bench`.
//!
//! ```rust
//! # use pixelchain_pipeline::{Pipeline, PipelineError, RasterImage, run};
//! # fn main() -> Result<(), PipelineError> {
//! let source = RasterImage::from_pixel(2, 2, [128, 128, 128, 255])?;
//! let mut pipeline = Pipeline::new();
//! let stage = pipeline.create_stage("brightnessContrast")?;
//! pipeline.set_param(stage, "brightness", 100.0.into())?;
//!
//! let output = run(&source, &pipeline)?;
//! assert_eq!(output.image.pixel(0, 0), [255, 255, 255, 255]);
//! assert_eq!(output.histogram.count(255), 4);
//! # Ok(())
//! # }
//! ```

pub mod blur;
pub mod catalog;
pub mod color;
pub mod diagnostics;
pub mod edge;
pub mod executor;
pub mod filter;
pub mod histogram;
pub mod jpeg;
pub mod pipeline;
pub mod raster;
pub mod session;
pub mod sharpen;
pub mod stage;
pub mod tone;
pub mod types;

pub use catalog::{FilterKind, ParamDomain, ParamSpec, ParamValue, Params};
pub use diagnostics::{RunDiagnostics, StageDiagnostics};
pub use edge::EdgeOperator;
pub use executor::{RunOutput, run, run_unless_superseded};
pub use filter::Filter;
pub use histogram::{Histogram, build_histogram};
pub use pipeline::{Pipeline, PipelinePreset, PresetStage};
pub use raster::{RasterImage, clamp_channel, luminance};
pub use session::{RunState, Session};
pub use stage::{FilterStage, StageId};
pub use types::{Dimensions, PipelineError, RgbaImage};
