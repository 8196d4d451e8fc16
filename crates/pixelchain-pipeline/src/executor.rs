//! Replay a pipeline over a source image.
//!
//! The executor never touches the source: the first enabled stage reads
//! it and writes a new buffer, each later stage reads its predecessor's
//! output. Disabled stages are passed over entirely, so a pipeline whose
//! stages are all disabled returns a bit-exact copy of the source.

use std::convert::Infallible;

use tracing::{debug, debug_span, warn};
use web_time::Instant;

use crate::diagnostics::{RunDiagnostics, StageDiagnostics};
use crate::histogram::{Histogram, build_histogram};
use crate::pipeline::Pipeline;
use crate::raster::RasterImage;
use crate::stage::FilterStage;
use crate::types::PipelineError;

/// Everything a run produces.
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutput {
    /// The source after every enabled stage, same size as the source.
    pub image: RasterImage,
    /// Luminance histogram of [`image`](Self::image).
    pub histogram: Histogram,
    /// Per-stage timings.
    pub diagnostics: RunDiagnostics,
}

/// Run every enabled stage of `pipeline`, in order, over `source`.
///
/// Deterministic: identical inputs give identical images and
/// histograms.
///
/// # Errors
///
/// Returns [`PipelineError::DimensionMismatch`] if a filter produced an
/// image of a different size than its input. That is an internal bug;
/// the run is abandoned.
pub fn run(source: &RasterImage, pipeline: &Pipeline) -> Result<RunOutput, PipelineError> {
    let never_superseded = || Ok::<(), Infallible>(());
    execute(source, pipeline, apply_stage, never_superseded).map_err(|halt| match halt {
        Halt::Failed(err) => err,
        Halt::Superseded(never) => match never {},
    })
}

/// Like [`run`], but polls `is_superseded` before each stage and gives
/// up early (returning `Ok(None)`) once it reports `true`.
///
/// A session uses this so that a run made stale by a newer edit stops
/// burning time on filters whose result would be discarded anyway.
///
/// # Errors
///
/// See [`run`].
pub fn run_unless_superseded(
    source: &RasterImage,
    pipeline: &Pipeline,
    is_superseded: impl Fn() -> bool,
) -> Result<Option<RunOutput>, PipelineError> {
    settle(execute(source, pipeline, apply_stage, superseded_check(is_superseded)))
}

/// Why a run stopped without output. `S` is uninhabited for runs that
/// cannot be superseded.
#[derive(Debug)]
enum Halt<S> {
    Superseded(S),
    Failed(PipelineError),
}

fn superseded_check(is_superseded: impl Fn() -> bool) -> impl Fn() -> Result<(), ()> {
    move || if is_superseded() { Err(()) } else { Ok(()) }
}

fn settle(result: Result<RunOutput, Halt<()>>) -> Result<Option<RunOutput>, PipelineError> {
    match result {
        Ok(output) => Ok(Some(output)),
        Err(Halt::Superseded(())) => Ok(None),
        Err(Halt::Failed(err)) => Err(err),
    }
}

fn apply_stage(stage: &FilterStage, image: &RasterImage) -> RasterImage {
    stage.filter().apply(image)
}

fn execute<S>(
    source: &RasterImage,
    pipeline: &Pipeline,
    apply: impl Fn(&FilterStage, &RasterImage) -> RasterImage,
    check: impl Fn() -> Result<(), S>,
) -> Result<RunOutput, Halt<S>> {
    let size = source.dimensions();
    let span = debug_span!(
        "run",
        size = %size,
        stages = pipeline.len(),
        enabled = pipeline.enabled_count()
    );
    let _guard = span.enter();
    let start = Instant::now();

    let mut current: Option<RasterImage> = None;
    let mut stages = Vec::with_capacity(pipeline.enabled_count());
    let mut skipped = 0;

    for stage in pipeline.stages() {
        if !stage.is_enabled() {
            debug!(stage = %stage.id(), kind = %stage.kind(), "skipping disabled stage");
            skipped += 1;
            continue;
        }
        if let Err(reason) = check() {
            debug!(stage = %stage.id(), "run superseded, stopping early");
            return Err(Halt::Superseded(reason));
        }

        let stage_start = Instant::now();
        let input = current.as_ref().unwrap_or(source);
        let output = apply(stage, input);
        let duration = stage_start.elapsed();

        if output.dimensions() != size {
            let err = PipelineError::DimensionMismatch {
                stage: stage.id(),
                expected: size,
                actual: output.dimensions(),
            };
            warn!(error = %err, "aborting run");
            return Err(Halt::Failed(err));
        }

        debug!(
            stage = %stage.id(),
            kind = %stage.kind(),
            duration_ms = duration.as_secs_f64() * 1000.0,
            "stage complete"
        );
        stages.push(StageDiagnostics {
            stage: stage.id(),
            kind: stage.kind(),
            duration,
        });
        current = Some(output);
    }

    let image = current.unwrap_or_else(|| source.clone());
    let histogram_start = Instant::now();
    let histogram = build_histogram(&image);
    let histogram_duration = histogram_start.elapsed();

    let diagnostics = RunDiagnostics {
        dimensions: size,
        stages,
        skipped,
        histogram_duration,
        total_duration: start.elapsed(),
    };
    debug!(
        total_ms = diagnostics.total_duration.as_secs_f64() * 1000.0,
        skipped,
        "run complete"
    );

    Ok(RunOutput {
        image,
        histogram,
        diagnostics,
    })
}
