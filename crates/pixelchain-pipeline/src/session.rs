//! Interactive editing session: a pipeline, its source image and a
//! background worker that keeps the displayed result up to date.
//!
//! Every successful edit bumps a generation counter and queues a run.
//! The worker only ever executes the newest queued job, and the executor
//! checks between stages whether a newer generation has been submitted,
//! so a superseded run stops early. Results that arrive for an old
//! generation are dropped. The latest edit always wins; at most one
//! result is ever displayed.
//!
//! ```rust
//! # use pixelchain_pipeline::{RasterImage, Session, RunState, PipelineError};
//! # fn main() -> Result<(), PipelineError> {
//! let source = RasterImage::from_pixel(8, 8, [200, 120, 40, 255])?;
//! let mut session = Session::new(source);
//! let stage = session.create_stage("threshold")?;
//! session.set_param(stage, "thresh", 100.0.into())?;
//! let shown = session.wait();
//! assert_eq!(shown.map(|out| out.histogram.count(255)), Some(64));
//! assert_eq!(session.state(), RunState::Idle);
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::thread::{self, JoinHandle};

use tracing::{debug, warn};

use crate::catalog::{FilterKind, ParamValue};
use crate::executor::{RunOutput, run_unless_superseded};
use crate::pipeline::{Pipeline, PipelinePreset};
use crate::raster::RasterImage;
use crate::stage::{FilterStage, StageId};
use crate::types::PipelineError;

/// Whether a submitted run is still outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    /// The displayed result reflects the latest edit.
    Idle,
    /// A run for the latest edit has been queued or is executing.
    Running,
}

/// Work handed to the worker thread.
struct Job {
    generation: u64,
    source: Arc<RasterImage>,
    pipeline: Pipeline,
}

/// What the worker sends back.
struct Completed {
    generation: u64,
    result: Result<Option<RunOutput>, PipelineError>,
}

/// An editing session with live re-execution.
///
/// Dropping the session supersedes any in-flight run and joins the
/// worker thread.
pub struct Session {
    source: Arc<RasterImage>,
    pipeline: Pipeline,
    /// Newest generation submitted, shared with the worker.
    latest: Arc<AtomicU64>,
    /// Newest generation whose outcome has been accepted.
    settled: u64,
    displayed: Option<RunOutput>,
    last_error: Option<PipelineError>,
    jobs: Option<Sender<Job>>,
    results: Receiver<Completed>,
    worker: Option<JoinHandle<()>>,
}

impl Session {
    /// Start a session over `source` with an empty pipeline.
    ///
    /// An initial run is queued immediately, so the first result shows
    /// the unfiltered source and its histogram.
    #[must_use]
    pub fn new(source: RasterImage) -> Self {
        let latest = Arc::new(AtomicU64::new(0));
        let (job_tx, job_rx) = mpsc::channel();
        let (result_tx, result_rx) = mpsc::channel();
        let worker = {
            let latest = Arc::clone(&latest);
            thread::spawn(move || worker_loop(&job_rx, &result_tx, &latest))
        };

        let mut session = Self {
            source: Arc::new(source),
            pipeline: Pipeline::new(),
            latest,
            settled: 0,
            displayed: None,
            last_error: None,
            jobs: Some(job_tx),
            results: result_rx,
            worker: Some(worker),
        };
        session.submit();
        session
    }

    // ─────────────────────────── Accessors ───────────────────────────

    /// The unfiltered source image.
    #[must_use]
    pub fn source(&self) -> &RasterImage {
        &self.source
    }

    /// The current pipeline.
    #[must_use]
    pub const fn pipeline(&self) -> &Pipeline {
        &self.pipeline
    }

    /// Stages in execution order.
    #[must_use]
    pub fn stages(&self) -> &[FilterStage] {
        self.pipeline.stages()
    }

    /// Generation of the most recent edit.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.latest.load(Ordering::Acquire)
    }

    /// `Running` until the result for the latest edit has been accepted
    /// by [`poll`](Self::poll) or [`wait`](Self::wait).
    #[must_use]
    pub fn state(&self) -> RunState {
        if self.settled < self.generation() {
            RunState::Running
        } else {
            RunState::Idle
        }
    }

    /// The result currently on display, if any run has completed.
    #[must_use]
    pub const fn displayed(&self) -> Option<&RunOutput> {
        self.displayed.as_ref()
    }

    /// The error from the latest run, if it failed. Cleared by the next
    /// successful run.
    #[must_use]
    pub const fn last_error(&self) -> Option<&PipelineError> {
        self.last_error.as_ref()
    }

    // ──────────────────────────── Editing ────────────────────────────

    /// Replace the source image and re-run.
    pub fn set_source(&mut self, source: RasterImage) {
        self.source = Arc::new(source);
        self.submit();
    }

    /// See [`Pipeline::create_stage`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::InvalidFilterKind`]; nothing is queued.
    pub fn create_stage(&mut self, kind: &str) -> Result<StageId, PipelineError> {
        let id = self.pipeline.create_stage(kind)?;
        self.submit();
        Ok(id)
    }

    /// See [`Pipeline::add_stage`].
    pub fn add_stage(&mut self, kind: FilterKind) -> StageId {
        let id = self.pipeline.add_stage(kind);
        self.submit();
        id
    }

    /// See [`Pipeline::remove_stage`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`]; nothing is queued.
    pub fn remove_stage(&mut self, id: StageId) -> Result<FilterStage, PipelineError> {
        let stage = self.pipeline.remove_stage(id)?;
        self.submit();
        Ok(stage)
    }

    /// See [`Pipeline::toggle_stage`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`]; nothing is queued.
    pub fn toggle_stage(&mut self, id: StageId) -> Result<bool, PipelineError> {
        let enabled = self.pipeline.toggle_stage(id)?;
        self.submit();
        Ok(enabled)
    }

    /// See [`Pipeline::set_enabled`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`]; nothing is queued.
    pub fn set_enabled(&mut self, id: StageId, enabled: bool) -> Result<(), PipelineError> {
        self.pipeline.set_enabled(id, enabled)?;
        self.submit();
        Ok(())
    }

    /// See [`Pipeline::reorder_stage`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`]; nothing is queued.
    pub fn reorder_stage(&mut self, id: StageId, new_index: usize) -> Result<usize, PipelineError> {
        let index = self.pipeline.reorder_stage(id, new_index)?;
        self.submit();
        Ok(index)
    }

    /// See [`Pipeline::set_param`].
    ///
    /// # Errors
    ///
    /// As [`Pipeline::set_param`]; nothing is queued.
    pub fn set_param(
        &mut self,
        id: StageId,
        name: &str,
        value: ParamValue,
    ) -> Result<ParamValue, PipelineError> {
        let stored = self.pipeline.set_param(id, name, value)?;
        self.submit();
        Ok(stored)
    }

    /// See [`Pipeline::reset_stage`].
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::UnknownStage`]; nothing is queued.
    pub fn reset_stage(&mut self, id: StageId) -> Result<(), PipelineError> {
        self.pipeline.reset_stage(id)?;
        self.submit();
        Ok(())
    }

    /// Replace the whole pipeline with one built from `preset`.
    ///
    /// # Errors
    ///
    /// As [`Pipeline::from_preset`]; the current pipeline is kept.
    pub fn load_preset(&mut self, preset: &PipelinePreset) -> Result<(), PipelineError> {
        self.pipeline = Pipeline::from_preset(preset)?;
        self.submit();
        Ok(())
    }

    // ─────────────────────────── Results ────────────────────────────

    /// Accept any finished results without blocking.
    ///
    /// Returns `true` if the displayed result changed.
    pub fn poll(&mut self) -> bool {
        let mut changed = false;
        while let Ok(done) = self.results.try_recv() {
            changed |= self.accept(done);
        }
        changed
    }

    /// Block until the latest edit's run has finished, then return the
    /// displayed result.
    ///
    /// If the latest run failed, the previous result stays on display
    /// and [`last_error`](Self::last_error) reports why.
    pub fn wait(&mut self) -> Option<&RunOutput> {
        while self.state() == RunState::Running {
            let Ok(done) = self.results.recv() else {
                warn!("worker thread exited before the latest run finished");
                break;
            };
            self.accept(done);
        }
        self.displayed.as_ref()
    }

    fn submit(&mut self) {
        let generation = self.latest.fetch_add(1, Ordering::AcqRel) + 1;
        let job = Job {
            generation,
            source: Arc::clone(&self.source),
            pipeline: self.pipeline.clone(),
        };
        if let Some(jobs) = &self.jobs
            && jobs.send(job).is_err()
        {
            warn!(generation, "worker thread is gone, run not queued");
        }
    }

    fn accept(&mut self, done: Completed) -> bool {
        let current = self.generation();
        if done.generation != current {
            debug!(
                generation = done.generation,
                current, "discarding stale result"
            );
            return false;
        }
        self.settled = done.generation;
        match done.result {
            Ok(Some(output)) => {
                self.displayed = Some(output);
                self.last_error = None;
                true
            }
            Ok(None) => false,
            Err(err) => {
                warn!(generation = done.generation, error = %err, "run failed, keeping previous result");
                self.last_error = Some(err);
                false
            }
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // Make any in-flight run stop at its next stage boundary.
        self.latest.fetch_add(1, Ordering::AcqRel);
        self.jobs = None;
        if let Some(worker) = self.worker.take()
            && worker.join().is_err()
        {
            warn!("worker thread panicked");
        }
    }
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("source", &self.source.dimensions())
            .field("stages", &self.pipeline.len())
            .field("generation", &self.generation())
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn worker_loop(jobs: &Receiver<Job>, results: &Sender<Completed>, latest: &AtomicU64) {
    while let Ok(mut job) = jobs.recv() {
        // Only the newest queued job matters.
        while let Ok(newer) = jobs.try_recv() {
            debug!(
                generation = job.generation,
                newer = newer.generation,
                "coalescing queued run"
            );
            job = newer;
        }
        let generation = job.generation;
        let result = run_unless_superseded(&job.source, &job.pipeline, || {
            latest.load(Ordering::Acquire) != generation
        });
        if results.send(Completed { generation, result }).is_err() {
            break;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::executor::run;

    #[allow(clippy::cast_possible_truncation)]
    fn source() -> RasterImage {
        RasterImage::from_fn(16, 12, |x, y| [(x * 16) as u8, (y * 20) as u8, 128, 255]).unwrap()
    }

    #[test]
    fn initial_result_is_the_source() {
        let src = source();
        let mut session = Session::new(src.clone());
        let shown = session.wait().unwrap();
        assert_eq!(shown.image, src);
        assert_eq!(session.state(), RunState::Idle);
    }

    #[test]
    fn edits_mark_running_until_accepted() {
        let mut session = Session::new(source());
        session.wait();
        session.add_stage(FilterKind::Gaussian);
        assert_eq!(session.state(), RunState::Running);
        session.wait();
        assert_eq!(session.state(), RunState::Idle);
    }

    #[test]
    fn last_edit_wins() {
        let src = source();
        let mut session = Session::new(src.clone());
        let blur = session.add_stage(FilterKind::Median);
        let edge = session.add_stage(FilterKind::Sobel);
        session.set_param(blur, "kernel", 9.0.into()).unwrap();
        session.reorder_stage(edge, 0).unwrap();
        session.toggle_stage(blur).unwrap();
        let expected = run(&src, session.pipeline()).unwrap();

        let shown = session.wait().unwrap();
        assert_eq!(shown.image, expected.image);
        assert_eq!(shown.histogram, expected.histogram);
    }

    #[test]
    fn failed_edit_queues_nothing() {
        let mut session = Session::new(source());
        session.wait();
        let before = session.generation();
        assert!(session.create_stage("posterize").is_err());
        assert!(session.remove_stage(StageId::new(42)).is_err());
        assert_eq!(session.generation(), before);
        assert_eq!(session.state(), RunState::Idle);
    }

    #[test]
    fn stale_results_are_dropped() {
        let mut session = Session::new(source());
        session.wait();
        let stale = Completed {
            generation: session.generation(),
            result: Ok(None),
        };
        session.add_stage(FilterKind::Gamma);
        assert!(!session.accept(stale));
        assert_eq!(session.state(), RunState::Running);
    }

    #[test]
    fn failed_run_keeps_previous_result() {
        let mut session = Session::new(source());
        let shown_before = session.wait().cloned();
        let id = session.add_stage(FilterKind::Gamma);
        let generation = session.generation();
        let failure = PipelineError::DimensionMismatch {
            stage: id,
            expected: session.source().dimensions(),
            actual: crate::types::Dimensions {
                width: 1,
                height: 1,
            },
        };
        let changed = session.accept(Completed {
            generation,
            result: Err(failure.clone()),
        });
        assert!(!changed);
        assert_eq!(session.displayed().cloned(), shown_before);
        assert_eq!(session.last_error(), Some(&failure));
        assert_eq!(session.state(), RunState::Idle);
    }

    #[test]
    fn set_source_reruns() {
        let mut session = Session::new(source());
        session.add_stage(FilterKind::Threshold);
        session.wait();
        let white = RasterImage::from_pixel(3, 3, [255; 4]).unwrap();
        session.set_source(white);
        let shown = session.wait().unwrap();
        assert_eq!(shown.histogram.count(255), 9);
    }

    #[test]
    fn load_preset_replaces_pipeline() {
        let mut session = Session::new(source());
        session.add_stage(FilterKind::Mean);
        let preset = PipelinePreset {
            stages: vec![crate::pipeline::PresetStage::new(FilterKind::Jpeg)],
        };
        session.load_preset(&preset).unwrap();
        assert_eq!(session.stages().len(), 1);
        assert_eq!(session.stages()[0].kind(), FilterKind::Jpeg);
        assert!(session.wait().is_some());
    }

    #[test]
    fn poll_eventually_sees_result() {
        let mut session = Session::new(source());
        session.add_stage(FilterKind::Sharpen);
        while session.state() == RunState::Running {
            session.poll();
            thread::yield_now();
        }
        assert!(session.displayed().is_some());
        assert!(session.last_error().is_none());
    }
}
