//! Run diagnostics: per-stage timing and skip counts.
//!
//! Every call to [`run`](crate::run) collects diagnostics alongside the
//! final image and histogram. They are meant for tuning filter chains
//! and spotting the expensive stage.
//!
//! Durations are measured with the `web-time` crate and stored as
//! [`std::time::Duration`]. They are serialized as fractional seconds
//! (`f64`), since `Duration` does not implement serde traits.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::catalog::FilterKind;
use crate::stage::StageId;
use crate::types::Dimensions;

/// Serde support for `std::time::Duration` as fractional seconds.
mod duration_serde {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    /// Serialize a `Duration` as fractional seconds (`f64`).
    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        duration.as_secs_f64().serialize(serializer)
    }

    /// Deserialize a `Duration` from fractional seconds (`f64`).
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        Duration::try_from_secs_f64(secs).map_err(|_| {
            serde::de::Error::custom(
                "duration seconds must be finite, non-negative, and representable as a Duration",
            )
        })
    }
}

/// Diagnostics collected from a single pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunDiagnostics {
    /// Size of the source (and therefore the output) image.
    pub dimensions: Dimensions,
    /// One entry per enabled stage, in execution order.
    pub stages: Vec<StageDiagnostics>,
    /// Number of disabled stages that were passed over.
    pub skipped: usize,
    /// Time spent building the histogram (seconds).
    #[serde(with = "duration_serde")]
    pub histogram_duration: Duration,
    /// Total wall-clock duration of the run (seconds).
    #[serde(with = "duration_serde")]
    pub total_duration: Duration,
}

/// Diagnostics for one executed stage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageDiagnostics {
    /// Which stage ran.
    pub stage: StageId,
    /// Its filter kind.
    pub kind: FilterKind,
    /// Wall-clock duration of this stage (seconds).
    #[serde(with = "duration_serde")]
    pub duration: Duration,
}

impl RunDiagnostics {
    /// Sum of the per-stage durations, excluding histogram and overhead.
    #[must_use]
    pub fn filter_duration(&self) -> Duration {
        self.stages.iter().map(|s| s.duration).sum()
    }

    /// The stage that took longest, if any ran.
    #[must_use]
    pub fn slowest(&self) -> Option<&StageDiagnostics> {
        self.stages.iter().max_by_key(|s| s.duration)
    }

    /// Format diagnostics as a human-readable report.
    #[must_use]
    pub fn report(&self) -> String {
        let mut lines = Vec::new();

        lines.push(format!("Pipeline Diagnostics Report\n{}", "=".repeat(60)));
        lines.push(format!(
            "Image: {} ({} pixels)",
            self.dimensions,
            self.dimensions.pixel_count(),
        ));
        lines.push(format!(
            "Total duration: {:.3}ms",
            duration_ms(self.total_duration),
        ));
        lines.push(String::new());

        lines.push(format!(
            "{:<6} {:<24} {:>10} {:>10}",
            "Stage", "Filter", "Duration", "% Total"
        ));
        lines.push("-".repeat(60));

        let total_ms = duration_ms(self.total_duration);
        let percent = |d: Duration| {
            if total_ms > 0.0 {
                duration_ms(d) / total_ms * 100.0
            } else {
                0.0
            }
        };

        for diag in &self.stages {
            let ms = duration_ms(diag.duration);
            let pct = percent(diag.duration);
            lines.push(format!(
                "{:<6} {:<24} {ms:>8.3}ms {pct:>9.1}%",
                diag.stage.to_string(),
                diag.kind.label(),
            ));
        }
        let ms = duration_ms(self.histogram_duration);
        let pct = percent(self.histogram_duration);
        lines.push(format!("{:<6} {:<24} {ms:>8.3}ms {pct:>9.1}%", "", "Histogram"));

        lines.push(String::new());
        lines.push(format!(
            "Stages run: {}  |  Skipped (disabled): {}",
            self.stages.len(),
            self.skipped,
        ));
        lines.push(format!(
            "Filter time: {:.3}ms",
            duration_ms(self.filter_duration()),
        ));
        if let Some(slowest) = self.slowest() {
            lines.push(format!(
                "Slowest: {} {} ({:.3}ms)",
                slowest.stage,
                slowest.kind.label(),
                duration_ms(slowest.duration),
            ));
        }

        lines.join("\n")
    }
}

/// Convert a `Duration` to milliseconds as `f64`.
fn duration_ms(d: Duration) -> f64 {
    d.as_secs_f64() * 1000.0
}
