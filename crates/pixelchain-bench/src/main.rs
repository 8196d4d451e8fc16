//! pixelchain-bench: CLI tool for running filter pipelines on image files.
//!
//! Decodes an image, builds a pipeline from `--stage` flags or a JSON
//! preset, runs it, and prints the luminance histogram summary plus
//! per-stage timing diagnostics. Useful for:
//!
//! - Checking what a filter chain does to a real image
//! - Comparing stage orders (the pipeline is order-sensitive)
//! - Measuring per-stage durations to find the expensive filter
//!
//! # Usage
//!
//! ```text
//! cargo run --release --bin pixelchain-bench -- [OPTIONS] <IMAGE_PATH>
//! cargo run --release --bin pixelchain-bench -- photo.jpg \
//!     --stage gaussian:sigma=2 --stage sobel:operator=prewitt --output edges.png
//! ```

#![allow(clippy::print_stdout, clippy::print_stderr)]

mod logger;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use pixelchain_pipeline::{
    FilterKind, Histogram, ParamValue, Pipeline, PipelinePreset, PresetStage, RasterImage,
    RunDiagnostics, run,
};
use tracing::{info, warn};

/// Run a pixel filter pipeline over an image and report diagnostics.
///
/// Stages run in the order given. Each `--stage` takes a filter kind
/// and optional parameters, e.g. `gamma:gamma=2.2` or
/// `canny:low=20,high=80`. Out-of-range values are clamped.
#[derive(Parser)]
#[command(name = "pixelchain-bench", version)]
struct Cli {
    /// Path to the input image (PNG, JPEG, BMP, WebP).
    image_path: PathBuf,

    /// Append a stage: `kind[:name=value,...]`. Repeatable.
    #[arg(long = "stage", value_name = "SPEC")]
    stages: Vec<String>,

    /// Full pipeline preset as a JSON string.
    ///
    /// When provided, `--stage` flags are ignored. The JSON is an array
    /// of `{"kind": ..., "enabled": ..., "params": {...}}` objects.
    #[arg(long, conflicts_with = "preset_file")]
    preset_json: Option<String>,

    /// Read the pipeline preset from a JSON file.
    #[arg(long)]
    preset_file: Option<PathBuf>,

    /// Write the filtered image to this path (format from extension).
    #[arg(long)]
    output: Option<PathBuf>,

    /// Number of runs for averaging.
    #[arg(long, default_value_t = 1, value_parser = clap::builder::RangedU64ValueParser::<usize>::new().range(1..))]
    runs: usize,

    /// Output diagnostics and histogram as JSON instead of a report.
    #[arg(long)]
    json: bool,

    /// List filter kinds and their parameters, then exit.
    #[arg(long)]
    list_filters: bool,
}

/// Parse one `--stage` flag into a preset entry.
///
/// Values that parse as numbers become [`ParamValue::Number`], anything
/// else a [`ParamValue::Choice`]. Kind and parameter names are checked
/// later, when the preset is loaded.
fn parse_stage_spec(spec: &str) -> Result<PresetStage, String> {
    let (kind, params) = spec.split_once(':').unwrap_or((spec, ""));
    let kind = kind.trim();
    if kind.is_empty() {
        return Err(format!("stage {spec:?} has no filter kind"));
    }

    let mut stage = PresetStage {
        kind: kind.to_string(),
        enabled: true,
        params: std::collections::BTreeMap::new(),
    };
    for pair in params.split(',').map(str::trim).filter(|p| !p.is_empty()) {
        let (name, value) = pair
            .split_once('=')
            .ok_or_else(|| format!("expected name=value in stage {spec:?}, got {pair:?}"))?;
        let value = value.trim();
        let value = value
            .parse::<f64>()
            .map_or_else(|_| ParamValue::Choice(value.to_string()), ParamValue::Number);
        stage.params.insert(name.trim().to_string(), value);
    }
    Ok(stage)
}

/// Build the preset from `--preset-json`, `--preset-file`, or `--stage`.
fn preset_from_cli(cli: &Cli) -> Result<PipelinePreset, String> {
    if let Some(ref json) = cli.preset_json {
        return serde_json::from_str(json).map_err(|e| format!("Error parsing --preset-json: {e}"));
    }
    if let Some(ref path) = cli.preset_file {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Error reading {}: {e}", path.display()))?;
        return serde_json::from_str(&text)
            .map_err(|e| format!("Error parsing {}: {e}", path.display()));
    }
    let stages = cli
        .stages
        .iter()
        .map(String::as_str)
        .map(parse_stage_spec)
        .collect::<Result<_, _>>()?;
    Ok(PipelinePreset { stages })
}

fn load_image(path: &std::path::Path) -> Result<RasterImage, String> {
    let decoded = image::open(path).map_err(|e| format!("Error decoding {}: {e}", path.display()))?;
    RasterImage::new(decoded.to_rgba8()).map_err(|e| format!("Error loading {}: {e}", path.display()))
}

fn print_filter_list() {
    for kind in FilterKind::ALL {
        println!("{:<20} {}", kind.name(), kind.label());
        for spec in kind.params() {
            println!("    {:<12} default {}", spec.name, spec.default_value());
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    logger::init();

    if cli.list_filters {
        print_filter_list();
        return ExitCode::SUCCESS;
    }

    let pipeline = match preset_from_cli(&cli).and_then(|preset| {
        Pipeline::from_preset(&preset).map_err(|e| format!("Invalid pipeline: {e}"))
    }) {
        Ok(p) => p,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    let source = match load_image(&cli.image_path) {
        Ok(img) => img,
        Err(msg) => {
            eprintln!("{msg}");
            return ExitCode::FAILURE;
        }
    };

    info!(
        image = %cli.image_path.display(),
        size = %source.dimensions(),
        stages = pipeline.len(),
        runs = cli.runs,
        "starting"
    );
    for (index, stage) in pipeline.stages().iter().enumerate() {
        let params: Vec<String> = stage
            .params()
            .iter()
            .map(|(name, value)| format!("{name}={value}"))
            .collect();
        eprintln!("  {index}: {} {}", stage.kind(), params.join(" "));
    }
    eprintln!();

    let mut all_diagnostics = Vec::with_capacity(cli.runs);

    for run_index in 0..cli.runs {
        if cli.runs > 1 {
            eprintln!("--- Run {}/{} ---", run_index + 1, cli.runs);
        }

        let output = match run(&source, &pipeline) {
            Ok(output) => output,
            Err(e) => {
                eprintln!("Pipeline error: {e}");
                return ExitCode::FAILURE;
            }
        };

        if cli.json {
            let value = serde_json::json!({
                "diagnostics": &output.diagnostics,
                "histogram": &output.histogram,
            });
            match serde_json::to_string_pretty(&value) {
                Ok(json) => println!("{json}"),
                Err(e) => {
                    eprintln!("Error serializing diagnostics: {e}");
                    return ExitCode::FAILURE;
                }
            }
        } else {
            println!("{}", output.diagnostics.report());
            println!();
            println!("{}", histogram_report(&output.histogram));
        }

        // Write the image on the first run only.
        if run_index == 0
            && let Some(ref path) = cli.output
        {
            match output.image.clone().into_rgba().save(path) {
                Ok(()) => info!(path = %path.display(), "image written"),
                Err(e) => warn!(path = %path.display(), error = %e, "failed to write image"),
            }
        }

        all_diagnostics.push(output.diagnostics);

        if cli.runs > 1 {
            eprintln!();
        }
    }

    if cli.runs > 1 {
        print_multi_run_summary(&all_diagnostics);
    }

    ExitCode::SUCCESS
}

/// Width of the bars in the histogram sketch.
const BAR_WIDTH: usize = 40;

/// Summary statistics plus a 16-bucket bar sketch of the histogram.
#[allow(
    clippy::cast_precision_loss,
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss
)]
fn histogram_report(histogram: &Histogram) -> String {
    let mut lines = Vec::new();
    lines.push(format!("Luminance Histogram\n{}", "=".repeat(60)));
    lines.push(format!(
        "Pixels: {}  |  Mean: {}  |  P5/P50/P95: {}/{}/{}",
        histogram.total(),
        histogram.mean().map_or_else(|| "-".to_string(), |m| format!("{m:.1}")),
        fmt_percentile(histogram, 5.0),
        fmt_percentile(histogram, 50.0),
        fmt_percentile(histogram, 95.0),
    ));

    let buckets: Vec<u64> = histogram
        .bins()
        .chunks(16)
        .map(|chunk| chunk.iter().sum())
        .collect();
    let peak = buckets.iter().copied().max().unwrap_or(0).max(1);
    for (i, &count) in buckets.iter().enumerate() {
        let len = (count as f64 / peak as f64 * BAR_WIDTH as f64).round() as usize;
        lines.push(format!(
            "{:>3}-{:<3} {:<width$} {count}",
            i * 16,
            i * 16 + 15,
            "#".repeat(len),
            width = BAR_WIDTH,
        ));
    }
    lines.join("\n")
}

fn fmt_percentile(histogram: &Histogram, p: f64) -> String {
    histogram
        .percentile(p)
        .map_or_else(|| "-".to_string(), |v| v.to_string())
}

/// Print aggregated statistics across multiple runs.
#[allow(clippy::cast_precision_loss)]
fn print_multi_run_summary(all_diagnostics: &[RunDiagnostics]) {
    println!();
    println!(
        "Summary ({} runs)\n{}",
        all_diagnostics.len(),
        "=".repeat(60),
    );

    if all_diagnostics.is_empty() {
        println!("Warning: no diagnostics to summarize");
        return;
    }

    let durations: Vec<f64> = all_diagnostics
        .iter()
        .map(|d| d.total_duration.as_secs_f64() * 1000.0)
        .collect();

    let min = durations.iter().copied().reduce(f64::min).unwrap_or(0.0);
    let max = durations.iter().copied().reduce(f64::max).unwrap_or(0.0);
    let mean = durations.iter().sum::<f64>() / durations.len() as f64;

    println!("Total duration: min={min:.3}ms  mean={mean:.3}ms  max={max:.3}ms");

    // Per-stage means. Every run uses the same pipeline, so stages line
    // up by index.
    println!();
    println!("{:<6} {:<24} {:>12}", "Stage", "Filter", "Mean (ms)");
    println!("{}", "-".repeat(44));

    let Some(first) = all_diagnostics.first() else {
        return;
    };
    for (index, stage) in first.stages.iter().enumerate() {
        let stage_durations: Vec<f64> = all_diagnostics
            .iter()
            .filter_map(|d| d.stages.get(index))
            .map(|s| s.duration.as_secs_f64() * 1000.0)
            .collect();
        let stage_mean = stage_durations.iter().sum::<f64>() / stage_durations.len() as f64;
        println!(
            "{:<6} {:<24} {stage_mean:>10.3}ms",
            stage.stage.to_string(),
            stage.kind.label(),
        );
    }
}
