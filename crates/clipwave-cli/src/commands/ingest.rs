//! Ingest command implementation
//!
//! Runs the full pipeline on a recorded clip and prints a waveform summary.

use anyhow::{Context, Result};
use colored::Colorize;
use std::process::ExitCode;
use std::time::Duration;

use clipwave_ingest::{Pipeline, PipelineConfig, TranscoderConfig};

use super::input::load_request;

/// Run the ingest command
///
/// # Returns
/// Exit code: 0 on success, 1 on any pipeline failure
#[allow(clippy::too_many_arguments)]
pub fn run(
    input: &str,
    raw: bool,
    save: bool,
    prefix: &str,
    out_dir: &str,
    duration_max: u32,
    timeout_secs: u64,
    json: bool,
) -> Result<ExitCode> {
    let request = load_request(input, raw, save, prefix, duration_max)?;

    let pipeline = Pipeline::ffmpeg(
        TranscoderConfig::default().timeout(Duration::from_secs(timeout_secs)),
        PipelineConfig::new(out_dir),
    );

    let output = pipeline
        .run(&request)
        .with_context(|| format!("ingestion failed for {input}"))?;

    if json {
        let summary = serde_json::json!({
            "shape": output.waveform.shape(),
            "sample_rate": output.waveform.sample_rate,
            "duration_seconds": output.waveform.duration_seconds(),
            "fingerprint": output.fingerprint,
            "saved_path": output.saved_path,
        });
        println!("{}", serde_json::to_string_pretty(&summary)?);
    } else {
        println!("{} {}", "Ingested:".cyan().bold(), input);
        println!(
            "  {} {:?} at {} Hz ({:.2}s)",
            "waveform".dimmed(),
            output.waveform.shape(),
            output.waveform.sample_rate,
            output.waveform.duration_seconds()
        );
        println!("  {} {}", "fingerprint".dimmed(), output.fingerprint);
        if let Some(path) = &output.saved_path {
            println!("  {} {}", "saved to".dimmed(), path.display());
        }
    }

    Ok(ExitCode::SUCCESS)
}
