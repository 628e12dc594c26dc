//! Fingerprint command implementation
//!
//! Prints the change-detection digest the host would use to decide whether
//! to re-run the pipeline, without invoking any stage of it.

use anyhow::Result;
use std::process::ExitCode;

use clipwave_ingest::change_fingerprint;

use super::input::load_request;

/// Run the fingerprint command
pub fn run(
    input: &str,
    raw: bool,
    save: bool,
    prefix: &str,
    duration_max: u32,
) -> Result<ExitCode> {
    let request = load_request(input, raw, save, prefix, duration_max)?;
    println!("{}", change_fingerprint(&request));
    Ok(ExitCode::SUCCESS)
}
