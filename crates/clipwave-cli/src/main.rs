//! clipwave CLI - run the audio ingestion pipeline from the command line
//!
//! This binary wraps the `clipwave-ingest` library so that recorded clips
//! can be transcoded, inspected, and persisted without a running host.

use clap::{Parser, Subcommand};
use std::process::ExitCode;

mod commands;

/// clipwave - browser-clip audio ingestion
#[derive(Parser)]
#[command(name = "clipwave")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Transcode a recorded clip and print a waveform summary
    Ingest {
        /// Path to the input file (base64 text, or raw webm with --raw)
        #[arg(short, long)]
        input: String,

        /// Treat the input file as raw webm bytes instead of base64 text
        #[arg(long)]
        raw: bool,

        /// Persist the transcoded clip into the output directory
        #[arg(long)]
        save: bool,

        /// Filename prefix for persisted clips
        #[arg(long, default_value = "record")]
        prefix: String,

        /// Directory persisted clips are written into
        #[arg(short, long, default_value = ".")]
        out_dir: String,

        /// Advisory recording duration cap in seconds [1, 600]
        #[arg(long, default_value_t = 10)]
        duration_max: u32,

        /// Timeout for the ffmpeg subprocess, in seconds
        #[arg(long, default_value_t = 120)]
        timeout_secs: u64,

        /// Output machine-readable JSON (no colored output)
        #[arg(long)]
        json: bool,
    },

    /// Print the change-detection fingerprint of a request without running it
    Fingerprint {
        /// Path to the input file (base64 text, or raw webm with --raw)
        #[arg(short, long)]
        input: String,

        /// Treat the input file as raw webm bytes instead of base64 text
        #[arg(long)]
        raw: bool,

        /// Persist flag as the host would pass it (feeds the digest)
        #[arg(long)]
        save: bool,

        /// Filename prefix as the host would pass it (feeds the digest)
        #[arg(long, default_value = "record")]
        prefix: String,

        /// Advisory recording duration cap in seconds [1, 600]
        #[arg(long, default_value_t = 10)]
        duration_max: u32,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Ingest {
            input,
            raw,
            save,
            prefix,
            out_dir,
            duration_max,
            timeout_secs,
            json,
        } => commands::ingest::run(
            &input,
            raw,
            save,
            &prefix,
            &out_dir,
            duration_max,
            timeout_secs,
            json,
        ),
        Commands::Fingerprint {
            input,
            raw,
            save,
            prefix,
            duration_max,
        } => commands::fingerprint::run(&input, raw, save, &prefix, duration_max),
    };

    match result {
        Ok(code) => code,
        Err(e) => {
            eprintln!("{}: {:#}", colored::Colorize::red("error"), e);
            ExitCode::from(1)
        }
    }
}
