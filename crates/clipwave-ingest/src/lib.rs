//! clipwave Audio Ingestion Library
//!
//! This crate turns a base64-encoded, browser-recorded webm clip into a
//! normalized in-memory waveform for a node-based media-processing host.
//! The clip is transcoded to canonical PCM (16-bit, stereo, 44100 Hz) by an
//! external ffmpeg process, optionally persisted under a collision-free
//! sequential filename, and handed back together with a deterministic
//! request fingerprint for the host's change-detection cache.
//!
//! # Example
//!
//! ```no_run
//! use clipwave_ingest::{IngestRequest, Pipeline, PipelineConfig, TranscoderConfig};
//!
//! let pipeline = Pipeline::ffmpeg(
//!     TranscoderConfig::default(),
//!     PipelineConfig::new("input/audio"),
//! );
//!
//! let mut request = IngestRequest::new(std::fs::read_to_string("clip.b64")?);
//! request.save_audio = true;
//!
//! let output = pipeline.run(&request)?;
//! println!(
//!     "{:?} at {} Hz, fingerprint {}",
//!     output.waveform.shape(),
//!     output.waveform.sample_rate,
//!     output.fingerprint
//! );
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! # Modules
//!
//! - [`error`]: Error taxonomy for all pipeline stages
//! - [`fingerprint`]: Deterministic request digests for change detection
//! - [`request`]: The host-facing request type
//! - [`transcode`]: The ffmpeg subprocess transcoder and codec backend trait
//! - [`naming`]: Collision-free sequential filename allocation
//! - [`waveform`]: Waveform buffer type and canonical PCM loading
//! - [`pipeline`]: Orchestration of the stages above

pub mod error;
pub mod fingerprint;
pub mod naming;
pub mod pipeline;
pub mod request;
pub mod transcode;
pub mod waveform;

#[cfg(test)]
pub(crate) mod testutil;

// Re-export commonly used types at the crate root
pub use error::{ErrorKind, IngestError, IngestResult};
pub use fingerprint::{fingerprint_fields, request_fingerprint};
pub use naming::{allocate, NamedFile};
pub use pipeline::{change_fingerprint, IngestOutput, PersistFailure, Pipeline, PipelineConfig};
pub use request::IngestRequest;
pub use transcode::{
    CodecBackend, FfmpegTranscoder, TranscoderConfig, CANONICAL_CHANNELS, CANONICAL_SAMPLE_RATE,
};
pub use waveform::{load, repair_streamed_sizes, WaveformBuffer};
