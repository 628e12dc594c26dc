//! Error types for the ingestion pipeline.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ingestion operations.
pub type IngestResult<T> = Result<T, IngestError>;

/// Coarse error classification, one entry per pipeline stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Malformed or empty request input.
    Input,
    /// Subprocess failure or malformed transcoder output.
    Transcode,
    /// Filesystem failure during the optional save step.
    Persist,
    /// Malformed PCM container during waveform loading.
    Decode,
}

/// Errors that can occur during audio ingestion.
#[derive(Debug, Error)]
pub enum IngestError {
    /// Base64 payload decoded to zero bytes.
    #[error("encoded audio decoded to an empty byte sequence")]
    EmptyInput,

    /// Base64 payload could not be decoded.
    #[error("invalid base64 audio payload: {0}")]
    Base64(#[from] base64::DecodeError),

    /// Duration hint outside the accepted range.
    #[error("record_duration_max must be within [1, 600] seconds, got {hint}")]
    InvalidDurationHint { hint: u32 },

    /// Empty filename prefix with save_audio enabled.
    #[error("file_prefix must not be empty when save_audio is set")]
    EmptyPrefix,

    /// ffmpeg executable not found.
    #[error("ffmpeg executable not found. Ensure ffmpeg is installed and in PATH, or set FFMPEG_PATH environment variable")]
    FfmpegNotFound,

    /// Failed to spawn the transcoder process.
    #[error("failed to spawn transcoder process: {0}")]
    SpawnFailed(#[source] std::io::Error),

    /// Transcoder process timed out.
    #[error("transcoder process timed out after {timeout_secs} seconds")]
    Timeout { timeout_secs: u64 },

    /// Transcoder process exited with non-zero status.
    #[error("transcoder process exited with status {exit_code}: {stderr}")]
    ProcessFailed { exit_code: i32, stderr: String },

    /// Transcoder exited cleanly but produced no output bytes.
    #[error("transcoder produced no output: {stderr}")]
    EmptyOutput { stderr: String },

    /// Failed to write the persisted clip.
    #[error("failed to write audio file {path}: {source}")]
    Persist {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to scan the output directory for existing clips.
    #[error("failed to scan output directory {path}: {source}")]
    ScanDirectory {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Exclusive-create retries exhausted without finding a free name.
    #[error("could not allocate a free filename under {directory} with prefix '{prefix}'")]
    AllocatorExhausted { directory: PathBuf, prefix: String },

    /// Transcoder output is not a well-formed PCM container.
    #[error("malformed PCM container: {0}")]
    Decode(#[from] hound::Error),

    /// PCM container uses a sample format the loader does not accept.
    #[error("unsupported PCM format: {message}")]
    UnsupportedFormat { message: String },
}

impl IngestError {
    /// Creates a new process failed error.
    pub fn process_failed(exit_code: i32, stderr: impl Into<String>) -> Self {
        Self::ProcessFailed {
            exit_code,
            stderr: stderr.into(),
        }
    }

    /// Creates a new unsupported format error.
    pub fn unsupported_format(message: impl Into<String>) -> Self {
        Self::UnsupportedFormat {
            message: message.into(),
        }
    }

    /// Returns the pipeline stage this error belongs to.
    pub fn kind(&self) -> ErrorKind {
        match self {
            IngestError::EmptyInput
            | IngestError::Base64(_)
            | IngestError::InvalidDurationHint { .. }
            | IngestError::EmptyPrefix => ErrorKind::Input,
            IngestError::FfmpegNotFound
            | IngestError::SpawnFailed(_)
            | IngestError::Timeout { .. }
            | IngestError::ProcessFailed { .. }
            | IngestError::EmptyOutput { .. } => ErrorKind::Transcode,
            IngestError::Persist { .. }
            | IngestError::ScanDirectory { .. }
            | IngestError::AllocatorExhausted { .. } => ErrorKind::Persist,
            IngestError::Decode(_) | IngestError::UnsupportedFormat { .. } => ErrorKind::Decode,
        }
    }
}
