//! Ingestion request type.

use serde::{Deserialize, Serialize};

use crate::error::{IngestError, IngestResult};

/// Default advisory recording duration hint, in seconds.
pub const DEFAULT_DURATION_MAX: u32 = 10;

/// Inclusive bounds for the duration hint.
pub const DURATION_RANGE: (u32, u32) = (1, 600);

/// A single ingestion request as handed over by the host.
///
/// `record_duration_max` is advisory only; it bounds the recording UI, not
/// the pipeline. It still feeds the change-detection fingerprint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestRequest {
    /// Base64-encoded webm-container audio clip.
    pub base64_data: String,

    /// Advisory recording duration cap in seconds, within [1, 600].
    #[serde(default = "default_duration_max")]
    pub record_duration_max: u32,

    /// Whether to persist the transcoded clip to the output directory.
    #[serde(default)]
    pub save_audio: bool,

    /// Filename prefix for persisted clips.
    #[serde(default = "default_file_prefix")]
    pub file_prefix: String,
}

fn default_duration_max() -> u32 {
    DEFAULT_DURATION_MAX
}

fn default_file_prefix() -> String {
    "record".to_string()
}

impl Default for IngestRequest {
    fn default() -> Self {
        Self {
            base64_data: String::new(),
            record_duration_max: DEFAULT_DURATION_MAX,
            save_audio: false,
            file_prefix: default_file_prefix(),
        }
    }
}

impl IngestRequest {
    /// Creates a request for the given payload with default settings.
    pub fn new(base64_data: impl Into<String>) -> Self {
        Self {
            base64_data: base64_data.into(),
            ..Default::default()
        }
    }

    /// Checks boundary invariants before the pipeline runs.
    pub fn validate(&self) -> IngestResult<()> {
        let (min, max) = DURATION_RANGE;
        if self.record_duration_max < min || self.record_duration_max > max {
            return Err(IngestError::InvalidDurationHint {
                hint: self.record_duration_max,
            });
        }
        if self.save_audio && self.file_prefix.is_empty() {
            return Err(IngestError::EmptyPrefix);
        }
        Ok(())
    }
}
