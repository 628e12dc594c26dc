//! Shared request loading for CLI commands.

use anyhow::{Context, Result};
use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;
use clipwave_ingest::IngestRequest;
use std::path::Path;

/// Builds an ingestion request from a file on disk.
///
/// With `raw` the file is read as webm bytes and base64-encoded here;
/// otherwise it is read as base64 text (surrounding whitespace trimmed).
pub fn load_request(
    input: &str,
    raw: bool,
    save: bool,
    prefix: &str,
    duration_max: u32,
) -> Result<IngestRequest> {
    let base64_data = if raw {
        let bytes = std::fs::read(Path::new(input))
            .with_context(|| format!("failed to read webm file: {input}"))?;
        BASE64.encode(bytes)
    } else {
        std::fs::read_to_string(Path::new(input))
            .with_context(|| format!("failed to read base64 file: {input}"))?
            .trim()
            .to_string()
    };

    let mut request = IngestRequest::new(base64_data);
    request.save_audio = save;
    request.file_prefix = prefix.to_string();
    request.record_duration_max = duration_max;
    Ok(request)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_raw_input_is_encoded() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.webm");
        std::fs::write(&path, [0x1a, 0x45, 0xdf, 0xa3]).unwrap();

        let request =
            load_request(path.to_str().unwrap(), true, false, "record", 10).unwrap();
        assert_eq!(request.base64_data, "GkXfow==");
    }

    #[test]
    fn test_base64_input_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.b64");
        std::fs::write(&path, "GkXfow==\n").unwrap();

        let request =
            load_request(path.to_str().unwrap(), false, true, "take", 30).unwrap();
        assert_eq!(request.base64_data, "GkXfow==");
        assert!(request.save_audio);
        assert_eq!(request.file_prefix, "take");
        assert_eq!(request.record_duration_max, 30);
    }

    #[test]
    fn test_missing_file_carries_context() {
        let err = load_request("/does/not/exist.b64", false, false, "record", 10)
            .unwrap_err();
        assert!(err.to_string().contains("/does/not/exist.b64"));
    }
}
