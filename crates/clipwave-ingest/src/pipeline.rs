//! Pipeline orchestration: decode, transcode, persist, load.

use std::io::Write;
use std::path::PathBuf;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::{IngestError, IngestResult};
use crate::fingerprint::request_fingerprint;
use crate::naming::{self, NamedFile};
use crate::request::IngestRequest;
use crate::transcode::{CodecBackend, FfmpegTranscoder, TranscoderConfig};
use crate::waveform::{self, WaveformBuffer};

/// What to do when the optional save step fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PersistFailure {
    /// Fail the whole request.
    #[default]
    Abort,
    /// Log a warning and continue with the in-memory result.
    LogAndContinue,
}

/// Configuration for the ingestion pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Directory persisted clips are written into. Host-provided; the
    /// pipeline never computes it.
    pub output_dir: PathBuf,
    /// Policy for persist-step failures.
    pub persist_failure: PersistFailure,
}

impl PipelineConfig {
    /// Creates a config writing into the given directory with the default
    /// abort-on-persist-failure policy.
    pub fn new(output_dir: impl Into<PathBuf>) -> Self {
        Self {
            output_dir: output_dir.into(),
            persist_failure: PersistFailure::default(),
        }
    }

    /// Sets the persist-failure policy.
    pub fn persist_failure(mut self, policy: PersistFailure) -> Self {
        self.persist_failure = policy;
        self
    }
}

/// Result of one pipeline invocation.
#[derive(Debug)]
pub struct IngestOutput {
    /// Normalized waveform, shaped `[1, channels, samples]`.
    pub waveform: WaveformBuffer,
    /// Change-detection fingerprint of the request.
    pub fingerprint: String,
    /// Where the clip was persisted, when saving was requested and
    /// succeeded.
    pub saved_path: Option<PathBuf>,
}

/// The audio ingestion pipeline.
///
/// One invocation flows strictly left to right: base64 decode, subprocess
/// transcode, optional persist, waveform load. No state is carried between
/// invocations except the directory contents the name allocator observes.
pub struct Pipeline<B: CodecBackend> {
    backend: B,
    config: PipelineConfig,
}

impl Pipeline<FfmpegTranscoder> {
    /// Creates a pipeline backed by the real ffmpeg transcoder.
    pub fn ffmpeg(transcoder: TranscoderConfig, config: PipelineConfig) -> Self {
        Self {
            backend: FfmpegTranscoder::with_config(transcoder),
            config,
        }
    }
}

impl<B: CodecBackend> Pipeline<B> {
    /// Creates a pipeline over an arbitrary codec backend.
    pub fn new(backend: B, config: PipelineConfig) -> Self {
        Self { backend, config }
    }

    /// Runs one complete ingestion.
    ///
    /// On failure no partial waveform is returned; the error identifies the
    /// stage via [`IngestError::kind`].
    pub fn run(&self, request: &IngestRequest) -> IngestResult<IngestOutput> {
        request.validate()?;
        let fingerprint = request_fingerprint(request);

        let clip = BASE64.decode(request.base64_data.trim())?;
        if clip.is_empty() {
            return Err(IngestError::EmptyInput);
        }

        let pcm = self.backend.transcode(&clip)?;

        let saved_path = if request.save_audio {
            match self.persist(&pcm, &request.file_prefix) {
                Ok(path) => {
                    tracing::debug!(path = %path.display(), "clip persisted");
                    Some(path)
                }
                Err(e) if self.config.persist_failure == PersistFailure::LogAndContinue => {
                    tracing::warn!(error = %e, "persist failed, continuing without saved clip");
                    None
                }
                Err(e) => return Err(e),
            }
        } else {
            None
        };

        let waveform = waveform::load(&pcm)?;

        Ok(IngestOutput {
            waveform,
            fingerprint,
            saved_path,
        })
    }

    fn persist(&self, pcm: &[u8], prefix: &str) -> IngestResult<PathBuf> {
        let named = naming::allocate(&self.config.output_dir, prefix)?;
        write_clip(named, pcm)
    }
}

/// Writes the clip into a freshly allocated file.
///
/// If the write fails the empty claim is removed again, so no partial file
/// is left behind and the index stays free for a later attempt.
fn write_clip(named: NamedFile, pcm: &[u8]) -> IngestResult<PathBuf> {
    let NamedFile { path, mut file, .. } = named;
    if let Err(e) = file.write_all(pcm) {
        drop(file);
        let _ = std::fs::remove_file(&path);
        return Err(IngestError::Persist { path, source: e });
    }
    Ok(path)
}

/// Pure change-detection hook for the host's caching layer.
///
/// Returns the same digest [`Pipeline::run`] reports, without running any
/// stage of the pipeline.
pub fn change_fingerprint(request: &IngestRequest) -> String {
    request_fingerprint(request)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testutil::wav_fixture;
    use base64::Engine as _;
    use pretty_assertions::assert_eq;

    /// Backend returning canned PCM, recording whether it ran.
    struct CannedBackend {
        pcm: Vec<u8>,
    }

    impl CodecBackend for CannedBackend {
        fn transcode(&self, compressed: &[u8]) -> IngestResult<Vec<u8>> {
            assert!(!compressed.is_empty());
            Ok(self.pcm.clone())
        }
    }

    /// Backend that must never be reached.
    struct UnreachableBackend;

    impl CodecBackend for UnreachableBackend {
        fn transcode(&self, _compressed: &[u8]) -> IngestResult<Vec<u8>> {
            panic!("transcoder invoked for a request that should fail earlier");
        }
    }

    fn mono_fixture() -> Vec<u8> {
        let samples: Vec<i16> = (0..100).map(|i| (i * 100) as i16).collect();
        wav_fixture(1, 44_100, &[&samples])
    }

    fn encode(bytes: &[u8]) -> String {
        BASE64.encode(bytes)
    }

    #[test]
    fn test_run_returns_waveform_and_fingerprint() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            CannedBackend { pcm: mono_fixture() },
            PipelineConfig::new(dir.path()),
        );

        let request = IngestRequest::new(encode(b"webm bytes"));
        let output = pipeline.run(&request).unwrap();

        assert_eq!(output.waveform.shape(), [1, 2, 100]);
        assert_eq!(output.fingerprint.len(), 64);
        assert_eq!(output.fingerprint, change_fingerprint(&request));
        assert_eq!(output.saved_path, None);
    }

    #[test]
    fn test_invalid_base64_is_an_input_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(UnreachableBackend, PipelineConfig::new(dir.path()));

        let err = pipeline
            .run(&IngestRequest::new("!!! not base64 !!!"))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Input);
    }

    #[test]
    fn test_empty_payload_is_an_input_error_with_no_side_effects() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(UnreachableBackend, PipelineConfig::new(dir.path()));

        let mut request = IngestRequest::new("");
        request.save_audio = true;

        let err = pipeline.run(&request).unwrap_err();
        assert!(matches!(err, IngestError::EmptyInput));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_save_writes_sequentially_numbered_files() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            CannedBackend { pcm: mono_fixture() },
            PipelineConfig::new(dir.path()),
        );

        let mut request = IngestRequest::new(encode(b"webm bytes"));
        request.save_audio = true;

        let first = pipeline.run(&request).unwrap();
        let second = pipeline.run(&request).unwrap();

        assert_eq!(first.saved_path, Some(dir.path().join("record1.wav")));
        assert_eq!(second.saved_path, Some(dir.path().join("record2.wav")));

        let saved = std::fs::read(first.saved_path.unwrap()).unwrap();
        assert_eq!(saved, mono_fixture());
    }

    #[test]
    fn test_failed_write_removes_the_claimed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("record1.wav");
        std::fs::write(&path, b"").unwrap();

        // A read-only handle makes the write fail after the name is claimed.
        let file = std::fs::OpenOptions::new().read(true).open(&path).unwrap();
        let named = NamedFile {
            directory: dir.path().to_path_buf(),
            prefix: "record".to_string(),
            index: 1,
            path: path.clone(),
            file,
        };

        let err = write_clip(named, b"pcm bytes").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persist);
        assert!(!path.exists(), "failed write must not leave a file behind");
    }

    #[test]
    fn test_persist_failure_aborts_by_default() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let pipeline = Pipeline::new(
            CannedBackend { pcm: mono_fixture() },
            PipelineConfig::new(&missing),
        );

        let mut request = IngestRequest::new(encode(b"webm bytes"));
        request.save_audio = true;

        let err = pipeline.run(&request).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Persist);
    }

    #[test]
    fn test_persist_failure_can_log_and_continue() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing");
        let pipeline = Pipeline::new(
            CannedBackend { pcm: mono_fixture() },
            PipelineConfig::new(&missing).persist_failure(PersistFailure::LogAndContinue),
        );

        let mut request = IngestRequest::new(encode(b"webm bytes"));
        request.save_audio = true;

        let output = pipeline.run(&request).unwrap();
        assert_eq!(output.saved_path, None);
        assert_eq!(output.waveform.shape(), [1, 2, 100]);
    }

    #[test]
    fn test_transcode_failure_propagates_unchanged() {
        struct FailingBackend;
        impl CodecBackend for FailingBackend {
            fn transcode(&self, _compressed: &[u8]) -> IngestResult<Vec<u8>> {
                Err(IngestError::process_failed(1, "EBML header parsing failed"))
            }
        }

        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(FailingBackend, PipelineConfig::new(dir.path()));

        let err = pipeline
            .run(&IngestRequest::new(encode(b"garbage")))
            .unwrap_err();
        assert!(matches!(err, IngestError::ProcessFailed { exit_code: 1, .. }));
    }

    #[test]
    fn test_malformed_transcoder_output_is_a_decode_error() {
        let dir = tempfile::tempdir().unwrap();
        let pipeline = Pipeline::new(
            CannedBackend {
                pcm: b"not a wav".to_vec(),
            },
            PipelineConfig::new(dir.path()),
        );

        let err = pipeline
            .run(&IngestRequest::new(encode(b"webm bytes")))
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Decode);
    }
}
