//! ffmpeg subprocess transcoder.
//!
//! This module handles spawning ffmpeg as a subprocess and converting a
//! webm-container clip into the canonical PCM interchange format
//! (RIFF/WAVE, 16-bit signed little-endian, 2 channels, 44100 Hz).

use std::io::{Read, Write};
use std::path::PathBuf;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use crate::error::{IngestError, IngestResult};
use crate::waveform::repair_streamed_sizes;

/// Default timeout for ffmpeg execution (2 minutes).
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Canonical PCM sample rate in Hz.
pub const CANONICAL_SAMPLE_RATE: u32 = 44_100;

/// Canonical PCM channel count.
pub const CANONICAL_CHANNELS: u16 = 2;

/// A codec backend converts compressed clip bytes into canonical PCM bytes.
///
/// Abstracting the subprocess behind this trait lets tests substitute a
/// fake backend returning canned PCM without spawning anything.
pub trait CodecBackend {
    /// Transcodes a webm-container audio stream into a complete RIFF/WAVE
    /// PCM stream (16-bit, stereo, 44100 Hz).
    fn transcode(&self, compressed: &[u8]) -> IngestResult<Vec<u8>>;
}

/// Configuration for the ffmpeg transcoder.
#[derive(Debug, Clone)]
pub struct TranscoderConfig {
    /// Path to the ffmpeg executable.
    pub ffmpeg_path: Option<PathBuf>,
    /// Timeout for ffmpeg execution.
    pub timeout: Duration,
    /// Whether to capture ffmpeg's stderr for diagnostics.
    pub capture_stderr: bool,
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: None,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            capture_stderr: true,
        }
    }
}

impl TranscoderConfig {
    /// Sets the ffmpeg executable path.
    pub fn ffmpeg_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.ffmpeg_path = Some(path.into());
        self
    }

    /// Sets the timeout duration.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Sets the timeout in seconds.
    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout = Duration::from_secs(secs);
        self
    }
}

/// The ffmpeg subprocess transcoder.
pub struct FfmpegTranscoder {
    config: TranscoderConfig,
}

impl FfmpegTranscoder {
    /// Creates a new transcoder with default configuration.
    pub fn new() -> Self {
        Self {
            config: TranscoderConfig::default(),
        }
    }

    /// Creates a new transcoder with the given configuration.
    pub fn with_config(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Finds the ffmpeg executable path.
    fn find_ffmpeg(&self) -> IngestResult<PathBuf> {
        // Check config override first
        if let Some(ref path) = self.config.ffmpeg_path {
            if path.exists() {
                return Ok(path.clone());
            }
        }

        // Check FFMPEG_PATH environment variable
        if let Ok(path) = std::env::var("FFMPEG_PATH") {
            let path = PathBuf::from(path);
            if path.exists() {
                return Ok(path);
            }
        }

        // Try to find ffmpeg in PATH
        let ffmpeg_names = if cfg!(windows) {
            vec!["ffmpeg.exe", "ffmpeg"]
        } else {
            vec!["ffmpeg"]
        };

        for name in ffmpeg_names {
            if let Ok(path) = which::which(name) {
                return Ok(path);
            }
        }

        // Try common installation paths
        let common_paths = if cfg!(windows) {
            vec![
                "C:\\Program Files\\ffmpeg\\bin\\ffmpeg.exe",
                "C:\\ffmpeg\\bin\\ffmpeg.exe",
            ]
        } else if cfg!(target_os = "macos") {
            vec!["/opt/homebrew/bin/ffmpeg", "/usr/local/bin/ffmpeg"]
        } else {
            vec!["/usr/bin/ffmpeg", "/usr/local/bin/ffmpeg", "/snap/bin/ffmpeg"]
        };

        for path_str in common_paths {
            let path = PathBuf::from(path_str);
            if path.exists() {
                return Ok(path);
            }
        }

        Err(IngestError::FfmpegNotFound)
    }
}

impl CodecBackend for FfmpegTranscoder {
    fn transcode(&self, compressed: &[u8]) -> IngestResult<Vec<u8>> {
        let ffmpeg_path = self.find_ffmpeg()?;

        // ffmpeg -hide_banner -loglevel error -f webm -i pipe:0
        //        -f wav -acodec pcm_s16le -ac 2 -ar 44100 pipe:1
        let mut cmd = Command::new(&ffmpeg_path);
        cmd.arg("-hide_banner")
            .arg("-loglevel")
            .arg("error")
            .arg("-f")
            .arg("webm")
            .arg("-i")
            .arg("pipe:0")
            .arg("-f")
            .arg("wav")
            .arg("-acodec")
            .arg("pcm_s16le")
            .arg("-ac")
            .arg(CANONICAL_CHANNELS.to_string())
            .arg("-ar")
            .arg(CANONICAL_SAMPLE_RATE.to_string())
            .arg("pipe:1");

        cmd.stdin(Stdio::piped()).stdout(Stdio::piped());
        if self.config.capture_stderr {
            cmd.stderr(Stdio::piped());
        } else {
            cmd.stderr(Stdio::null());
        }

        tracing::debug!(
            ffmpeg = %ffmpeg_path.display(),
            input_bytes = compressed.len(),
            "spawning transcoder"
        );

        let mut child = cmd.spawn().map_err(IngestError::SpawnFailed)?;

        // Feed stdin from a separate thread while draining stdout, so
        // neither pipe can fill up and deadlock the subprocess.
        let stdin = child.stdin.take();
        let input = compressed.to_vec();
        let writer = thread::spawn(move || {
            if let Some(mut stdin) = stdin {
                // ffmpeg may close stdin early once it has the full
                // container; a broken pipe here is not an error.
                let _ = stdin.write_all(&input);
            }
        });

        let stdout = child.stdout.take();
        let reader = thread::spawn(move || {
            let mut buf = Vec::new();
            if let Some(mut out) = stdout {
                let _ = out.read_to_end(&mut buf);
            }
            buf
        });

        let stderr_handle = child.stderr.take().map(|mut err| {
            thread::spawn(move || {
                let mut buf = String::new();
                let _ = err.read_to_string(&mut buf);
                buf
            })
        });

        let status = wait_with_timeout(&mut child, self.config.timeout)?;

        let _ = writer.join();
        let mut output = reader.join().unwrap_or_default();
        let stderr = stderr_handle
            .and_then(|h| h.join().ok())
            .unwrap_or_default();

        if !status.success() {
            let exit_code = status.code().unwrap_or(-1);
            tracing::error!(exit_code, stderr = %stderr, "transcoder failed");
            return Err(IngestError::process_failed(exit_code, stderr));
        }

        if output.is_empty() {
            tracing::error!(stderr = %stderr, "transcoder produced no output");
            return Err(IngestError::EmptyOutput { stderr });
        }

        // ffmpeg leaves placeholder RIFF sizes when writing to pipe:1.
        repair_streamed_sizes(&mut output);

        tracing::debug!(output_bytes = output.len(), "transcoder finished");
        Ok(output)
    }
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

fn wait_with_timeout(child: &mut Child, timeout: Duration) -> IngestResult<ExitStatus> {
    let start = Instant::now();

    loop {
        match child.try_wait() {
            Ok(Some(status)) => return Ok(status),
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(IngestError::Timeout {
                        timeout_secs: timeout.as_secs(),
                    });
                }
                thread::sleep(Duration::from_millis(50));
            }
            Err(e) => return Err(IngestError::SpawnFailed(e)),
        }
    }
}
