//! Waveform buffer type and canonical PCM loading.

use std::io::Cursor;

use crate::error::{IngestError, IngestResult};

/// In-memory multi-channel waveform, conceptually shaped
/// `[batch = 1, channels, samples]`.
///
/// Samples are `f32` in `[-1.0, 1.0]`. After [`load`] the channel
/// dimension is always exactly 2 for mono and stereo sources.
#[derive(Debug, Clone, PartialEq)]
pub struct WaveformBuffer {
    /// Per-channel sample data; all channels have equal length.
    pub channels: Vec<Vec<f32>>,
    /// Sample rate in Hz.
    pub sample_rate: u32,
}

impl WaveformBuffer {
    /// Number of channels.
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of samples per channel.
    pub fn num_samples(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// Buffer shape as `[batch, channels, samples]`.
    pub fn shape(&self) -> [usize; 3] {
        [1, self.num_channels(), self.num_samples()]
    }

    /// Samples of one channel.
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Duration in seconds.
    pub fn duration_seconds(&self) -> f64 {
        self.num_samples() as f64 / self.sample_rate as f64
    }
}

/// Rewrites placeholder RIFF sizes left by streaming muxers.
///
/// ffmpeg cannot seek back to patch the RIFF and `data` chunk sizes when
/// its output goes to a pipe and leaves 0xFFFFFFFF in both fields. Strict
/// parsers reject that header, so the transcoder runs this over its drained
/// output before the stream is persisted or loaded. Sizes that already
/// match the buffer are left untouched.
pub fn repair_streamed_sizes(wav: &mut [u8]) {
    const PLACEHOLDER: u32 = u32::MAX;

    if wav.len() < 12 || &wav[0..4] != b"RIFF" || &wav[8..12] != b"WAVE" {
        return;
    }
    let total = wav.len();

    let stated = u32::from_le_bytes([wav[4], wav[5], wav[6], wav[7]]);
    if stated == PLACEHOLDER || stated as usize + 8 > total {
        let fixed = (total - 8) as u32;
        wav[4..8].copy_from_slice(&fixed.to_le_bytes());
    }

    // Walk chunks; the data chunk is last in a streamed WAV.
    let mut pos = 12;
    while pos + 8 <= total {
        let chunk_size = u32::from_le_bytes([
            wav[pos + 4],
            wav[pos + 5],
            wav[pos + 6],
            wav[pos + 7],
        ]);
        let data_start = pos + 8;

        if &wav[pos..pos + 4] == b"data" {
            if chunk_size == PLACEHOLDER || data_start + chunk_size as usize > total {
                let actual = (total - data_start) as u32;
                wav[pos + 4..pos + 8].copy_from_slice(&actual.to_le_bytes());
            }
            return;
        }

        pos = data_start + chunk_size as usize + (chunk_size as usize & 1);
    }
}

/// Parses canonical PCM bytes into a normalized waveform buffer.
///
/// Accepts a RIFF/WAVE stream of 16-bit integer samples, deinterleaves it
/// into per-channel buffers, and duplicates a single mono channel into both
/// output channels. Channel counts other than 1 or 2 are passed through
/// unchanged; the canonical ffmpeg invocation never produces them, so they
/// only appear with a non-default codec backend.
pub fn load(pcm_bytes: &[u8]) -> IngestResult<WaveformBuffer> {
    let mut reader = hound::WavReader::new(Cursor::new(pcm_bytes))?;
    let spec = reader.spec();

    if spec.sample_format != hound::SampleFormat::Int || spec.bits_per_sample != 16 {
        return Err(IngestError::unsupported_format(format!(
            "expected 16-bit integer PCM, got {}-bit {:?}",
            spec.bits_per_sample, spec.sample_format
        )));
    }
    if spec.channels == 0 {
        return Err(IngestError::unsupported_format("zero channels"));
    }

    let channel_count = spec.channels as usize;
    let mut channels: Vec<Vec<f32>> = vec![Vec::new(); channel_count];

    for (i, sample) in reader.samples::<i16>().enumerate() {
        let sample = sample?;
        channels[i % channel_count].push(sample as f32 / 32768.0);
    }

    // Interleaved data may end mid-frame on a truncated stream; drop the
    // ragged tail so all channels stay equal length.
    let frames = channels.iter().map(Vec::len).min().unwrap_or(0);
    for channel in &mut channels {
        channel.truncate(frames);
    }

    if channel_count == 1 {
        let duplicate = channels[0].clone();
        channels.push(duplicate);
    } else if channel_count > 2 {
        tracing::warn!(
            channels = channel_count,
            "unusual channel count passed through without normalization"
        );
    }

    Ok(WaveformBuffer {
        channels,
        sample_rate: spec.sample_rate,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::wav_fixture;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_mono_is_duplicated_into_stereo() {
        let samples = vec![0i16, 1000, -1000, i16::MAX, i16::MIN];
        let wav = wav_fixture(1, 44_100, &[&samples]);

        let buffer = load(&wav).unwrap();
        assert_eq!(buffer.shape(), [1, 2, 5]);
        assert_eq!(buffer.channel(0), buffer.channel(1));
        assert_eq!(buffer.sample_rate, 44_100);
    }

    #[test]
    fn test_stereo_passes_through_unchanged() {
        let left = vec![100i16, 200, 300];
        let right = vec![-100i16, -200, -300];
        let wav = wav_fixture(2, 44_100, &[&left, &right]);

        let buffer = load(&wav).unwrap();
        assert_eq!(buffer.shape(), [1, 2, 3]);
        assert_eq!(buffer.channel(0)[1], 200.0 / 32768.0);
        assert_eq!(buffer.channel(1)[1], -200.0 / 32768.0);
    }

    #[test]
    fn test_three_channels_pass_through() {
        let a = vec![1i16, 2];
        let wav = wav_fixture(3, 48_000, &[&a, &a, &a]);

        let buffer = load(&wav).unwrap();
        assert_eq!(buffer.shape(), [1, 3, 2]);
        assert_eq!(buffer.sample_rate, 48_000);
    }

    // Patches a fixture the way ffmpeg's WAV muxer emits it over a pipe.
    fn with_placeholder_sizes(mut wav: Vec<u8>) -> Vec<u8> {
        wav[4..8].copy_from_slice(&u32::MAX.to_le_bytes());
        let data_pos = wav.windows(4).position(|w| w == b"data").unwrap();
        wav[data_pos + 4..data_pos + 8].copy_from_slice(&u32::MAX.to_le_bytes());
        wav
    }

    #[test]
    fn test_repair_recovers_piped_ffmpeg_output() {
        let samples = vec![0i16, 500, -500, 1000];
        let pristine = wav_fixture(2, 44_100, &[&samples, &samples]);
        let mut streamed = with_placeholder_sizes(pristine.clone());

        repair_streamed_sizes(&mut streamed);
        assert_eq!(streamed, pristine);
        assert_eq!(load(&streamed).unwrap(), load(&pristine).unwrap());
    }

    #[test]
    fn test_repair_fixes_data_size_past_the_buffer_end() {
        let samples = vec![0i16; 10];
        let pristine = wav_fixture(1, 44_100, &[&samples]);
        let mut wav = pristine.clone();
        let data_pos = wav.windows(4).position(|w| w == b"data").unwrap();
        wav[data_pos + 4..data_pos + 8].copy_from_slice(&9000u32.to_le_bytes());

        repair_streamed_sizes(&mut wav);
        assert_eq!(wav, pristine);
    }

    #[test]
    fn test_repair_is_a_no_op_on_well_formed_streams() {
        let samples = vec![1i16, 2, 3];
        let pristine = wav_fixture(2, 44_100, &[&samples, &samples]);
        let mut wav = pristine.clone();

        repair_streamed_sizes(&mut wav);
        assert_eq!(wav, pristine);
    }

    #[test]
    fn test_repair_leaves_non_riff_bytes_alone() {
        let mut bytes = b"definitely not a RIFF stream".to_vec();
        let before = bytes.clone();
        repair_streamed_sizes(&mut bytes);
        assert_eq!(bytes, before);
    }

    #[test]
    fn test_malformed_bytes_are_a_decode_error() {
        let err = load(b"definitely not a RIFF stream").unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::Decode);
    }

    #[test]
    fn test_sample_values_are_normalized() {
        let samples = vec![i16::MIN, 0, i16::MAX];
        let wav = wav_fixture(1, 44_100, &[&samples]);

        let buffer = load(&wav).unwrap();
        assert_eq!(buffer.channel(0)[0], -1.0);
        assert_eq!(buffer.channel(0)[1], 0.0);
        assert!((buffer.channel(0)[2] - 32767.0 / 32768.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_duration() {
        let samples = vec![0i16; 44_100];
        let wav = wav_fixture(1, 44_100, &[&samples]);

        let buffer = load(&wav).unwrap();
        assert!((buffer.duration_seconds() - 1.0).abs() < 1e-9);
    }
}
