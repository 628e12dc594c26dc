//! Test fixtures shared across unit tests.

use std::io::Cursor;

/// Builds an in-memory 16-bit WAV stream from per-channel sample data.
///
/// All channel slices must have equal length; samples are interleaved
/// frame-major the way the canonical transcoder output is.
pub(crate) fn wav_fixture(channels: u16, sample_rate: u32, data: &[&[i16]]) -> Vec<u8> {
    assert_eq!(channels as usize, data.len());
    let frames = data.first().map_or(0, |c| c.len());
    for channel in data {
        assert_eq!(channel.len(), frames);
    }

    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for frame in 0..frames {
            for channel in data {
                writer.write_sample(channel[frame]).unwrap();
            }
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}
