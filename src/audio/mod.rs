//! Audio artifacts: the fixed PCM contract, per-segment WAV files and the
//! final assembly.
//!
//! Every payload returned by the generation API is raw little-endian 16-bit
//! mono PCM at 24 kHz. Segment artifacts are named `{basename}_{index:02}.wav`.

mod assembler;
mod encoder;
mod writer;

pub use assembler::{AssemblyReport, AudioAssembler};
pub use encoder::OutputEncoder;
pub use writer::{artifact_stem, Artifact, SegmentWriter};

use crate::Error;

pub const SAMPLE_RATE: u32 = 24_000;
pub const CHANNELS: u16 = 1;
pub const BITS_PER_SAMPLE: u16 = 16;
pub const ARTIFACT_EXTENSION: &str = "wav";

/// The only container layout the relay reads or writes.
pub fn pcm_spec() -> hound::WavSpec {
    hound::WavSpec {
        channels: CHANNELS,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: BITS_PER_SAMPLE,
        sample_format: hound::SampleFormat::Int,
    }
}

pub(crate) fn describe_spec(spec: &hound::WavSpec) -> String {
    let format = match spec.sample_format {
        hound::SampleFormat::Int => "int",
        hound::SampleFormat::Float => "float",
    };
    format!(
        "{} ch, {}-bit {}, {} Hz",
        spec.channels, spec.bits_per_sample, format, spec.sample_rate
    )
}

/// Decode raw s16le bytes. A dangling odd byte is dropped.
pub fn pcm_to_samples(pcm: &[u8]) -> Vec<i16> {
    pcm.chunks_exact(2)
        .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
        .collect()
}

pub fn samples_to_pcm(samples: &[i16]) -> Vec<u8> {
    samples.iter().flat_map(|s| s.to_le_bytes()).collect()
}

/// hound wraps I/O failures in its own error; surface those as plain I/O.
pub(crate) fn codec_error(err: hound::Error) -> Error {
    match err {
        hound::Error::IoError(io) => Error::Io(io),
        other => Error::Codec(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pcm_decoding_is_little_endian() {
        assert_eq!(pcm_to_samples(&[0x01, 0x00, 0xff, 0xff, 0x07]), vec![1, -1]);
        assert_eq!(samples_to_pcm(&[1, -1]), vec![0x01, 0x00, 0xff, 0xff]);
    }

    #[test]
    fn test_describe_spec() {
        assert_eq!(describe_spec(&pcm_spec()), "1 ch, 16-bit int, 24000 Hz");
    }
}
