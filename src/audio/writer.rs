use super::{codec_error, pcm_spec, pcm_to_samples, ARTIFACT_EXTENSION};
use crate::{Error, ErrorContext, Result};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A persisted per-segment audio file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub index: usize,
    pub path: PathBuf,
}

/// Base name with any extension removed (`narration.wav` -> `narration`).
pub fn artifact_stem(basename: &str) -> String {
    Path::new(basename)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| basename.to_string())
}

/// Writes one WAV artifact per segment. No retries here; a failed write is
/// reported and earlier artifacts stay where they are.
#[derive(Debug, Clone)]
pub struct SegmentWriter {
    dir: PathBuf,
}

impl SegmentWriter {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn artifact_path(&self, basename: &str, index: usize) -> PathBuf {
        self.dir.join(format!(
            "{}_{:02}.{}",
            artifact_stem(basename),
            index,
            ARTIFACT_EXTENSION
        ))
    }

    pub fn write(&self, basename: &str, index: usize, pcm: &[u8]) -> Result<Artifact> {
        if artifact_stem(basename).is_empty() {
            return Err(Error::validation_with_context(
                "basename must not be empty",
                ErrorContext::new()
                    .with_field_path("basename")
                    .with_source("segment_writer"),
            ));
        }
        if pcm.len() % 2 != 0 {
            warn!(index, bytes = pcm.len(), "odd-length PCM payload, dropping last byte");
        }

        std::fs::create_dir_all(&self.dir)?;
        let path = self.artifact_path(basename, index);
        let mut wav = hound::WavWriter::create(&path, pcm_spec()).map_err(codec_error)?;
        for sample in pcm_to_samples(pcm) {
            wav.write_sample(sample).map_err(codec_error)?;
        }
        wav.finalize().map_err(codec_error)?;

        info!(index, path = %path.display(), bytes = pcm.len(), "saved segment audio");
        Ok(Artifact { index, path })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{samples_to_pcm, SAMPLE_RATE};

    #[test]
    fn test_artifact_naming() {
        let writer = SegmentWriter::new("/tmp/out");
        assert_eq!(
            writer.artifact_path("narasi_tts", 1),
            PathBuf::from("/tmp/out/narasi_tts_01.wav")
        );
        assert_eq!(
            writer.artifact_path("narasi.wav", 12),
            PathBuf::from("/tmp/out/narasi_12.wav")
        );
        assert_eq!(
            writer.artifact_path("long", 123),
            PathBuf::from("/tmp/out/long_123.wav")
        );
    }

    #[test]
    fn test_write_produces_pcm_wav() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SegmentWriter::new(dir.path().join("nested"));
        let pcm = samples_to_pcm(&[0, 100, -100, i16::MAX]);
        let artifact = writer.write("story", 3, &pcm).unwrap();

        assert_eq!(artifact.index, 3);
        let mut reader = hound::WavReader::open(&artifact.path).unwrap();
        let spec = reader.spec();
        assert_eq!(spec.channels, 1);
        assert_eq!(spec.sample_rate, SAMPLE_RATE);
        assert_eq!(spec.bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 100, -100, i16::MAX]);
    }

    #[test]
    fn test_write_failure_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("file");
        std::fs::write(&blocker, b"x").unwrap();
        // the target directory is an existing regular file
        let writer = SegmentWriter::new(&blocker);
        let err = writer.write("story", 1, &[0, 0]).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_empty_basename_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SegmentWriter::new(dir.path());
        assert!(matches!(
            writer.write("", 1, &[0, 0]),
            Err(Error::Validation { .. })
        ));
    }
}
