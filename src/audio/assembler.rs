use super::encoder::OutputEncoder;
use super::writer::{artifact_stem, Artifact};
use super::{codec_error, describe_spec, pcm_spec, ARTIFACT_EXTENSION, SAMPLE_RATE};
use crate::{Error, Result};
use regex::Regex;
use std::fmt;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct AssemblyReport {
    pub output: PathBuf,
    pub sources: Vec<PathBuf>,
    pub samples: usize,
    /// Sources that could not be removed after a successful write.
    pub undeleted: Vec<PathBuf>,
}

impl AssemblyReport {
    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples as f64 / SAMPLE_RATE as f64)
    }
}

type RemoveFn = fn(&Path) -> std::io::Result<()>;

/// Concatenates a run's segment artifacts, in index order, into one file.
#[derive(Clone)]
pub struct AudioAssembler {
    dir: PathBuf,
    encoder: OutputEncoder,
    remove: RemoveFn,
}

impl fmt::Debug for AudioAssembler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioAssembler")
            .field("dir", &self.dir)
            .field("encoder", &self.encoder)
            .finish()
    }
}

impl AudioAssembler {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            encoder: OutputEncoder::default(),
            remove: |path| std::fs::remove_file(path),
        }
    }

    pub fn with_encoder(mut self, encoder: OutputEncoder) -> Self {
        self.encoder = encoder;
        self
    }

    #[cfg(test)]
    fn with_remover(mut self, remove: RemoveFn) -> Self {
        self.remove = remove;
        self
    }

    fn pattern(basename: &str) -> String {
        format!("{}_*.{}", artifact_stem(basename), ARTIFACT_EXTENSION)
    }

    /// Find every `{basename}_{index}.wav` in the directory, sorted by index.
    pub fn discover(&self, basename: &str) -> Result<Vec<Artifact>> {
        let matcher = Regex::new(&format!(
            r"^{}_(\d+)\.{}$",
            regex::escape(&artifact_stem(basename)),
            ARTIFACT_EXTENSION
        ))
        .map_err(|e| Error::configuration(format!("invalid artifact pattern: {}", e)))?;

        let entries = match std::fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut artifacts = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else { continue };
            let Some(index) = matcher
                .captures(name)
                .and_then(|c| c.get(1))
                .and_then(|m| m.as_str().parse::<usize>().ok())
            else {
                continue;
            };
            if entry.file_type()?.is_file() {
                artifacts.push(Artifact {
                    index,
                    path: entry.path(),
                });
            }
        }
        artifacts.sort_by(|a, b| a.index.cmp(&b.index).then_with(|| a.path.cmp(&b.path)));
        Ok(artifacts)
    }

    /// Concatenate all artifacts of `basename` into `output`.
    ///
    /// A relative `output` is placed in the artifact directory. Nothing is
    /// written when no artifact matches. Source deletion happens only after the
    /// output exists, and deletion failures are logged rather than returned.
    pub fn assemble(
        &self,
        basename: &str,
        output: impl AsRef<Path>,
        delete_sources: bool,
    ) -> Result<AssemblyReport> {
        let output = if output.as_ref().is_absolute() {
            output.as_ref().to_path_buf()
        } else {
            self.dir.join(output.as_ref())
        };

        let artifacts: Vec<Artifact> = self
            .discover(basename)?
            .into_iter()
            .filter(|a| a.path != output)
            .collect();
        if artifacts.is_empty() {
            let pattern = self.dir.join(Self::pattern(basename));
            warn!(pattern = %pattern.display(), "no artifacts to assemble");
            return Err(Error::NoArtifactsFound {
                pattern: pattern.display().to_string(),
            });
        }
        info!(count = artifacts.len(), output = %output.display(), "assembling artifacts");

        let expected = pcm_spec();
        let mut samples: Vec<i16> = Vec::new();
        for artifact in &artifacts {
            debug!(index = artifact.index, path = %artifact.path.display(), "appending artifact");
            let mut reader = hound::WavReader::open(&artifact.path).map_err(codec_error)?;
            let spec = reader.spec();
            if spec != expected {
                return Err(Error::FormatMismatch {
                    path: artifact.path.display().to_string(),
                    expected: describe_spec(&expected),
                    found: describe_spec(&spec),
                });
            }
            for sample in reader.samples::<i16>() {
                samples.push(sample.map_err(codec_error)?);
            }
        }

        self.encoder.encode(&samples, &output)?;

        let sources: Vec<PathBuf> = artifacts.into_iter().map(|a| a.path).collect();
        let mut undeleted = Vec::new();
        if delete_sources {
            for path in &sources {
                match (self.remove)(path) {
                    Ok(()) => debug!(path = %path.display(), "removed segment artifact"),
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "failed to remove segment artifact");
                        undeleted.push(path.clone());
                    }
                }
            }
        }

        let report = AssemblyReport {
            output,
            sources,
            samples: samples.len(),
            undeleted,
        };
        info!(
            output = %report.output.display(),
            sources = report.sources.len(),
            seconds = report.duration().as_secs_f64(),
            "assembly complete"
        );
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::{samples_to_pcm, SegmentWriter};

    fn read_samples(path: &Path) -> Vec<i16> {
        let mut reader = hound::WavReader::open(path).unwrap();
        reader.samples::<i16>().map(|s| s.unwrap()).collect()
    }

    #[test]
    fn test_concatenates_in_index_order_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SegmentWriter::new(dir.path());
        // written out of order on purpose
        writer.write("base", 3, &samples_to_pcm(&[30, 31])).unwrap();
        writer.write("base", 1, &samples_to_pcm(&[10])).unwrap();
        writer.write("base", 2, &samples_to_pcm(&[20, 21, 22])).unwrap();

        let report = AudioAssembler::new(dir.path())
            .assemble("base", "final.wav", true)
            .unwrap();

        assert_eq!(read_samples(&report.output), vec![10, 20, 21, 22, 30, 31]);
        assert_eq!(report.sources.len(), 3);
        assert!(report.undeleted.is_empty());
        for i in 1..=3 {
            assert!(!writer.artifact_path("base", i).exists());
        }
    }

    #[test]
    fn test_keep_sources_when_requested() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SegmentWriter::new(dir.path());
        writer.write("base", 1, &samples_to_pcm(&[1])).unwrap();
        AudioAssembler::new(dir.path())
            .assemble("base", "final.wav", false)
            .unwrap();
        assert!(writer.artifact_path("base", 1).exists());
    }

    #[test]
    fn test_numeric_order_past_two_digits() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SegmentWriter::new(dir.path());
        writer.write("base", 100, &samples_to_pcm(&[100])).unwrap();
        writer.write("base", 99, &samples_to_pcm(&[99])).unwrap();
        let found: Vec<usize> = AudioAssembler::new(dir.path())
            .discover("base")
            .unwrap()
            .into_iter()
            .map(|a| a.index)
            .collect();
        assert_eq!(found, vec![99, 100]);
    }

    #[test]
    fn test_ignores_other_runs_and_non_indexed_files() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SegmentWriter::new(dir.path());
        writer.write("base", 1, &samples_to_pcm(&[1])).unwrap();
        writer.write("base_extra", 1, &samples_to_pcm(&[2])).unwrap();
        std::fs::write(dir.path().join("base_final.wav"), b"not audio").unwrap();
        let found = AudioAssembler::new(dir.path()).discover("base").unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].index, 1);
    }

    #[test]
    fn test_deletion_failure_is_reported_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SegmentWriter::new(dir.path());
        for i in 1..=3 {
            writer.write("base", i, &samples_to_pcm(&[i as i16])).unwrap();
        }

        let report = AudioAssembler::new(dir.path())
            .with_remover(|path| {
                if path.ends_with("base_02.wav") {
                    Err(std::io::Error::new(
                        std::io::ErrorKind::PermissionDenied,
                        "read-only",
                    ))
                } else {
                    std::fs::remove_file(path)
                }
            })
            .assemble("base", "final.wav", true)
            .unwrap();

        assert_eq!(read_samples(&report.output), vec![1, 2, 3]);
        assert_eq!(report.undeleted, vec![writer.artifact_path("base", 2)]);
        assert!(!writer.artifact_path("base", 1).exists());
        assert!(writer.artifact_path("base", 2).exists());
        assert!(!writer.artifact_path("base", 3).exists());
    }

    #[test]
    fn test_no_artifacts_performs_no_writes() {
        let dir = tempfile::tempdir().unwrap();
        let err = AudioAssembler::new(dir.path())
            .assemble("missing", "final.wav", true)
            .unwrap_err();
        assert!(matches!(err, Error::NoArtifactsFound { .. }));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn test_format_mismatch_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let spec = hound::WavSpec {
            channels: 2,
            sample_rate: 44_100,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut wav = hound::WavWriter::create(dir.path().join("base_01.wav"), spec).unwrap();
        wav.write_sample(0i16).unwrap();
        wav.write_sample(0i16).unwrap();
        wav.finalize().unwrap();

        let err = AudioAssembler::new(dir.path())
            .assemble("base", "final.wav", true)
            .unwrap_err();
        assert!(matches!(err, Error::FormatMismatch { .. }));
        assert!(dir.path().join("base_01.wav").exists());
        assert!(!dir.path().join("final.wav").exists());
    }

    #[test]
    fn test_missing_encoder_keeps_sources() {
        let dir = tempfile::tempdir().unwrap();
        let writer = SegmentWriter::new(dir.path());
        writer.write("base", 1, &samples_to_pcm(&[1])).unwrap();
        let err = AudioAssembler::new(dir.path())
            .with_encoder(OutputEncoder::new(dir.path().join("no-ffmpeg-here")))
            .assemble("base", "final.mp3", true)
            .unwrap_err();
        assert!(matches!(err, Error::CodecUnavailable { .. }));
        assert!(writer.artifact_path("base", 1).exists());
    }
}
