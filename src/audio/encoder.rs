//! Final output encoding.
//!
//! `.wav` output is written in-process. Any other container is produced by
//! piping raw PCM into an external `ffmpeg`, which must be resolvable at
//! encode time.

use super::{codec_error, pcm_spec, samples_to_pcm, ARTIFACT_EXTENSION, CHANNELS, SAMPLE_RATE};
use crate::{Error, Result};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use tracing::debug;

#[derive(Debug, Clone)]
pub struct OutputEncoder {
    ffmpeg: PathBuf,
}

impl Default for OutputEncoder {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl OutputEncoder {
    pub fn new(ffmpeg: impl Into<PathBuf>) -> Self {
        Self {
            ffmpeg: ffmpeg.into(),
        }
    }

    /// True when `output` needs the external encoder.
    pub fn needs_ffmpeg(output: &Path) -> bool {
        match output.extension().and_then(|e| e.to_str()) {
            None => false,
            Some(ext) => !ext.eq_ignore_ascii_case(ARTIFACT_EXTENSION),
        }
    }

    pub fn encode(&self, samples: &[i16], output: &Path) -> Result<()> {
        if let Some(parent) = output.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        if Self::needs_ffmpeg(output) {
            self.encode_ffmpeg(samples, output)
        } else {
            Self::encode_wav(samples, output)
        }
    }

    fn encode_wav(samples: &[i16], output: &Path) -> Result<()> {
        let mut wav = hound::WavWriter::create(output, pcm_spec()).map_err(codec_error)?;
        for &sample in samples {
            wav.write_sample(sample).map_err(codec_error)?;
        }
        wav.finalize().map_err(codec_error)
    }

    fn encode_ffmpeg(&self, samples: &[i16], output: &Path) -> Result<()> {
        let rate = SAMPLE_RATE.to_string();
        let channels = CHANNELS.to_string();
        let mut child = Command::new(&self.ffmpeg)
            .args(["-hide_banner", "-loglevel", "error", "-y"])
            .args(["-f", "s16le", "-ar", rate.as_str(), "-ac", channels.as_str()])
            .args(["-i", "pipe:0"])
            .arg(output)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                ErrorKind::NotFound | ErrorKind::PermissionDenied => Error::CodecUnavailable {
                    message: format!("cannot run '{}': {}", self.ffmpeg.display(), e),
                },
                _ => Error::Io(e),
            })?;

        debug!(program = %self.ffmpeg.display(), output = %output.display(), "encoding with ffmpeg");
        // stdin is closed when the handle drops; a write error (usually a
        // broken pipe) is reported only after the exit status is known.
        let written = match child.stdin.take() {
            Some(mut stdin) => stdin.write_all(&samples_to_pcm(samples)),
            None => Ok(()),
        };
        let result = child.wait_with_output()?;
        if !result.status.success() {
            return Err(Error::Encoder {
                message: format!(
                    "ffmpeg exited with {}: {}",
                    result.status,
                    String::from_utf8_lossy(&result.stderr).trim()
                ),
            });
        }
        written?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extension_dispatch() {
        assert!(!OutputEncoder::needs_ffmpeg(Path::new("final.wav")));
        assert!(!OutputEncoder::needs_ffmpeg(Path::new("final.WAV")));
        assert!(!OutputEncoder::needs_ffmpeg(Path::new("final")));
        assert!(OutputEncoder::needs_ffmpeg(Path::new("final.mp3")));
    }

    #[test]
    fn test_missing_ffmpeg_is_codec_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let encoder = OutputEncoder::new(dir.path().join("no-such-ffmpeg"));
        let err = encoder
            .encode(&[0, 1, 2], &dir.path().join("final.mp3"))
            .unwrap_err();
        assert!(matches!(err, Error::CodecUnavailable { .. }));
    }

    #[cfg(unix)]
    #[test]
    fn test_ffmpeg_failure_reports_its_stderr() {
        use std::os::unix::fs::PermissionsExt;

        let dir = tempfile::tempdir().unwrap();
        let fake = dir.path().join("ffmpeg");
        std::fs::write(&fake, "#!/bin/sh\necho 'unsupported output format' >&2\nexit 1\n").unwrap();
        std::fs::set_permissions(&fake, std::fs::Permissions::from_mode(0o755)).unwrap();

        // far more than a pipe buffer, so the write hits a closed pipe
        let samples = vec![0i16; 2_000_000];
        let err = OutputEncoder::new(&fake)
            .encode(&samples, &dir.path().join("final.mp3"))
            .unwrap_err();
        match err {
            Error::Encoder { message } => {
                assert!(message.contains("unsupported output format"), "{message}")
            }
            other => panic!("expected Encoder error, got {other:?}"),
        }
    }

    #[test]
    fn test_wav_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let out = dir.path().join("sub").join("final.wav");
        OutputEncoder::default().encode(&[5, -5, 7], &out).unwrap();
        let mut reader = hound::WavReader::open(&out).unwrap();
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![5, -5, 7]);
    }
}
