//! Run configuration.
//!
//! Layering, lowest to highest: built-in defaults, an optional YAML file,
//! `TTS_RELAY_*` environment variables, then command-line flags (applied by
//! the binary).

use crate::orchestrator::DEFAULT_REQUEST_PAUSE;
use crate::resilience::RetryPolicy;
use crate::segment::TextSegmenter;
use crate::speech::{VoiceParameters, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};
use crate::{Error, ErrorContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RunConfig {
    /// Inline script. Takes precedence over `text_file`.
    pub text: Option<String>,
    pub text_file: Option<PathBuf>,
    pub voice: String,
    pub temperature: f32,
    pub model: String,
    /// Artifact base name; segments become `{basename}_{index:02}.wav`.
    pub basename: String,
    pub output_dir: PathBuf,
    pub max_chars: usize,
    /// Group whole lines instead of bounding by characters.
    pub paragraphs_per_chunk: Option<usize>,
    pub max_retries: u32,
    pub base_delay_secs: f64,
    pub max_delay_secs: f64,
    pub request_pause_ms: u64,
    pub output: PathBuf,
    pub delete_intermediates: bool,
    pub credentials_file: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub api_base_url: Option<String>,
    pub timeout_secs: u64,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            text: None,
            text_file: None,
            voice: "Kore".to_string(),
            temperature: 0.7,
            model: DEFAULT_MODEL.to_string(),
            basename: "narration".to_string(),
            output_dir: PathBuf::from("."),
            max_chars: 4800,
            paragraphs_per_chunk: None,
            max_retries: 5,
            base_delay_secs: 5.0,
            max_delay_secs: 300.0,
            request_pause_ms: DEFAULT_REQUEST_PAUSE.as_millis() as u64,
            output: PathBuf::from("final_narration.wav"),
            delete_intermediates: true,
            credentials_file: PathBuf::from("api-keys.txt"),
            ffmpeg_path: PathBuf::from("ffmpeg"),
            api_base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }
}

impl RunConfig {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| {
            Error::configuration_with_context(
                format!("invalid run configuration: {}", e),
                ErrorContext::new().with_source("run_config"),
            )
        })
    }

    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path).map_err(|e| {
            Error::configuration_with_context(
                format!("cannot read config file: {}", e),
                ErrorContext::new()
                    .with_details(path.display().to_string())
                    .with_source("run_config"),
            )
        })?;
        Self::from_yaml_str(&contents)
    }

    /// Overlay `TTS_RELAY_*` variables from the process environment.
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_from(|key| std::env::var(key).ok())
    }

    pub fn apply_env_from<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("TTS_RELAY_VOICE") {
            self.voice = v;
        }
        if let Some(v) = lookup("TTS_RELAY_MODEL") {
            self.model = v;
        }
        if let Some(v) = lookup("TTS_RELAY_BASENAME") {
            self.basename = v;
        }
        if let Some(v) = lookup("TTS_RELAY_OUTPUT_DIR") {
            self.output_dir = PathBuf::from(v);
        }
        if let Some(v) = lookup("TTS_RELAY_CREDENTIALS_FILE") {
            self.credentials_file = PathBuf::from(v);
        }
        if let Some(v) = lookup("TTS_RELAY_API_BASE_URL") {
            self.api_base_url = Some(v);
        }
        if let Some(v) = lookup("TTS_RELAY_FFMPEG_PATH").or_else(|| lookup("FFMPEG_PATH")) {
            self.ffmpeg_path = PathBuf::from(v);
        }
        if let Some(v) = lookup("TTS_RELAY_TEMPERATURE") {
            self.temperature = parse_var("TTS_RELAY_TEMPERATURE", &v)?;
        }
        if let Some(v) = lookup("TTS_RELAY_MAX_CHARS") {
            self.max_chars = parse_var("TTS_RELAY_MAX_CHARS", &v)?;
        }
        if let Some(v) = lookup("TTS_RELAY_MAX_RETRIES") {
            self.max_retries = parse_var("TTS_RELAY_MAX_RETRIES", &v)?;
        }
        if let Some(v) = lookup("TTS_RELAY_BASE_DELAY_SECS") {
            self.base_delay_secs = parse_var("TTS_RELAY_BASE_DELAY_SECS", &v)?;
        }
        if let Some(v) = lookup("TTS_RELAY_REQUEST_PAUSE_MS") {
            self.request_pause_ms = parse_var("TTS_RELAY_REQUEST_PAUSE_MS", &v)?;
        }
        if let Some(v) = lookup("TTS_RELAY_HTTP_TIMEOUT_SECS") {
            self.timeout_secs = parse_var("TTS_RELAY_HTTP_TIMEOUT_SECS", &v)?;
        }
        Ok(())
    }

    /// Check field ranges. Script text is not required here; `load_text`
    /// rejects a missing script for the commands that need one, so
    /// `assemble` runs without it.
    pub fn validate(&self) -> Result<()> {
        if self.max_chars == 0 {
            return Err(invalid("max_chars", "must be at least 1"));
        }
        if self.paragraphs_per_chunk == Some(0) {
            return Err(invalid("paragraphs_per_chunk", "must be at least 1"));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(invalid("temperature", "must be a non-negative number"));
        }
        if !self.base_delay_secs.is_finite() || self.base_delay_secs < 0.0 {
            return Err(invalid("base_delay_secs", "must be a non-negative number"));
        }
        if !self.max_delay_secs.is_finite() || self.max_delay_secs < self.base_delay_secs {
            return Err(invalid("max_delay_secs", "must be at least base_delay_secs"));
        }
        if self.voice.trim().is_empty() {
            return Err(invalid("voice", "must not be empty"));
        }
        if self.basename.trim().is_empty() {
            return Err(invalid("basename", "must not be empty"));
        }
        Ok(())
    }

    /// Resolve the script text from `text` or `text_file`.
    pub fn load_text(&self) -> Result<String> {
        if let Some(text) = &self.text {
            return Ok(text.clone());
        }
        match &self.text_file {
            Some(path) => std::fs::read_to_string(path).map_err(|e| {
                Error::configuration_with_context(
                    format!("cannot read text file: {}", e),
                    ErrorContext::new()
                        .with_field_path("text_file")
                        .with_details(path.display().to_string()),
                )
            }),
            None => Err(invalid("text", "either text or text_file is required")),
        }
    }

    pub fn segmenter(&self) -> Result<TextSegmenter> {
        match self.paragraphs_per_chunk {
            Some(n) => TextSegmenter::paragraphs(n),
            None => TextSegmenter::new(self.max_chars),
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, secs(self.base_delay_secs))
            .with_max_delay(secs(self.max_delay_secs))
    }

    pub fn voice_parameters(&self) -> VoiceParameters {
        VoiceParameters::new(self.voice.clone(), self.temperature)
    }

    pub fn request_pause(&self) -> Duration {
        Duration::from_millis(self.request_pause_ms)
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn invalid(field: &str, msg: &str) -> Error {
    Error::validation_with_context(
        format!("{} {}", field, msg),
        ErrorContext::new()
            .with_field_path(field)
            .with_source("run_config"),
    )
}

fn secs(value: f64) -> Duration {
    Duration::try_from_secs_f64(value).unwrap_or(Duration::ZERO)
}

fn parse_var<T: FromStr>(key: &str, value: &str) -> Result<T> {
    value.trim().parse::<T>().map_err(|_| {
        Error::configuration_with_context(
            format!("cannot parse environment variable {}", key),
            ErrorContext::new()
                .with_field_path(key)
                .with_details(value.to_string()),
        )
    })
}
