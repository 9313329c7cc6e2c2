//! 远程语音生成接口：请求参数、失败分类与 Gemini HTTP 客户端。
//!
//! Remote speech generation seam.
//!
//! The relay only depends on a narrow contract: send text plus voice settings
//! with one credential, get back raw PCM bytes or an error classified as
//! quota exhaustion, transient, or other. [`SpeechBackend`] is that contract;
//! [`GeminiTtsClient`] is the production implementation.

mod classification;
mod gemini;

pub use classification::{classify_status, transport_failure};
pub use gemini::{GeminiTtsClient, GeminiTtsClientBuilder, DEFAULT_MODEL, DEFAULT_TIMEOUT_SECS};

use crate::credentials::Credential;
use crate::Result;
use async_trait::async_trait;
use std::fmt;

/// Ternary classification of a failed remote call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailureClass {
    /// The credential has no allowance left for the current period.
    QuotaExhausted,
    /// Likely to heal on its own (overload, 5xx, timeouts).
    Transient,
    /// Anything else the remote side rejected.
    Other,
}

impl FailureClass {
    pub fn name(&self) -> &'static str {
        match self {
            Self::QuotaExhausted => "quota_exhausted",
            Self::Transient => "transient",
            Self::Other => "other",
        }
    }
}

impl fmt::Display for FailureClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Voice settings held fixed for every segment of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct VoiceParameters {
    pub voice: String,
    pub temperature: f32,
}

impl VoiceParameters {
    pub fn new(voice: impl Into<String>, temperature: f32) -> Self {
        Self {
            voice: voice.into(),
            temperature,
        }
    }
}

impl Default for VoiceParameters {
    fn default() -> Self {
        Self::new("Kore", 0.7)
    }
}

/// One remote generation call.
///
/// Implementations return raw 16-bit mono 24 kHz PCM on success. Request-level
/// failures must be reported as [`crate::Error::Remote`] or
/// [`crate::Error::MalformedResponse`]; any other error variant is treated as
/// unexpected and aborts the segment without retrying.
#[async_trait]
pub trait SpeechBackend: Send + Sync {
    async fn generate(
        &self,
        credential: &Credential,
        text: &str,
        voice: &VoiceParameters,
    ) -> Result<Vec<u8>>;

    fn name(&self) -> &'static str;
}
