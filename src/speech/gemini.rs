//! Google Gemini speech generation driver.
//!
//! Key differences from chat-style generation:
//! - `generationConfig.responseModalities` must be `["AUDIO"]`.
//! - The voice is a prebuilt voice name nested under `speechConfig`.
//! - Audio comes back base64-encoded at
//!   `candidates[0].content.parts[0].inlineData.data` (raw s16le, 24 kHz, mono).
//! - The key travels in the `x-goog-api-key` header.

use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use std::time::Duration;

use super::classification::{classify_status, transport_failure};
use super::{SpeechBackend, VoiceParameters};
use crate::credentials::Credential;
use crate::{Error, ErrorContext, Result};

pub const DEFAULT_MODEL: &str = "gemini-2.5-flash-preview-tts";
const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com";
const AUDIO_DATA_POINTER: &str = "/candidates/0/content/parts/0/inlineData/data";
pub const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// HTTP client for Gemini text-to-speech.
pub struct GeminiTtsClient {
    http_client: reqwest::Client,
    model: String,
    base_url: String,
}

impl GeminiTtsClient {
    pub fn builder() -> GeminiTtsClientBuilder {
        GeminiTtsClientBuilder::new()
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    fn endpoint(&self) -> String {
        format!(
            "{}/v1beta/models/{}:generateContent",
            self.base_url.trim_end_matches('/'),
            self.model
        )
    }

    fn build_body(text: &str, voice: &VoiceParameters) -> Value {
        serde_json::json!({
            "contents": [{ "parts": [{ "text": text }] }],
            "generationConfig": {
                "temperature": voice.temperature,
                "responseModalities": ["AUDIO"],
                "speechConfig": {
                    "voiceConfig": {
                        "prebuiltVoiceConfig": { "voiceName": voice.voice }
                    }
                }
            }
        })
    }

    /// Pull the PCM payload out of a success body.
    fn parse_audio(body: &[u8]) -> Result<Vec<u8>> {
        let json: Value = serde_json::from_slice(body)
            .map_err(|e| Error::malformed(format!("response is not JSON: {}", e)))?;
        let encoded = json
            .pointer(AUDIO_DATA_POINTER)
            .and_then(|v| v.as_str())
            .ok_or_else(|| {
                let reason = json
                    .pointer("/candidates/0/finishReason")
                    .and_then(|v| v.as_str())
                    .unwrap_or("none");
                Error::malformed(format!("no inline audio data (finishReason: {})", reason))
            })?;
        let audio = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .map_err(|e| Error::malformed(format!("audio data is not valid base64: {}", e)))?;
        if audio.is_empty() {
            return Err(Error::malformed("inline audio data is empty"));
        }
        Ok(audio)
    }
}

#[async_trait]
impl SpeechBackend for GeminiTtsClient {
    async fn generate(
        &self,
        credential: &Credential,
        text: &str,
        voice: &VoiceParameters,
    ) -> Result<Vec<u8>> {
        let response = self
            .http_client
            .post(self.endpoint())
            .header("x-goog-api-key", credential.expose())
            .header("Content-Type", "application/json")
            .json(&Self::build_body(text, voice))
            .send()
            .await
            .map_err(transport_failure)?;

        let status = response.status();
        let bytes = response.bytes().await.map_err(transport_failure)?;
        if !status.is_success() {
            let body_str = String::from_utf8_lossy(&bytes);
            let class = classify_status(status.as_u16(), &body_str);
            return Err(Error::remote(
                class,
                Some(status.as_u16()),
                error_message(&body_str),
            ));
        }
        Self::parse_audio(&bytes)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

/// Prefer the API's own `error.message`; fall back to the raw body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            v.pointer("/error/message")
                .and_then(|m| m.as_str())
                .map(String::from)
        })
        .unwrap_or_else(|| body.trim().to_string())
}

pub struct GeminiTtsClientBuilder {
    model: Option<String>,
    base_url: Option<String>,
    timeout_secs: u64,
}

impl GeminiTtsClientBuilder {
    pub fn new() -> Self {
        Self {
            model: None,
            base_url: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout_secs = timeout.as_secs().max(1);
        self
    }

    pub fn build(self) -> Result<GeminiTtsClient> {
        let model = self.model.unwrap_or_else(|| DEFAULT_MODEL.to_string());
        if model.trim().is_empty() {
            return Err(Error::configuration_with_context(
                "model must not be empty",
                ErrorContext::new()
                    .with_field_path("model")
                    .with_source("gemini_tts"),
            ));
        }
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(self.timeout_secs))
            .build()
            .map_err(|e| Error::configuration(format!("Failed to create HTTP client: {}", e)))?;
        Ok(GeminiTtsClient {
            http_client,
            model,
            base_url,
        })
    }
}

impl Default for GeminiTtsClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
