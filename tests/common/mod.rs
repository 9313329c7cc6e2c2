//! Mock Gemini server fixture shared by the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use base64::Engine;
use mockito::{Matcher, Mock, Server, ServerGuard};
use std::sync::Mutex;
use std::time::Duration;
use tts_relay::resilience::Sleeper;
use tts_relay::speech::{GeminiTtsClient, DEFAULT_MODEL};

pub const GENERATE_PATH: &str = "/v1beta/models/gemini-2.5-flash-preview-tts:generateContent";

/// Test fixture that owns a mock Gemini endpoint
pub struct GeminiFixture {
    pub server: ServerGuard,
}

impl GeminiFixture {
    pub async fn new() -> Self {
        Self {
            server: Server::new_async().await,
        }
    }

    pub fn client(&self) -> GeminiTtsClient {
        GeminiTtsClient::builder()
            .model(DEFAULT_MODEL)
            .base_url(self.server.url())
            .timeout(Duration::from_secs(5))
            .build()
            .expect("client builds")
    }

    /// 200 carrying `samples` as base64 s16le, for requests made with `key`.
    /// Returned uncreated so callers can set hit expectations first.
    pub fn audio(&mut self, key: &str, text: Option<&str>, samples: &[i16]) -> Mock {
        let body = serde_json::json!({
            "candidates": [{
                "content": {
                    "parts": [{
                        "inlineData": {
                            "mimeType": "audio/L16;codec=pcm;rate=24000",
                            "data": encode_samples(samples)
                        }
                    }]
                },
                "finishReason": "STOP"
            }]
        });
        let mut mock = self
            .server
            .mock("POST", GENERATE_PATH)
            .match_header("x-goog-api-key", key);
        if let Some(text) = text {
            mock = mock.match_body(Matcher::Regex(format!(
                r#""text":"{}""#,
                regex::escape(text)
            )));
        }
        mock.with_status(200)
            .with_header("content-type", "application/json")
            .with_body(body.to_string())
    }

    pub fn error(&mut self, key: &str, status: usize, body: &str) -> Mock {
        self.server
            .mock("POST", GENERATE_PATH)
            .match_header("x-goog-api-key", key)
            .with_status(status)
            .with_header("content-type", "application/json")
            .with_body(body)
    }

    pub fn quota(&mut self, key: &str) -> Mock {
        self.error(
            key,
            429,
            r#"{"error":{"code":429,"message":"Resource has been exhausted (e.g. check quota).","status":"RESOURCE_EXHAUSTED"}}"#,
        )
    }
}

pub fn encode_samples(samples: &[i16]) -> String {
    let pcm: Vec<u8> = samples.iter().flat_map(|s| s.to_le_bytes()).collect();
    base64::engine::general_purpose::STANDARD.encode(pcm)
}

/// Records requested waits without sleeping.
#[derive(Default)]
pub struct InstantSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl InstantSleeper {
    pub fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for InstantSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}
