//! # tts-relay
//!
//! 长文本语音合成调度：按句切分、多密钥轮换重试、按序拼接音频。
//!
//! Resilient long-form text-to-speech against a quota-limited generation API.
//!
//! ## Overview
//!
//! A script is cut into bounded segments, each segment is synthesized by one
//! remote call, and the resulting audio files are stitched back together in
//! order. The interesting part is failure handling: every API key has its own
//! quota, so the relay rotates through a pool of keys on quota errors and
//! backs off on the same key for transient ones.
//!
//! ## Pipeline
//!
//! ```text
//! text ─► TextSegmenter ─► [RequestExecutor ─► SegmentWriter] per segment ─► AudioAssembler ─► output
//!                               │
//!                               └── CredentialPool (round-robin cursor)
//! ```
//!
//! Processing is strictly sequential: one request in flight at a time, with a
//! fixed pause between segments.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use tts_relay::audio::{AudioAssembler, SegmentWriter};
//! use tts_relay::credentials::CredentialPool;
//! use tts_relay::resilience::{RequestExecutor, RetryPolicy, TokioSleeper};
//! use tts_relay::segment::TextSegmenter;
//! use tts_relay::speech::{GeminiTtsClient, VoiceParameters};
//! use tts_relay::Orchestrator;
//!
//! #[tokio::main]
//! async fn main() -> tts_relay::Result<()> {
//!     let sleeper = Arc::new(TokioSleeper);
//!     let executor = RequestExecutor::new(
//!         CredentialPool::from_file("api-keys.txt")?,
//!         Arc::new(GeminiTtsClient::builder().build()?),
//!         RetryPolicy::default(),
//!         sleeper.clone(),
//!     );
//!     let mut orchestrator = Orchestrator::new(
//!         TextSegmenter::new(4800)?,
//!         executor,
//!         SegmentWriter::new("out"),
//!         sleeper,
//!     );
//!     orchestrator
//!         .run("Halo. Ini contoh narasi.", &VoiceParameters::default(), "narasi")
//!         .await?;
//!     AudioAssembler::new("out").assemble("narasi", "final.wav", true)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Organization
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`credentials`] | Credential pool and rotation cursor |
//! | [`segment`] | Sentence-aware text segmentation |
//! | [`speech`] | Remote generation seam and the Gemini client |
//! | [`resilience`] | Retry policy and the rotation/backoff executor |
//! | [`audio`] | Segment artifacts, assembly and output encoding |
//! | [`orchestrator`] | Sequential run driver |
//! | [`config`] | Layered run configuration |

pub mod audio;
pub mod config;
pub mod credentials;
pub mod orchestrator;
pub mod resilience;
pub mod segment;
pub mod speech;

#[cfg(test)]
mod test_support;

// Re-export main types for convenience
pub use audio::{AudioAssembler, SegmentWriter};
pub use config::RunConfig;
pub use credentials::{Credential, CredentialPool};
pub use orchestrator::{Orchestrator, RunSummary};
pub use resilience::{RequestExecutor, RetryPolicy};
pub use segment::TextSegmenter;
pub use speech::{FailureClass, GeminiTtsClient, SpeechBackend, VoiceParameters};

/// Result type alias for the library
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for the library
pub mod error;
pub use error::{Error, ErrorContext};
