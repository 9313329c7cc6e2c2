//! 弹性模块：凭据轮换与指数退避的请求执行器。
//!
//! # Resilience Module
//!
//! | Component | Description |
//! |-----------|-------------|
//! | [`retry`] | Backoff policy and the [`Sleeper`] seam |
//! | [`executor`] | Per-segment rotation/backoff state machine |
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use std::time::Duration;
//! use tts_relay::credentials::CredentialPool;
//! use tts_relay::resilience::{RequestExecutor, RetryPolicy, TokioSleeper};
//! use tts_relay::speech::{GeminiTtsClient, VoiceParameters};
//!
//! # async fn demo() -> tts_relay::Result<()> {
//! let pool = CredentialPool::from_file("api-keys.txt")?;
//! let backend = Arc::new(GeminiTtsClient::builder().build()?);
//! let mut executor = RequestExecutor::new(
//!     pool,
//!     backend,
//!     RetryPolicy::new(5, Duration::from_secs(5)),
//!     Arc::new(TokioSleeper),
//! );
//! let _pcm = executor.execute("Halo semuanya.", &VoiceParameters::default()).await?;
//! # Ok(())
//! # }
//! ```

pub mod executor;
pub mod retry;

pub use executor::RequestExecutor;
pub use retry::{RetryPolicy, Sleeper, TokioSleeper};
