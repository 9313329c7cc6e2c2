//! Backoff policy and the sleeping seam.
//!
//! All waits in the relay go through a [`Sleeper`] so the retry state machine
//! can be driven in tests without wall-clock delays.

use async_trait::async_trait;
use std::time::Duration;

/// Configuration for same-credential retries of transient failures.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Backoff retries allowed per credential before rotating away from it.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(300),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Self::default()
        }
    }

    pub fn with_max_delay(mut self, max_delay: Duration) -> Self {
        self.max_delay = max_delay;
        self
    }

    /// Exponential backoff: base * 2^retry, capped at `max_delay`.
    pub fn backoff(&self, retry: u32) -> Duration {
        let base = self.base_delay.as_millis().min(u64::MAX as u128) as u64;
        let cap = self.max_delay.as_millis().min(u64::MAX as u128) as u64;
        let factor = 1u64.checked_shl(retry).unwrap_or(u64::MAX);
        Duration::from_millis(base.saturating_mul(factor).min(cap))
    }
}

#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Real waits on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        if !duration.is_zero() {
            tokio::time::sleep(duration).await;
        }
    }
}
