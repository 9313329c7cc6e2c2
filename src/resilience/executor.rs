//! Request execution: one segment, many credentials.
//!
//! Two nested budgets with different recovery semantics:
//! - the rotation budget (one attempt per credential in the pool), consumed
//!   by quota exhaustion, malformed responses, and by a credential whose
//!   backoff budget is spent;
//! - the backoff budget (`max_retries` per credential), consumed by every
//!   other API error, which waits `base_delay * 2^(attempt + retry)` and
//!   retries the same credential. The exponent keeps growing across
//!   rotations within one segment.
//!
//! The cursor is never advanced after a success.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, warn};

use super::retry::{RetryPolicy, Sleeper};
use crate::credentials::{Credential, CredentialPool};
use crate::speech::{SpeechBackend, VoiceParameters};
use crate::{Error, ErrorContext, Result};

enum State {
    Start,
    Issue { credential: Credential },
    BackoffWait { credential: Credential, delay: Duration },
    Rotate { cause: Error },
    Done(Vec<u8>),
    Fatal(Error),
}

pub struct RequestExecutor {
    pool: CredentialPool,
    backend: Arc<dyn SpeechBackend>,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl RequestExecutor {
    pub fn new(
        pool: CredentialPool,
        backend: Arc<dyn SpeechBackend>,
        policy: RetryPolicy,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            pool,
            backend,
            policy,
            sleeper,
        }
    }

    pub fn pool(&self) -> &CredentialPool {
        &self.pool
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Generate audio for one segment, rotating and backing off as needed.
    pub async fn execute(&mut self, text: &str, voice: &VoiceParameters) -> Result<Vec<u8>> {
        let budget = self.pool.size();
        if budget == 0 {
            return Err(Error::initialization_with_context(
                "no credentials available",
                ErrorContext::new().with_source("request_executor"),
            ));
        }

        let mut attempt = 0usize;
        let mut retry = 0u32;
        let mut last_error: Option<Error> = None;
        let mut state = State::Start;

        loop {
            state = match state {
                State::Start => {
                    if attempt >= budget {
                        State::Fatal(exhausted(attempt, last_error.take()))
                    } else {
                        match self.pool.current() {
                            Some(credential) => {
                                retry = 0;
                                State::Issue {
                                    credential: credential.clone(),
                                }
                            }
                            None if attempt + 1 < budget => {
                                error!(attempt, "current credential unavailable");
                                self.pool.rotate();
                                attempt += 1;
                                State::Start
                            }
                            None => State::Fatal(exhausted(attempt, last_error.take())),
                        }
                    }
                }
                State::Issue { credential } => {
                    info!(
                        credential = self.pool.current_index(),
                        fingerprint = %credential.fingerprint(),
                        attempt = attempt + 1,
                        budget,
                        retry,
                        backend = self.backend.name(),
                        "issuing generation request"
                    );
                    match self.backend.generate(&credential, text, voice).await {
                        Ok(audio) if !audio.is_empty() => State::Done(audio),
                        Ok(_) => self.on_request_failure(
                            Error::malformed("empty audio payload"),
                            credential,
                            attempt,
                            retry,
                        ),
                        Err(err) if err.is_request_failure() => {
                            self.on_request_failure(err, credential, attempt, retry)
                        }
                        Err(err) => {
                            error!(error = %err, "unexpected failure, aborting segment");
                            State::Fatal(err)
                        }
                    }
                }
                State::BackoffWait { credential, delay } => {
                    self.sleeper.sleep(delay).await;
                    retry += 1;
                    State::Issue { credential }
                }
                State::Rotate { cause } => {
                    self.pool.rotate();
                    attempt += 1;
                    last_error = Some(cause);
                    State::Start
                }
                State::Done(audio) => {
                    info!(
                        credential = self.pool.current_index(),
                        bytes = audio.len(),
                        "generation succeeded"
                    );
                    return Ok(audio);
                }
                State::Fatal(err) => {
                    error!(error = %err, "segment failed");
                    return Err(err);
                }
            };
        }
    }

    fn on_request_failure(
        &self,
        err: Error,
        credential: Credential,
        attempt: usize,
        retry: u32,
    ) -> State {
        if err.is_backoff_eligible() && retry < self.policy.max_retries {
            let exponent = u32::try_from(attempt).unwrap_or(u32::MAX).saturating_add(retry);
            let delay = self.policy.backoff(exponent);
            warn!(
                credential = self.pool.current_index(),
                error = %err,
                retry = retry + 1,
                max_retries = self.policy.max_retries,
                delay_ms = delay.as_millis() as u64,
                "API error, backing off on the same credential"
            );
            return State::BackoffWait { credential, delay };
        }
        warn!(
            credential = self.pool.current_index(),
            error = %err,
            "request failed, rotating credential"
        );
        State::Rotate { cause: err }
    }
}

fn exhausted(attempts: usize, last: Option<Error>) -> Error {
    Error::AllCredentialsExhausted {
        attempts,
        last: Box::new(last.unwrap_or_else(|| Error::initialization("no usable credential"))),
    }
}
