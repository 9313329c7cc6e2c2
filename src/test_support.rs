//! Shared fakes for unit tests.

use crate::credentials::{Credential, CredentialPool};
use crate::resilience::Sleeper;
use crate::speech::{FailureClass, SpeechBackend, VoiceParameters};
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

#[derive(Debug, Clone)]
pub(crate) enum Step {
    Audio(Vec<u8>),
    Fail(FailureClass),
    Malformed,
    Empty,
    Io,
}

/// Backend that replays a fixed script, then succeeds with `fallback` audio.
pub(crate) struct ScriptedBackend {
    script: Mutex<VecDeque<Step>>,
    calls: Mutex<Vec<(String, String)>>,
    fallback: Vec<u8>,
}

impl ScriptedBackend {
    pub(crate) fn new(steps: Vec<Step>) -> Self {
        Self {
            script: Mutex::new(steps.into()),
            calls: Mutex::new(Vec::new()),
            fallback: vec![1, 0, 2, 0],
        }
    }

    /// (credential secret, text) for every call, in order.
    pub(crate) fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl SpeechBackend for ScriptedBackend {
    async fn generate(
        &self,
        credential: &Credential,
        text: &str,
        _voice: &VoiceParameters,
    ) -> Result<Vec<u8>> {
        self.calls
            .lock()
            .unwrap()
            .push((credential.expose().to_string(), text.to_string()));
        let step = self.script.lock().unwrap().pop_front();
        match step {
            None => Ok(self.fallback.clone()),
            Some(Step::Audio(audio)) => Ok(audio),
            Some(Step::Fail(class)) => Err(Error::remote(class, None, "scripted failure")),
            Some(Step::Malformed) => Err(Error::malformed("scripted malformed body")),
            Some(Step::Empty) => Ok(Vec::new()),
            Some(Step::Io) => Err(Error::Io(std::io::Error::new(
                std::io::ErrorKind::Other,
                "scripted io failure",
            ))),
        }
    }

    fn name(&self) -> &'static str {
        "scripted"
    }
}

#[derive(Default)]
pub(crate) struct RecordingSleeper {
    slept: Mutex<Vec<Duration>>,
}

impl RecordingSleeper {
    pub(crate) fn slept(&self) -> Vec<Duration> {
        self.slept.lock().unwrap().clone()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        self.slept.lock().unwrap().push(duration);
    }
}

pub(crate) fn pool(keys: &[&str]) -> CredentialPool {
    CredentialPool::new(keys.iter().map(|k| Credential::new(*k)).collect())
}
