//! Run orchestration: segment once, then generate and persist each segment
//! strictly in order.
//!
//! A failure on segment `k` aborts the run. Artifacts `1..k-1` stay on disk so
//! a later `assemble` (or a rerun) can recover them.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info, info_span, Instrument};
use uuid::Uuid;

use crate::audio::{Artifact, SegmentWriter};
use crate::resilience::{RequestExecutor, Sleeper};
use crate::segment::TextSegmenter;
use crate::speech::VoiceParameters;
use crate::{Error, ErrorContext, Result};

/// Fixed pause between consecutive segment requests.
pub const DEFAULT_REQUEST_PAUSE: Duration = Duration::from_millis(500);

#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    pub run_id: Uuid,
    pub artifacts: Vec<Artifact>,
}

pub struct Orchestrator {
    segmenter: TextSegmenter,
    executor: RequestExecutor,
    writer: SegmentWriter,
    sleeper: Arc<dyn Sleeper>,
    pause: Duration,
}

impl Orchestrator {
    pub fn new(
        segmenter: TextSegmenter,
        executor: RequestExecutor,
        writer: SegmentWriter,
        sleeper: Arc<dyn Sleeper>,
    ) -> Self {
        Self {
            segmenter,
            executor,
            writer,
            sleeper,
            pause: DEFAULT_REQUEST_PAUSE,
        }
    }

    pub fn with_pause(mut self, pause: Duration) -> Self {
        self.pause = pause;
        self
    }

    pub fn executor(&self) -> &RequestExecutor {
        &self.executor
    }

    pub async fn run(
        &mut self,
        text: &str,
        voice: &VoiceParameters,
        basename: &str,
    ) -> Result<RunSummary> {
        let run_id = Uuid::new_v4();
        let span = info_span!("run", %run_id, basename);
        self.run_segments(text, voice, basename)
            .instrument(span)
            .await
            .map(|artifacts| RunSummary { run_id, artifacts })
    }

    async fn run_segments(
        &mut self,
        text: &str,
        voice: &VoiceParameters,
        basename: &str,
    ) -> Result<Vec<Artifact>> {
        let segments = self.segmenter.segment(text);
        if segments.is_empty() {
            return Err(Error::validation_with_context(
                "input text is empty",
                ErrorContext::new()
                    .with_field_path("text")
                    .with_source("orchestrator"),
            ));
        }
        let total = segments.len();
        info!(total, voice = %voice.voice, "starting run");

        let mut artifacts = Vec::with_capacity(total);
        for (i, segment) in segments.iter().enumerate() {
            let index = i + 1;
            let outcome = self
                .process_segment(segment, voice, basename, index)
                .instrument(info_span!("segment", index, total, chars = segment.chars().count()))
                .await;
            match outcome {
                Ok(artifact) => artifacts.push(artifact),
                Err(err) => {
                    error!(
                        segment = index,
                        total,
                        completed = artifacts.len(),
                        error = %err,
                        "run aborted; earlier artifacts left in place"
                    );
                    return Err(err);
                }
            }
            if index < total {
                self.sleeper.sleep(self.pause).await;
            }
        }

        info!(total, "all segments generated");
        Ok(artifacts)
    }

    async fn process_segment(
        &mut self,
        segment: &str,
        voice: &VoiceParameters,
        basename: &str,
        index: usize,
    ) -> Result<Artifact> {
        info!("processing segment");
        let pcm = self.executor.execute(segment, voice).await?;
        self.writer.write(basename, index, &pcm)
    }
}
