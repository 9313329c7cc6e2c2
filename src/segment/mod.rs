//! Text segmentation.
//!
//! Long scripts are cut into bounded segments, one generation request each.
//! The default strategy bounds every segment by a character budget and prefers
//! to cut right after a sentence terminator (`.`, `?`, `!`) followed by
//! whitespace, searching a fixed lookback window in front of the hard cutoff.
//! When no terminator is found the cut lands exactly on the budget, even
//! mid-word.
//!
//! Segmentation is a pure function of its input: the same text and settings
//! always produce the same sequence.

use crate::{Error, ErrorContext, Result};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

/// Characters searched backwards from the hard cutoff for a sentence end.
pub const DEFAULT_LOOKBACK: usize = 200;

static SENTENCE_END: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[.?!]\s").expect("sentence terminator pattern is valid"));

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Mode {
    Bounded { max_chars: usize, lookback: usize },
    Paragraphs { per_chunk: usize },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TextSegmenter {
    mode: Mode,
}

impl TextSegmenter {
    /// Character-bounded, sentence-preferring segmentation.
    pub fn new(max_chars: usize) -> Result<Self> {
        if max_chars == 0 {
            return Err(Error::validation_with_context(
                "max_chars must be at least 1",
                ErrorContext::new()
                    .with_field_path("max_chars")
                    .with_source("text_segmenter"),
            ));
        }
        Ok(Self {
            mode: Mode::Bounded {
                max_chars,
                lookback: DEFAULT_LOOKBACK,
            },
        })
    }

    /// Group `per_chunk` consecutive non-blank lines into one segment.
    pub fn paragraphs(per_chunk: usize) -> Result<Self> {
        if per_chunk == 0 {
            return Err(Error::validation_with_context(
                "paragraphs_per_chunk must be at least 1",
                ErrorContext::new()
                    .with_field_path("paragraphs_per_chunk")
                    .with_source("text_segmenter"),
            ));
        }
        Ok(Self {
            mode: Mode::Paragraphs { per_chunk },
        })
    }

    /// Override the lookback window. Has no effect in paragraph mode.
    pub fn with_lookback(mut self, window: usize) -> Self {
        if let Mode::Bounded { lookback, .. } = &mut self.mode {
            *lookback = window;
        }
        self
    }

    pub fn segment(&self, text: &str) -> Vec<String> {
        let segments = match self.mode {
            Mode::Bounded {
                max_chars,
                lookback,
            } => split_bounded(text, max_chars, lookback),
            Mode::Paragraphs { per_chunk } => split_paragraphs(text, per_chunk),
        };
        debug!(segments = segments.len(), mode = ?self.mode, "segmented text");
        segments
    }
}

/// Convenience wrapper: bounded segmentation with the default lookback.
pub fn segment(text: &str, max_chars: usize) -> Result<Vec<String>> {
    Ok(TextSegmenter::new(max_chars)?.segment(text))
}

/// Collapse every whitespace run to one space and trim both ends.
pub fn normalize_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn split_bounded(text: &str, max_chars: usize, lookback: usize) -> Vec<String> {
    let clean = normalize_whitespace(text);
    // Byte offset of every char boundary, including the end of the string.
    let bounds: Vec<usize> = clean
        .char_indices()
        .map(|(i, _)| i)
        .chain(std::iter::once(clean.len()))
        .collect();
    let total = bounds.len() - 1;

    let mut segments = Vec::new();
    let mut start = 0;
    while start < total {
        if total - start <= max_chars {
            push_trimmed(&mut segments, &clean[bounds[start]..]);
            break;
        }

        let hard = start + max_chars;
        let window_start = hard.saturating_sub(lookback).max(start);
        let window = &clean[bounds[window_start]..bounds[hard]];
        let cut = SENTENCE_END
            .find_iter(window)
            .last()
            .map(|m| window_start + window[..m.end()].chars().count())
            .filter(|&cut| cut > start)
            .unwrap_or(hard);

        push_trimmed(&mut segments, &clean[bounds[start]..bounds[cut]]);
        start = cut;
    }
    segments
}

fn split_paragraphs(text: &str, per_chunk: usize) -> Vec<String> {
    let paragraphs: Vec<&str> = text
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect();
    paragraphs
        .chunks(per_chunk)
        .map(|group| group.join(" "))
        .collect()
}

fn push_trimmed(segments: &mut Vec<String>, piece: &str) {
    let piece = piece.trim();
    if !piece.is_empty() {
        segments.push(piece.to_string());
    }
}
