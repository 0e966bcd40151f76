//! Retrieval-augmented question answering over a transcript index.
//!
//! The pipeline retrieves the segments most similar to a question and asks
//! a completion backend to synthesize an answer from them. When the backend
//! is out of quota or unreachable, it degrades to returning the best
//! retrieved segment verbatim instead of failing, flagged so callers can
//! present it distinctly.

mod openai;
mod pipeline;

pub use openai::OpenAICompletion;
pub use pipeline::AnswerPipeline;

use crate::error::Result;
use crate::index::Hit;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// How an answer was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnswerMode {
    /// Synthesized by the completion backend.
    Normal,
    /// Retrieval-only: the completion backend was unavailable and the
    /// answer is a verbatim transcript excerpt.
    Degraded,
}

/// A reference to a transcript segment that supported an answer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Citation {
    /// Position of the cited segment in the chunk sequence.
    pub segment_index: usize,
    /// Byte offset range of the segment in the source transcript.
    pub start: usize,
    pub end: usize,
    /// Similarity score against the question.
    pub score: f32,
    /// Short excerpt of the segment text for display.
    pub excerpt: String,
}

impl From<&Hit> for Citation {
    fn from(hit: &Hit) -> Self {
        Self {
            segment_index: hit.segment.index,
            start: hit.segment.start,
            end: hit.segment.end,
            score: hit.score,
            excerpt: hit.segment.preview(160),
        }
    }
}

/// The outcome of one answered question.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnswerResult {
    pub mode: AnswerMode,
    pub text: String,
    /// Retrieved segments, most similar first.
    pub citations: Vec<Citation>,
}

impl AnswerResult {
    pub fn is_degraded(&self) -> bool {
        self.mode == AnswerMode::Degraded
    }
}

/// Trait for language-model completion backends.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    /// Generate a completion for a system + user prompt pair.
    async fn complete(&self, system: &str, user: &str) -> Result<String>;
}
