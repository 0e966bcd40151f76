//! Session coordination.
//!
//! A [`SessionCoordinator`] holds the loaded videos for one interactive
//! session: each video keeps its transcript, a shared reference to its
//! search index, and an append-only question/answer history. Exactly one
//! loaded video is active at a time.

use crate::cache::CacheStore;
use crate::chunking::{chunk, ChunkParams};
use crate::config::{Prompts, RagSettings};
use crate::embedding::Embedder;
use crate::error::{Result, SvarError};
use crate::index::{Fingerprint, IndexBuilder, SearchIndex};
use crate::rag::{AnswerMode, AnswerPipeline, AnswerResult, Citation, CompletionBackend};
use crate::transcript::Transcript;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;

/// One answered question in a video's history.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ConversationTurn {
    pub id: Uuid,
    pub question: String,
    pub answer: String,
    pub mode: AnswerMode,
    pub citations: Vec<Citation>,
    pub asked_at: DateTime<Utc>,
}

impl ConversationTurn {
    pub fn new(question: String, result: AnswerResult) -> Self {
        Self {
            id: Uuid::new_v4(),
            question,
            answer: result.text,
            mode: result.mode,
            citations: result.citations,
            asked_at: Utc::now(),
        }
    }
}

/// State held for one loaded video.
#[derive(Debug)]
pub struct SessionEntry {
    transcript: Transcript,
    index: Arc<SearchIndex>,
    turns: Vec<ConversationTurn>,
}

impl SessionEntry {
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    pub fn index(&self) -> &Arc<SearchIndex> {
        &self.index
    }

    pub fn turns(&self) -> &[ConversationTurn] {
        &self.turns
    }
}

/// Coordinates index loading and question answering across the videos of
/// one session.
pub struct SessionCoordinator {
    cache: Arc<CacheStore>,
    builder: IndexBuilder,
    pipeline: AnswerPipeline,
    entries: HashMap<String, SessionEntry>,
    active: Option<String>,
}

impl SessionCoordinator {
    pub fn new(
        cache: Arc<CacheStore>,
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionBackend>,
        prompts: Prompts,
        rag: &RagSettings,
    ) -> Self {
        Self {
            cache,
            builder: IndexBuilder::new(embedder.clone()),
            pipeline: AnswerPipeline::new(embedder, completion, prompts, rag),
            entries: HashMap::new(),
            active: None,
        }
    }

    /// Load a transcript into the session, reusing a cached index when the
    /// fingerprint matches and building one otherwise. The loaded video
    /// becomes active. On failure no session entry is created.
    #[instrument(skip(self, transcript), fields(video_id = transcript.video_id()))]
    pub async fn load(
        &mut self,
        transcript: Transcript,
        params: ChunkParams,
    ) -> Result<&SessionEntry> {
        let fingerprint =
            Fingerprint::compute(transcript.video_id(), transcript.language(), params);

        let builder = &self.builder;
        let build_fp = fingerprint.clone();
        let text = transcript.text();
        let index = self
            .cache
            .get_or_build(&fingerprint, transcript.video_id(), || async move {
                let chunks = chunk(text, params)?;
                builder.build(build_fp, chunks).await
            })
            .await?;

        let video_id = transcript.video_id().to_string();
        info!("Loaded video {} ({} segments)", video_id, index.len());

        // Reloading a video keeps its accumulated history.
        let turns = self
            .entries
            .remove(&video_id)
            .map(|e| e.turns)
            .unwrap_or_default();

        self.entries.insert(
            video_id.clone(),
            SessionEntry {
                transcript,
                index,
                turns,
            },
        );
        self.active = Some(video_id.clone());

        Ok(self
            .entries
            .get(&video_id)
            .expect("entry inserted above"))
    }

    /// Answer a question about a loaded video and append the exchange to
    /// its history.
    #[instrument(skip(self, question))]
    pub async fn ask(&mut self, video_id: &str, question: &str) -> Result<AnswerResult> {
        let entry = self
            .entries
            .get_mut(video_id)
            .ok_or_else(|| SvarError::UnknownVideo(video_id.to_string()))?;

        let result = self
            .pipeline
            .answer(&entry.index, question, &entry.turns)
            .await?;

        entry
            .turns
            .push(ConversationTurn::new(question.to_string(), result.clone()));

        Ok(result)
    }

    /// Make a previously loaded video the active one.
    pub fn switch_active(&mut self, video_id: &str) -> Result<()> {
        if !self.entries.contains_key(video_id) {
            return Err(SvarError::UnknownVideo(video_id.to_string()));
        }
        self.active = Some(video_id.to_string());
        Ok(())
    }

    /// The currently active video, if any.
    pub fn active(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The question/answer history for a loaded video, in insertion order.
    pub fn history(&self, video_id: &str) -> Result<&[ConversationTurn]> {
        self.entries
            .get(video_id)
            .map(|e| e.turns.as_slice())
            .ok_or_else(|| SvarError::UnknownVideo(video_id.to_string()))
    }

    /// Remove a video from the session, dropping its history and releasing
    /// its index reference. Cached entries on disk are untouched; the cache
    /// evicts on its own policy.
    pub fn clear(&mut self, video_id: &str) -> Result<()> {
        self.entries
            .remove(video_id)
            .ok_or_else(|| SvarError::UnknownVideo(video_id.to_string()))?;
        if self.active.as_deref() == Some(video_id) {
            self.active = self.entries.keys().next().cloned();
        }
        Ok(())
    }

    /// A loaded video's session entry.
    pub fn entry(&self, video_id: &str) -> Option<&SessionEntry> {
        self.entries.get(video_id)
    }

    /// IDs of all loaded videos, sorted for stable display.
    pub fn loaded(&self) -> Vec<&str> {
        let mut ids: Vec<&str> = self.entries.keys().map(|s| s.as_str()).collect();
        ids.sort_unstable();
        ids
    }
}
