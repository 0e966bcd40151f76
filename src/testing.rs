//! Shared test stubs for the embedding and completion backends.

use crate::embedding::Embedder;
use crate::error::{Result, SvarError};
use crate::rag::CompletionBackend;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Embeds texts as occurrence counts over a tiny fixed vocabulary, so
/// similarity behaves predictably and batch calls can be counted.
pub(crate) struct VocabEmbedder {
    vocab: Vec<&'static str>,
    pub batch_calls: AtomicUsize,
}

impl VocabEmbedder {
    pub(crate) fn new() -> Self {
        Self {
            vocab: vec!["photosynthesis", "light", "energy", "chlorophyll", "lesson"],
            batch_calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn batch_calls(&self) -> usize {
        self.batch_calls.load(Ordering::SeqCst)
    }

    fn embed_one(&self, text: &str) -> Vec<f32> {
        let lower = text.to_lowercase();
        self.vocab
            .iter()
            .map(|w| lower.matches(w).count() as f32)
            .collect()
    }
}

#[async_trait]
impl Embedder for VocabEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.embed_one(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        self.batch_calls.fetch_add(1, Ordering::SeqCst);
        Ok(texts.iter().map(|t| self.embed_one(t)).collect())
    }

    fn dimensions(&self) -> usize {
        5
    }
}

/// Embedder that always fails, for atomic-build tests.
pub(crate) struct FailingEmbedder;

#[async_trait]
impl Embedder for FailingEmbedder {
    async fn embed(&self, _text: &str) -> Result<Vec<f32>> {
        Err(SvarError::EmbeddingQuota("rate limited".to_string()))
    }

    async fn embed_batch(&self, _texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Err(SvarError::EmbeddingQuota("rate limited".to_string()))
    }

    fn dimensions(&self) -> usize {
        5
    }
}

/// Completion backend that replays a script of results and records the
/// prompts it was called with. When the script runs dry it answers with a
/// fixed string.
pub(crate) struct ScriptedCompletion {
    script: Mutex<VecDeque<Result<String>>>,
    pub prompts_seen: Mutex<Vec<(String, String)>>,
}

impl ScriptedCompletion {
    pub(crate) fn new(script: Vec<Result<String>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            prompts_seen: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn answering(text: &str) -> Self {
        Self::new(vec![Ok(text.to_string())])
    }

    pub(crate) fn calls(&self) -> usize {
        self.prompts_seen.lock().unwrap().len()
    }

    pub(crate) fn last_user_prompt(&self) -> Option<String> {
        self.prompts_seen
            .lock()
            .unwrap()
            .last()
            .map(|(_, user)| user.clone())
    }
}

#[async_trait]
impl CompletionBackend for ScriptedCompletion {
    async fn complete(&self, system: &str, user: &str) -> Result<String> {
        self.prompts_seen
            .lock()
            .unwrap()
            .push((system.to_string(), user.to_string()));
        match self.script.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok("scripted answer".to_string()),
        }
    }
}
