//! Answer generation with graceful degradation.

use super::{AnswerMode, AnswerResult, Citation, CompletionBackend};
use crate::config::{Prompts, RagSettings};
use crate::embedding::Embedder;
use crate::error::{Result, SvarError};
use crate::index::{Hit, SearchIndex};
use crate::session::ConversationTurn;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Base delay for completion retries; doubles per attempt.
const RETRY_BASE_MS: u64 = 500;

/// Question-answering pipeline over a built search index.
pub struct AnswerPipeline {
    embedder: Arc<dyn Embedder>,
    completion: Arc<dyn CompletionBackend>,
    prompts: Prompts,
    top_k: usize,
    history_turns: usize,
    max_retries: usize,
}

impl AnswerPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        completion: Arc<dyn CompletionBackend>,
        prompts: Prompts,
        settings: &RagSettings,
    ) -> Self {
        Self {
            embedder,
            completion,
            prompts,
            top_k: settings.top_k,
            history_turns: settings.history_turns,
            max_retries: settings.max_retries,
        }
    }

    /// Answer a question against an index.
    ///
    /// Embeds the question in the same space as the index, retrieves the
    /// top-k segments, and asks the completion backend to synthesize an
    /// answer. If the backend is out of quota or unreachable, the call
    /// still succeeds with a degraded, retrieval-only result. Degradation
    /// is decided per call; the next question tries the backend again.
    #[instrument(skip(self, index, history), fields(question = %question))]
    pub async fn answer(
        &self,
        index: &SearchIndex,
        question: &str,
        history: &[ConversationTurn],
    ) -> Result<AnswerResult> {
        let query = self.embedder.embed(question).await?;
        let hits = index.query(&query, self.top_k)?;
        if hits.is_empty() {
            // top_k of zero retrieves nothing; there is no context to
            // answer from and nothing to degrade to.
            return Err(SvarError::NoContent(
                "retrieval returned no segments".to_string(),
            ));
        }
        debug!("Retrieved {} segments", hits.len());

        let citations: Vec<Citation> = hits.iter().map(Citation::from).collect();

        let mut vars = HashMap::new();
        vars.insert("question".to_string(), question.to_string());
        vars.insert("context".to_string(), format_context(&hits));
        vars.insert(
            "history".to_string(),
            format_history(history, self.history_turns),
        );
        let user = self.prompts.render_with_custom(&self.prompts.rag.user, &vars);
        let system = self.prompts.rag.system.clone();

        match self.complete_with_retry(&system, &user).await {
            Ok(text) => Ok(AnswerResult {
                mode: AnswerMode::Normal,
                text,
                citations,
            }),
            Err(e) if e.is_degradable() => {
                info!("Completion unavailable ({}), degrading to retrieval-only answer", e);
                // hits is non-empty, checked right after retrieval.
                Ok(AnswerResult {
                    mode: AnswerMode::Degraded,
                    text: hits[0].segment.text.clone(),
                    citations,
                })
            }
            Err(e) => Err(e),
        }
    }

    /// Call the completion backend, retrying transient failures a bounded
    /// number of times with exponential backoff. Quota errors and timeouts
    /// are never retried: quota will not recover within a retry window, and
    /// timeouts must surface to the caller as-is.
    async fn complete_with_retry(&self, system: &str, user: &str) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.completion.complete(system, user).await {
                Ok(text) => return Ok(text),
                Err(e) if e.is_transient() && attempt < self.max_retries => {
                    let delay = Duration::from_millis(RETRY_BASE_MS << attempt);
                    attempt += 1;
                    warn!(
                        "Completion attempt {} failed ({}), retrying in {:?}",
                        attempt, e, delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

/// Format retrieved segments as numbered excerpts for the prompt.
fn format_context(hits: &[Hit]) -> String {
    hits.iter()
        .enumerate()
        .map(|(i, hit)| {
            format!(
                "---\n[{}] transcript offsets {}..{} (score {:.2})\n{}\n---",
                i + 1,
                hit.segment.start,
                hit.segment.end,
                hit.score,
                hit.segment.text
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format the most recent conversation turns for the prompt. Empty when
/// there is no history.
fn format_history(history: &[ConversationTurn], max_turns: usize) -> String {
    if history.is_empty() || max_turns == 0 {
        return String::new();
    }

    let recent = &history[history.len().saturating_sub(max_turns)..];
    let mut out = String::from("Earlier conversation:\n");
    for turn in recent {
        out.push_str(&format!("Q: {}\nA: {}\n", turn.question, turn.answer));
    }
    out.push('\n');
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chunking::{chunk, ChunkParams};
    use crate::error::SvarError;
    use crate::index::{Fingerprint, IndexBuilder};
    use crate::testing::{ScriptedCompletion, VocabEmbedder};

    const LESSON: &str =
        "Lesson one. Photosynthesis converts light into chemical energy. Plants use chlorophyll.";

    async fn build_index(embedder: Arc<VocabEmbedder>) -> SearchIndex {
        let chunks = chunk(LESSON, ChunkParams::new(40, 10)).unwrap();
        let fingerprint = Fingerprint::compute("video1", "en", ChunkParams::new(40, 10));
        IndexBuilder::new(embedder)
            .build(fingerprint, chunks)
            .await
            .unwrap()
    }

    fn pipeline(
        embedder: Arc<VocabEmbedder>,
        completion: Arc<ScriptedCompletion>,
        settings: &RagSettings,
    ) -> AnswerPipeline {
        AnswerPipeline::new(embedder, completion, Prompts::default(), settings)
    }

    #[tokio::test]
    async fn test_normal_answer_with_citations() {
        let embedder = Arc::new(VocabEmbedder::new());
        let completion = Arc::new(ScriptedCompletion::answering("It is photosynthesis. [1]"));
        let index = build_index(embedder.clone()).await;
        let settings = RagSettings::default();
        let pipeline = pipeline(embedder, completion.clone(), &settings);

        let result = pipeline
            .answer(&index, "What converts light into chemical energy?", &[])
            .await
            .unwrap();

        assert_eq!(result.mode, AnswerMode::Normal);
        assert_eq!(result.text, "It is photosynthesis. [1]");
        assert!(!result.citations.is_empty());
        assert!(result.citations.len() <= settings.top_k);
        // The prompt carried the retrieved transcript text.
        let prompt = completion.last_user_prompt().unwrap();
        assert!(prompt.contains("Photosynthesis"));
        assert!(prompt.contains("What converts light"));
    }

    #[tokio::test]
    async fn test_quota_error_degrades_to_top_segment() {
        let embedder = Arc::new(VocabEmbedder::new());
        let completion = Arc::new(ScriptedCompletion::new(vec![Err(
            SvarError::CompletionQuota("quota exceeded".to_string()),
        )]));
        let index = build_index(embedder.clone()).await;
        let settings = RagSettings::default();
        let pipeline = pipeline(embedder, completion.clone(), &settings);

        let result = pipeline
            .answer(&index, "What converts light into chemical energy?", &[])
            .await
            .unwrap();

        assert!(result.is_degraded());
        // The degraded answer is the top-similarity segment, verbatim.
        assert_eq!(result.text, result.citations[0].excerpt.trim_end_matches('…'));
        assert!(result.text.contains("converts light into chemical energy"));
        // Quota errors are not retried.
        assert_eq!(completion.calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_errors_retried_then_succeed() {
        let embedder = Arc::new(VocabEmbedder::new());
        let completion = Arc::new(ScriptedCompletion::new(vec![
            Err(SvarError::Completion("network error: reset".to_string())),
            Err(SvarError::Completion("network error: reset".to_string())),
            Ok("recovered".to_string()),
        ]));
        let index = build_index(embedder.clone()).await;
        let settings = RagSettings::default();
        let pipeline = pipeline(embedder, completion.clone(), &settings);

        let result = pipeline.answer(&index, "lesson?", &[]).await.unwrap();
        assert_eq!(result.mode, AnswerMode::Normal);
        assert_eq!(result.text, "recovered");
        assert_eq!(completion.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_retries_degrade() {
        let embedder = Arc::new(VocabEmbedder::new());
        let completion = Arc::new(ScriptedCompletion::new(vec![
            Err(SvarError::Completion("network error: reset".to_string())),
            Err(SvarError::Completion("network error: reset".to_string())),
            Err(SvarError::Completion("network error: reset".to_string())),
        ]));
        let index = build_index(embedder.clone()).await;
        let settings = RagSettings::default();
        let pipeline = pipeline(embedder, completion.clone(), &settings);

        let result = pipeline.answer(&index, "lesson?", &[]).await.unwrap();
        assert!(result.is_degraded());
        // max_retries (2) + the initial attempt.
        assert_eq!(completion.calls(), 3);
    }

    #[tokio::test]
    async fn test_zero_top_k_is_no_content() {
        let embedder = Arc::new(VocabEmbedder::new());
        let completion = Arc::new(ScriptedCompletion::new(vec![Err(
            SvarError::CompletionQuota("quota exceeded".to_string()),
        )]));
        let index = build_index(embedder.clone()).await;
        let settings = RagSettings {
            top_k: 0,
            ..RagSettings::default()
        };
        let pipeline = pipeline(embedder, completion.clone(), &settings);

        let err = pipeline.answer(&index, "lesson?", &[]).await.unwrap_err();
        assert!(matches!(err, SvarError::NoContent(_)));
        // Without retrieved context the completion backend is never asked.
        assert_eq!(completion.calls(), 0);
    }

    #[tokio::test]
    async fn test_timeout_surfaces_as_error() {
        let embedder = Arc::new(VocabEmbedder::new());
        let completion = Arc::new(ScriptedCompletion::new(vec![Err(SvarError::Timeout(
            "deadline exceeded".to_string(),
        ))]));
        let index = build_index(embedder.clone()).await;
        let settings = RagSettings::default();
        let pipeline = pipeline(embedder, completion, &settings);

        let err = pipeline.answer(&index, "lesson?", &[]).await.unwrap_err();
        assert!(matches!(err, SvarError::Timeout(_)));
    }

    #[tokio::test]
    async fn test_history_included_in_prompt() {
        let embedder = Arc::new(VocabEmbedder::new());
        let completion = Arc::new(ScriptedCompletion::answering("follow-up answer"));
        let index = build_index(embedder.clone()).await;
        let settings = RagSettings::default();
        let pipeline = pipeline(embedder, completion.clone(), &settings);

        let history = vec![ConversationTurn::new(
            "What is lesson one about?".to_string(),
            AnswerResult {
                mode: AnswerMode::Normal,
                text: "Photosynthesis.".to_string(),
                citations: vec![],
            },
        )];

        pipeline
            .answer(&index, "Tell me more", &history)
            .await
            .unwrap();

        let prompt = completion.last_user_prompt().unwrap();
        assert!(prompt.contains("What is lesson one about?"));
        assert!(prompt.contains("Earlier conversation"));
    }
}
