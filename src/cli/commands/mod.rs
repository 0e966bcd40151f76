//! CLI command implementations.

mod ask;
mod cache;
mod chat;
mod config;
mod process;

pub use ask::run_ask;
pub use cache::run_cache;
pub use chat::run_chat;
pub use config::run_config;
pub use process::run_process;

use crate::cache::CacheStore;
use crate::config::{Prompts, Settings};
use crate::embedding::OpenAIEmbedder;
use crate::error::{Result, SvarError};
use crate::rag::OpenAICompletion;
use crate::session::SessionCoordinator;
use crate::transcript::{parse_video_id, Transcript, TranscriptFetcher, YoutubeFetcher};
use std::sync::Arc;

/// Build a session coordinator wired to the OpenAI backends from settings.
fn build_session(settings: &Settings, model: Option<&str>) -> Result<SessionCoordinator> {
    let cache = Arc::new(CacheStore::new(
        settings.cache_dir(),
        settings.cache.max_bytes(),
    )?);

    let timeout = settings.request_timeout();
    let embedder = Arc::new(OpenAIEmbedder::with_config(
        &settings.embedding.model,
        settings.embedding.dimensions as usize,
        timeout,
    ));
    let completion = Arc::new(OpenAICompletion::new(
        model.unwrap_or(&settings.rag.model),
        settings.rag.temperature,
        settings.rag.max_tokens,
        timeout,
    ));
    let prompts = Prompts::load(
        settings.prompts.custom_dir.as_deref(),
        Some(&settings.prompts.variables),
    )?;

    Ok(SessionCoordinator::new(
        cache,
        embedder,
        completion,
        prompts,
        &settings.rag,
    ))
}

/// Resolve a URL or bare ID and fetch the video's transcript.
async fn fetch_transcript(
    input: &str,
    language: Option<&str>,
    settings: &Settings,
) -> Result<Transcript> {
    let video_id = parse_video_id(input)
        .ok_or_else(|| SvarError::InvalidVideoId(input.to_string()))?;
    let language = language.unwrap_or(&settings.youtube.language);
    let fetcher = YoutubeFetcher::new(settings.request_timeout());
    fetcher.fetch(&video_id, language).await
}
