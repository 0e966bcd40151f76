//! Error types for Svar.

use thiserror::Error;

/// Library-level error type for Svar operations.
#[derive(Error, Debug)]
pub enum SvarError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid video identifier: {0}")]
    InvalidVideoId(String),

    #[error("Transcript unavailable: {0}")]
    TranscriptUnavailable(String),

    #[error("Video source error: {0}")]
    VideoSource(String),

    #[error("Embedding service error: {0}")]
    Embedding(String),

    #[error("Embedding service quota exceeded: {0}")]
    EmbeddingQuota(String),

    #[error("AI completion error: {0}")]
    Completion(String),

    #[error("AI completion quota exceeded: {0}")]
    CompletionQuota(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Cache entry unreadable: {0}")]
    CacheCorruption(String),

    #[error("No video loaded with id '{0}'")]
    UnknownVideo(String),

    #[error("No transcript content to search: {0}")]
    NoContent(String),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),
}

impl SvarError {
    /// Whether this error should put the answer pipeline into degraded
    /// (retrieval-only) mode instead of failing the call.
    pub fn is_degradable(&self) -> bool {
        matches!(
            self,
            SvarError::Completion(_) | SvarError::CompletionQuota(_)
        )
    }

    /// Whether a retry could plausibly help (transient network failures).
    /// Quota errors and timeouts are never retried.
    pub fn is_transient(&self) -> bool {
        matches!(self, SvarError::Completion(_) | SvarError::Http(_))
    }
}

/// Result type alias for Svar operations.
pub type Result<T> = std::result::Result<T, SvarError>;
