//! Transcript acquisition.
//!
//! A [`Transcript`] is an immutable snapshot of one video's caption text
//! plus source metadata. Fetching is abstracted behind
//! [`TranscriptFetcher`] so the pipeline can be driven by a stub in tests.

mod youtube;

pub use youtube::{parse_video_id, YoutubeFetcher};

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// Source metadata for a fetched video.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct VideoMetadata {
    pub title: String,
    pub author: Option<String>,
    pub duration_seconds: Option<u32>,
    pub view_count: Option<u64>,
}

/// One video's transcript. Created once per successful fetch, never mutated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transcript {
    video_id: String,
    language: String,
    text: String,
    metadata: VideoMetadata,
}

impl Transcript {
    pub fn new(
        video_id: impl Into<String>,
        language: impl Into<String>,
        text: impl Into<String>,
        metadata: VideoMetadata,
    ) -> Self {
        Self {
            video_id: video_id.into(),
            language: language.into(),
            text: text.into(),
            metadata,
        }
    }

    pub fn video_id(&self) -> &str {
        &self.video_id
    }

    pub fn language(&self) -> &str {
        &self.language
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn metadata(&self) -> &VideoMetadata {
        &self.metadata
    }
}

/// Trait for transcript sources.
#[async_trait]
pub trait TranscriptFetcher: Send + Sync {
    /// Fetch the transcript for a video, preferring `language` but falling
    /// back to whatever caption track is available.
    async fn fetch(&self, video_id: &str, language: &str) -> Result<Transcript>;
}
