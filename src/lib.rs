//! Svar - YouTube Transcript Q&A
//!
//! A CLI tool for asking questions about YouTube videos, answered from
//! their transcripts with citations.
//!
//! The name "Svar" comes from the Norwegian/Scandinavian word for "answer."
//!
//! # Overview
//!
//! Svar allows you to:
//! - Fetch caption tracks for YouTube videos
//! - Build a cached, searchable embedding index per video
//! - Ask questions and get answers grounded in the transcript, with citations
//! - Hold follow-up conversations across several loaded videos
//!
//! # Architecture
//!
//! The library is organized into several modules:
//!
//! - `config` - Configuration and prompt templates
//! - `transcript` - Transcript acquisition (YouTube via yt-dlp)
//! - `chunking` - Deterministic overlapping transcript segmentation
//! - `embedding` - Embedding generation
//! - `index` - Search index construction and similarity queries
//! - `cache` - Fingerprint-keyed on-disk index cache
//! - `rag` - Answer generation with graceful degradation
//! - `session` - Multi-video session coordination
//!
//! # Example
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use svar::cache::CacheStore;
//! use svar::config::{Prompts, Settings};
//! use svar::embedding::OpenAIEmbedder;
//! use svar::rag::OpenAICompletion;
//! use svar::session::SessionCoordinator;
//! use svar::transcript::{TranscriptFetcher, YoutubeFetcher};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let timeout = settings.request_timeout();
//!
//!     let cache = Arc::new(CacheStore::new(settings.cache_dir(), settings.cache.max_bytes())?);
//!     let embedder = Arc::new(OpenAIEmbedder::new());
//!     let completion = Arc::new(OpenAICompletion::new("gpt-4o-mini", 0.7, 2000, timeout));
//!     let mut session =
//!         SessionCoordinator::new(cache, embedder, completion, Prompts::default(), &settings.rag);
//!
//!     let transcript = YoutubeFetcher::new(timeout).fetch("dQw4w9WgXcQ", "en").await?;
//!     session.load(transcript, settings.chunking.params()).await?;
//!
//!     let answer = session.ask("dQw4w9WgXcQ", "What is this video about?").await?;
//!     println!("{}", answer.text);
//!
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod index;
pub mod openai;
pub mod rag;
pub mod session;
pub mod transcript;

#[cfg(test)]
mod testing;

pub use error::{Result, SvarError};
