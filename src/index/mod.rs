//! Similarity-search index over transcript segments.
//!
//! A [`SearchIndex`] owns a chunked transcript plus one embedding per
//! segment and answers nearest-neighbor queries by cosine similarity. It is
//! built once per [`Fingerprint`] and shared read-only afterwards.

use crate::chunking::{ChunkParams, ChunkSet, Segment};
use crate::embedding::Embedder;
use crate::error::{Result, SvarError};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Deterministic cache key for one (video, language, chunk params) request.
///
/// Two requests with equal fingerprints are guaranteed to want the same
/// index, so the cache can serve one build to both.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Compute the fingerprint for a processing request.
    pub fn compute(video_id: &str, language: &str, params: ChunkParams) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(video_id.as_bytes());
        hasher.update([0u8]);
        hasher.update(language.as_bytes());
        hasher.update([0u8]);
        hasher.update(params.chunk_size.to_le_bytes());
        hasher.update(params.overlap.to_le_bytes());
        Fingerprint(format!("{:x}", hasher.finalize()))
    }

    /// Reconstruct a fingerprint from its hex form, as listed from the
    /// cache directory.
    pub fn from_hex(hex: &str) -> Self {
        Fingerprint(hex.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A retrieval hit: a segment and its similarity to the query.
#[derive(Debug, Clone)]
pub struct Hit {
    /// The matched segment.
    pub segment: Segment,
    /// Cosine similarity score (higher is better).
    pub score: f32,
}

/// In-memory similarity index over one transcript.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchIndex {
    fingerprint: Fingerprint,
    dimensions: usize,
    chunks: ChunkSet,
    embeddings: Vec<Vec<f32>>,
}

impl SearchIndex {
    pub fn fingerprint(&self) -> &Fingerprint {
        &self.fingerprint
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn chunks(&self) -> &ChunkSet {
        &self.chunks
    }

    pub fn len(&self) -> usize {
        self.embeddings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.embeddings.is_empty()
    }

    /// Retrieve the top-`k` segments most similar to `query`.
    ///
    /// Results are ordered by descending score; equal scores fall back to
    /// original segment order (earlier offset first). Fails with
    /// [`SvarError::NoContent`] when the index holds no segments.
    pub fn query(&self, query: &[f32], k: usize) -> Result<Vec<Hit>> {
        if self.is_empty() {
            return Err(SvarError::NoContent(
                "the search index contains no segments".to_string(),
            ));
        }

        let mut hits: Vec<Hit> = self
            .chunks
            .segments()
            .iter()
            .zip(self.embeddings.iter())
            .map(|(segment, embedding)| Hit {
                segment: segment.clone(),
                score: cosine_similarity(query, embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.segment.index.cmp(&b.segment.index))
        });
        hits.truncate(k);

        Ok(hits)
    }
}

/// Builds a [`SearchIndex`] from a chunked transcript.
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>) -> Self {
        Self { embedder }
    }

    /// Embed every segment and assemble the index.
    ///
    /// The build is atomic: if the backend fails or returns a short batch,
    /// no index is produced. A partially embedded index is never served.
    #[instrument(skip(self, chunks), fields(fingerprint = %fingerprint, segments = chunks.len()))]
    pub async fn build(&self, fingerprint: Fingerprint, chunks: ChunkSet) -> Result<SearchIndex> {
        let texts: Vec<String> = chunks.segments().iter().map(|s| s.text.clone()).collect();
        let embeddings = self.embedder.embed_batch(&texts).await?;

        if embeddings.len() != chunks.len() {
            return Err(SvarError::Embedding(format!(
                "Backend embedded {} of {} segments",
                embeddings.len(),
                chunks.len()
            )));
        }

        debug!("Built index with {} segments", chunks.len());

        Ok(SearchIndex {
            fingerprint,
            dimensions: self.embedder.dimensions(),
            chunks,
            embeddings,
        })
    }
}

/// Compute cosine similarity between two vectors.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}
