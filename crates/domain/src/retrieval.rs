//! Ranked retrieval output.

use crate::chunk::Chunk;
use serde::Serialize;

/// A chunk paired with its similarity to the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScoredChunk {
    /// The matched chunk.
    pub chunk: Chunk,
    /// Cosine similarity to the query, `0.0` for unembedded chunks.
    pub score: f32,
}

/// Chunks ordered by descending score, at most `top_k` long.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct RetrievalResult(Vec<ScoredChunk>);

impl RetrievalResult {
    /// Wrap an already ranked list.
    #[must_use]
    pub const fn from_ranked(ranked: Vec<ScoredChunk>) -> Self {
        Self(ranked)
    }

    /// Empty result (blank query or empty index).
    #[must_use]
    pub const fn empty() -> Self {
        Self(Vec::new())
    }

    /// Ranked entries.
    #[must_use]
    pub fn entries(&self) -> &[ScoredChunk] {
        &self.0
    }

    /// Number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Returns true when nothing was retrieved.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate entries in rank order.
    pub fn iter(&self) -> std::slice::Iter<'_, ScoredChunk> {
        self.0.iter()
    }
}

impl IntoIterator for RetrievalResult {
    type Item = ScoredChunk;
    type IntoIter = std::vec::IntoIter<ScoredChunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a RetrievalResult {
    type Item = &'a ScoredChunk;
    type IntoIter = std::slice::Iter<'a, ScoredChunk>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}
