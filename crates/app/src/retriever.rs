//! Brute-force cosine retrieval over the published index.

use crate::handle::IndexHandle;
use pilot_domain::{IndexSnapshot, RetrievalResult, ScoredChunk};
use pilot_ports::EmbeddingPort;
use pilot_shared::{RequestContext, Result};
use pilot_vector::rank_top_k;
use std::sync::Arc;

/// Default number of retrieved chunks.
pub const DEFAULT_TOP_K: usize = 5;

/// Embeds the query and ranks indexed chunks against it.
#[derive(Clone)]
pub struct Retriever {
    embedding: Arc<dyn EmbeddingPort>,
    handle: IndexHandle,
}

impl Retriever {
    /// Retriever reading from `handle`.
    #[must_use]
    pub fn new(embedding: Arc<dyn EmbeddingPort>, handle: IndexHandle) -> Self {
        Self { embedding, handle }
    }

    /// Top `top_k` chunks for `query`.
    ///
    /// Blank queries and an empty index short-circuit to an empty result
    /// without calling the embedding backend.
    pub async fn retrieve(
        &self,
        ctx: &RequestContext,
        query: &str,
        top_k: usize,
    ) -> Result<RetrievalResult> {
        let snapshot = self.handle.snapshot();
        if query.trim().is_empty() || snapshot.is_empty() || top_k == 0 {
            return Ok(RetrievalResult::empty());
        }
        ctx.ensure_not_cancelled("retrieve.embed")?;
        let vector = self.embedding.embed(ctx, query.into()).await?;
        ctx.ensure_not_cancelled("retrieve.rank")?;
        Ok(rank(&vector, &snapshot, top_k))
    }
}

/// Rank the embedded chunks of `snapshot` by cosine similarity to `query`.
///
/// Chunks without an embedding are never returned. Equal scores keep index
/// order.
#[must_use]
pub fn rank(query: &[f32], snapshot: &IndexSnapshot, top_k: usize) -> RetrievalResult {
    let embedded: Vec<_> = snapshot
        .chunks()
        .iter()
        .filter(|chunk| chunk.is_embedded())
        .collect();
    let ranked = rank_top_k(query, &embedded, |chunk| chunk.embedding.as_slice(), top_k)
        .into_iter()
        .filter_map(|matched| {
            embedded.get(matched.index).map(|chunk| ScoredChunk {
                chunk: (*chunk).clone(),
                score: matched.score,
            })
        })
        .collect();
    RetrievalResult::from_ranked(ranked)
}

/// Render retrieved chunks as a context block: a `File:` header line and the
/// chunk text, blocks separated by a blank line.
#[must_use]
pub fn format_context(result: &RetrievalResult) -> String {
    result
        .iter()
        .map(|scored| format!("File: {}\n{}", scored.chunk.file_path, scored.chunk.text))
        .collect::<Vec<_>>()
        .join("\n\n")
}
