//! Embedding boundary contract.

use crate::BoxFuture;
use pilot_domain::ModelName;
use pilot_shared::{RequestContext, Result};

/// Owned request to embed a single text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmbedRequest {
    /// Text to embed.
    pub text: Box<str>,
}

impl From<Box<str>> for EmbedRequest {
    fn from(text: Box<str>) -> Self {
        Self { text }
    }
}

impl From<String> for EmbedRequest {
    fn from(text: String) -> Self {
        Self {
            text: text.into_boxed_str(),
        }
    }
}

impl From<&str> for EmbedRequest {
    fn from(text: &str) -> Self {
        Self { text: text.into() }
    }
}

/// Maps text to a fixed-length vector.
///
/// Implementations may be slow or fail per call; callers decide whether a
/// failure aborts their work. No timeout is imposed beyond the transport's.
pub trait EmbeddingPort: Send + Sync {
    /// Identity of the embedding model; the persisted index is keyed by it.
    fn model(&self) -> &ModelName;

    /// Embed a single text.
    fn embed(&self, ctx: &RequestContext, request: EmbedRequest) -> BoxFuture<'_, Result<Vec<f32>>>;
}
