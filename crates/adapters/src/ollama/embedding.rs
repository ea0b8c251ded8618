//! Ollama embedding adapter (`/api/embeddings`).

use super::OllamaTransport;
use pilot_ports::{BoxFuture, EmbedRequest, EmbeddingPort, ModelName};
use pilot_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use serde::{Deserialize, Serialize};

const EMBEDDINGS_PATH: &str = "/api/embeddings";

/// Embeds text with an Ollama embedding model.
#[derive(Debug, Clone)]
pub struct OllamaEmbedding {
    transport: OllamaTransport,
    model: ModelName,
}

impl OllamaEmbedding {
    /// Adapter for `model` on `transport`'s server.
    pub const fn new(transport: OllamaTransport, model: ModelName) -> Self {
        Self { transport, model }
    }
}

impl EmbeddingPort for OllamaEmbedding {
    fn model(&self) -> &ModelName {
        &self.model
    }

    fn embed(&self, ctx: &RequestContext, request: EmbedRequest) -> BoxFuture<'_, Result<Vec<f32>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let body = EmbeddingsRequest {
                model: self.model.as_str(),
                prompt: &request.text,
            };
            let response: EmbeddingsResponse = self
                .transport
                .post_json(&ctx, EMBEDDINGS_PATH, &body, "ollama.embed")
                .await?;
            if response.embedding.is_empty() {
                return Err(ErrorEnvelope::unexpected(
                    ErrorCode::new("ollama", "empty_embedding"),
                    "Ollama returned an empty embedding",
                    ErrorClass::NonRetriable,
                )
                .with_metadata("model", self.model.as_str().to_owned()));
            }
            Ok(response.embedding)
        })
    }
}

#[derive(Debug, Serialize)]
struct EmbeddingsRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingsResponse {
    #[serde(default)]
    embedding: Vec<f32>,
}
