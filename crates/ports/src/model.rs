//! Generative model service boundary contract.

use crate::BoxFuture;
use pilot_domain::{ChatMessage, ModelName};
use pilot_shared::{ErrorCode, RequestContext, Result};

/// Single-shot generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerateRequest {
    /// Full prompt text.
    pub prompt: String,
    /// System instructions sent alongside the prompt.
    pub system: Option<String>,
}

/// Error code for failed model load/unload calls.
pub fn model_load_failed() -> ErrorCode {
    ErrorCode::new("model", "load_failed")
}

/// Boundary contract for the generative model server.
///
/// Every call races the context's cancellation; a cancelled call resolves with
/// a `core:cancelled` error and the underlying request is dropped.
pub trait ModelServicePort: Send + Sync {
    /// Generate a completion for a prompt.
    fn generate_completion(
        &self,
        ctx: &RequestContext,
        request: GenerateRequest,
    ) -> BoxFuture<'_, Result<String>>;

    /// Send a whole conversation; returns the assistant's reply.
    fn chat(
        &self,
        ctx: &RequestContext,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<ChatMessage>>;

    /// Ask the server to load a model into memory.
    fn load_model(&self, ctx: &RequestContext, model: ModelName) -> BoxFuture<'_, Result<()>>;

    /// Ask the server to release a model.
    fn unload_model(&self, ctx: &RequestContext, model: ModelName) -> BoxFuture<'_, Result<()>>;
}
