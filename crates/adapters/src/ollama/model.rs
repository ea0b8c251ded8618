//! Ollama generation, chat and model lifecycle adapter.

use super::OllamaTransport;
use pilot_ports::{
    BoxFuture, ChatMessage, GenerateRequest, ModelName, ModelServicePort, model_load_failed,
};
use pilot_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use serde::{Deserialize, Serialize};

const GENERATE_PATH: &str = "/api/generate";
const CHAT_PATH: &str = "/api/chat";

/// Model service backed by an Ollama server.
///
/// Completion and chat use the configured model; load/unload accept any name.
#[derive(Debug, Clone)]
pub struct OllamaModelService {
    transport: OllamaTransport,
    model: Option<ModelName>,
}

impl OllamaModelService {
    /// Service on `transport`'s server, generating with `model` when set.
    pub const fn new(transport: OllamaTransport, model: Option<ModelName>) -> Self {
        Self { transport, model }
    }

    fn require_model(&self) -> Result<&ModelName> {
        self.model.as_ref().ok_or_else(|| {
            ErrorEnvelope::expected(
                ErrorCode::new("config", "missing_model"),
                "no completion model configured; set model.model or PILOT_MODEL",
            )
        })
    }

    async fn lifecycle(
        &self,
        ctx: &RequestContext,
        model: ModelName,
        keep_alive: Option<u32>,
        operation: &'static str,
    ) -> Result<()> {
        let body = LifecycleRequest {
            model: model.as_str(),
            keep_alive,
        };
        let result: Result<serde_json::Value> = self
            .transport
            .post_json(ctx, GENERATE_PATH, &body, operation)
            .await;
        result.map(|_| ()).map_err(|error| {
            if error.is_cancelled() {
                return error;
            }
            let verb = if keep_alive.is_some() { "unload" } else { "load" };
            let wrapped = ErrorEnvelope::unexpected(
                model_load_failed(),
                format!("failed to {verb} model {model}: {}", error.message),
                error.class,
            )
            .with_metadata("model", model.as_str().to_owned())
            .with_metadata("cause", error.code.to_string());
            match error.metadata.get("status") {
                Some(status) => wrapped.with_metadata("status", status.clone()),
                None => wrapped,
            }
        })
    }
}

impl ModelServicePort for OllamaModelService {
    fn generate_completion(
        &self,
        ctx: &RequestContext,
        request: GenerateRequest,
    ) -> BoxFuture<'_, Result<String>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let model = self.require_model()?;
            let body = GenerateBody {
                model: model.as_str(),
                prompt: &request.prompt,
                system: request.system.as_deref(),
                options: GenerateOptions { temperature: 0.0 },
                stream: false,
            };
            let response: GenerateResponse = self
                .transport
                .post_json(&ctx, GENERATE_PATH, &body, "ollama.generate")
                .await?;
            Ok(response.response)
        })
    }

    fn chat(
        &self,
        ctx: &RequestContext,
        messages: Vec<ChatMessage>,
    ) -> BoxFuture<'_, Result<ChatMessage>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            let model = self.require_model()?;
            let body = ChatBody {
                model: model.as_str(),
                messages: &messages,
                stream: false,
            };
            let response: ChatResponse = self
                .transport
                .post_json(&ctx, CHAT_PATH, &body, "ollama.chat")
                .await?;
            Ok(response.message)
        })
    }

    fn load_model(&self, ctx: &RequestContext, model: ModelName) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move { self.lifecycle(&ctx, model, None, "ollama.load_model").await })
    }

    fn unload_model(&self, ctx: &RequestContext, model: ModelName) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            self.lifecycle(&ctx, model, Some(0), "ollama.unload_model")
                .await
        })
    }
}

#[derive(Debug, Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct GenerateBody<'a> {
    model: &'a str,
    prompt: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<&'a str>,
    options: GenerateOptions,
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
}

#[derive(Debug, Serialize)]
struct ChatBody<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    stream: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    message: ChatMessage,
}

#[derive(Debug, Serialize)]
struct LifecycleRequest<'a> {
    model: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    keep_alive: Option<u32>,
}
