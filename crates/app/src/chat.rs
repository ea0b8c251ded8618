//! Chat turns with retrieved project context.

use crate::prompt::chat_context_message;
use crate::retriever::{DEFAULT_TOP_K, Retriever, format_context};
use pilot_domain::{ChatMessage, ChatTranscript};
use pilot_ports::{LoggerPort, ModelServicePort, log_fields};
use pilot_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::sync::Arc;

/// Dependencies required by a chat session.
#[derive(Clone)]
pub struct ChatDeps {
    /// Chat backend.
    pub model: Arc<dyn ModelServicePort>,
    /// Project-context retrieval; `None` disables it.
    pub retriever: Option<Retriever>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// One conversation. Turns are serialized.
pub struct ChatSession {
    deps: ChatDeps,
    top_k: usize,
    transcript: tokio::sync::Mutex<ChatTranscript>,
}

impl ChatSession {
    /// Start a conversation with `system_message`, keeping at most
    /// `max_messages` messages when set.
    pub fn new(
        deps: ChatDeps,
        system_message: impl Into<String>,
        max_messages: Option<usize>,
    ) -> Self {
        Self {
            deps,
            top_k: DEFAULT_TOP_K,
            transcript: tokio::sync::Mutex::new(ChatTranscript::new(system_message, max_messages)),
        }
    }

    /// Override how many chunks are retrieved per turn.
    #[must_use]
    pub const fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Copy of the transcript.
    pub async fn transcript(&self) -> ChatTranscript {
        self.transcript.lock().await.clone()
    }

    /// Send `prompt` and return the assistant reply.
    ///
    /// The transcript only changes when the turn succeeds.
    pub async fn send(&self, ctx: &RequestContext, prompt: &str) -> Result<ChatMessage> {
        if prompt.trim().is_empty() {
            return Err(ErrorEnvelope::expected(
                ErrorCode::new("chat", "empty_prompt"),
                "chat prompt must be non-empty",
            ));
        }
        let mut transcript = self.transcript.lock().await;
        ctx.ensure_not_cancelled("chat.start")?;

        let mut pending = Vec::with_capacity(2);
        let project_context = self.project_context(ctx, prompt).await;
        if !project_context.is_empty() {
            pending.push(ChatMessage::system(chat_context_message(&project_context)));
        }
        pending.push(ChatMessage::user(prompt));
        ctx.ensure_not_cancelled("chat.retrieve")?;

        let reply = match self.deps.model.chat(ctx, transcript.with_pending(&pending)).await {
            Ok(reply) => reply,
            Err(error) => {
                if !error.is_cancelled()
                    && let Some(logger) = self.deps.logger.as_ref()
                {
                    logger.error(
                        "chat.failed",
                        "Chat turn failed",
                        Some(log_fields! {
                            "code" => error.code.to_string(),
                            "message" => error.message.clone(),
                        }),
                    );
                }
                return Err(error);
            },
        };
        ctx.ensure_not_cancelled("chat.reply")?;

        pending.push(reply.clone());
        transcript.extend(pending);
        if let Some(logger) = self.deps.logger.as_ref() {
            logger.debug(
                "chat.completed",
                "Chat turn completed",
                Some(log_fields! {
                    "messages" => transcript.len(),
                    "withProjectContext" => !project_context.is_empty(),
                }),
            );
        }
        Ok(reply)
    }

    async fn project_context(&self, ctx: &RequestContext, prompt: &str) -> String {
        let Some(retriever) = self.deps.retriever.as_ref() else {
            return String::new();
        };
        match retriever.retrieve(ctx, prompt, self.top_k).await {
            Ok(result) => format_context(&result),
            Err(error) => {
                if !error.is_cancelled()
                    && let Some(logger) = self.deps.logger.as_ref()
                {
                    logger.warn(
                        "chat.retrieve.failed",
                        "Retrieval failed; continuing without project context",
                        Some(log_fields! { "code" => error.code.to_string() }),
                    );
                }
                String::new()
            },
        }
    }
}
