//! Completion orchestration: retrieve, prompt, generate, clean up.

use crate::postprocess::postprocess;
use crate::prompt::{DEFAULT_CONTEXT_LINES, completion_prompt, last_lines};
use crate::retriever::{DEFAULT_TOP_K, Retriever, format_context};
use pilot_domain::CompletionRequest;
use pilot_ports::{GenerateRequest, LoggerPort, ModelServicePort, log_fields};
use pilot_shared::{RequestContext, Result};
use std::sync::Arc;

/// Dependencies required by the orchestrator.
#[derive(Clone)]
pub struct CompletionDeps {
    /// Generation backend.
    pub model: Arc<dyn ModelServicePort>,
    /// Project-context retrieval; `None` disables it.
    pub retriever: Option<Retriever>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Prompt parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionSettings {
    /// Instructions placed in the system section.
    pub system_message: String,
    /// Lines before the cursor kept in the prompt.
    pub context_lines: usize,
    /// Retrieved chunks included as project context.
    pub top_k: usize,
}

impl Default for CompletionSettings {
    fn default() -> Self {
        Self {
            system_message: String::new(),
            context_lines: DEFAULT_CONTEXT_LINES,
            top_k: DEFAULT_TOP_K,
        }
    }
}

/// Turns a completion request into insertion text.
#[derive(Clone)]
pub struct CompletionOrchestrator {
    deps: CompletionDeps,
    settings: CompletionSettings,
}

impl CompletionOrchestrator {
    /// Orchestrator over `deps`.
    #[must_use]
    pub const fn new(deps: CompletionDeps, settings: CompletionSettings) -> Self {
        Self { deps, settings }
    }

    /// Produce the text to insert at the cursor.
    ///
    /// `Ok(None)` means no suggestion: the request was cancelled at some
    /// checkpoint or the model returned nothing new. Only model failures
    /// surface as errors; retrieval failures degrade to no project context.
    #[tracing::instrument(
        name = "completion",
        skip_all,
        fields(correlation_id = ctx.correlation_id().as_str(), document = &*request.document)
    )]
    pub async fn complete(
        &self,
        ctx: &RequestContext,
        request: &CompletionRequest,
    ) -> Result<Option<String>> {
        if ctx.is_cancelled() {
            return Ok(self.cancelled("start"));
        }

        let window = last_lines(&request.context_window, self.settings.context_lines);
        let project_context = self.project_context(ctx, window).await;
        if ctx.is_cancelled() {
            return Ok(self.cancelled("retrieve"));
        }

        let prompt = completion_prompt(
            &self.settings.system_message,
            &request.document,
            window,
            &project_context,
        );
        let generated = self
            .deps
            .model
            .generate_completion(
                ctx,
                GenerateRequest {
                    prompt,
                    system: Some(self.settings.system_message.clone()),
                },
            )
            .await;
        let raw = match generated {
            Ok(raw) => raw,
            Err(error) if error.is_cancelled() || ctx.is_cancelled() => {
                return Ok(self.cancelled("generate"));
            },
            Err(error) => {
                if let Some(logger) = self.deps.logger.as_ref() {
                    logger.error(
                        "completion.failed",
                        "Model call failed",
                        Some(log_fields! {
                            "code" => error.code.to_string(),
                            "message" => error.message.clone(),
                        }),
                    );
                }
                return Err(error);
            },
        };
        if ctx.is_cancelled() {
            return Ok(self.cancelled("postprocess"));
        }

        let text = postprocess(window, &raw);
        if let Some(logger) = self.deps.logger.as_ref() {
            logger.debug(
                "completion.completed",
                "Completion produced",
                Some(log_fields! {
                    "rawChars" => raw.len(),
                    "insertChars" => text.len(),
                    "withProjectContext" => !project_context.is_empty(),
                }),
            );
        }
        Ok((!text.trim().is_empty()).then_some(text))
    }

    async fn project_context(&self, ctx: &RequestContext, window: &str) -> String {
        let Some(retriever) = self.deps.retriever.as_ref() else {
            return String::new();
        };
        match retriever.retrieve(ctx, window, self.settings.top_k).await {
            Ok(result) => format_context(&result),
            Err(error) => {
                if !error.is_cancelled()
                    && let Some(logger) = self.deps.logger.as_ref()
                {
                    logger.warn(
                        "completion.retrieve.failed",
                        "Retrieval failed; continuing without project context",
                        Some(log_fields! {
                            "code" => error.code.to_string(),
                            "message" => error.message.clone(),
                        }),
                    );
                }
                String::new()
            },
        }
    }

    fn cancelled(&self, stage: &'static str) -> Option<String> {
        if let Some(logger) = self.deps.logger.as_ref() {
            logger.debug(
                "completion.cancelled",
                "Completion cancelled",
                Some(log_fields! { "stage" => stage }),
            );
        }
        None
    }
}
