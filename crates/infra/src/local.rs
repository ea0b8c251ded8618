//! Entry points for the local CLI.
//!
//! Each operation has an async form over a [`LocalWorkspace`] and a blocking
//! `*_local` wrapper that loads config, wires the workspace and drives the
//! future on a current-thread runtime. Ctrl-C cancels the running request.

use crate::observability::{logger_from_env, scope_logger};
use crate::workspace::{LocalWorkspace, load_workspace_config, workspace_relative};
use crate::{InfraError, InfraResult};
use pilot_app::{DEFAULT_TOP_K, IndexSummary};
use pilot_config::PilotConfig;
use pilot_domain::{ChatMessage, CompletionRequest, ModelName, RetrievalResult};
use pilot_ports::{LoggerPort, log_fields};
use pilot_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;

/// Model lifecycle action.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelAction {
    /// Load the model into server memory.
    Load,
    /// Evict the model from server memory.
    Unload,
}

/// Load the persisted index, prune deletions, then index the whole workspace
/// or a single file.
pub async fn index_workspace(
    workspace: &LocalWorkspace,
    ctx: &RequestContext,
    file: Option<&Path>,
    force: bool,
) -> InfraResult<IndexSummary> {
    let file = file
        .map(|path| workspace_relative(workspace.root(), path))
        .transpose()?;
    let embedding = workspace.embedding()?;
    let indexer = workspace.indexer(&embedding)?;
    let opened = indexer.open(ctx).await?;
    let mut summary = match file {
        Some(path) => indexer.run_file(ctx, &path).await?,
        None => indexer.run_full(ctx, force).await?,
    };
    summary.files_removed += opened.files_removed;
    summary.chunks_removed += opened.chunks_removed;
    if summary.persist_error.is_none() {
        summary.persist_error = opened.persist_error;
    }
    Ok(summary)
}

/// Load the persisted index and drop chunks of files that no longer exist.
pub async fn prune_workspace(
    workspace: &LocalWorkspace,
    ctx: &RequestContext,
) -> InfraResult<IndexSummary> {
    let embedding = workspace.embedding()?;
    workspace.indexer(&embedding)?.open(ctx).await
}

/// Rank indexed chunks against `query`.
pub async fn retrieve_workspace(
    workspace: &LocalWorkspace,
    ctx: &RequestContext,
    query: &str,
    top_k: Option<usize>,
) -> InfraResult<RetrievalResult> {
    let embedding = workspace.embedding()?;
    let indexer = workspace.indexer(&embedding)?;
    indexer.open(ctx).await?;
    let top_k = top_k.unwrap_or_else(|| {
        usize::try_from(workspace.config().completion.top_k).unwrap_or(DEFAULT_TOP_K)
    });
    LocalWorkspace::retriever(&indexer, &embedding)
        .retrieve(ctx, query, top_k)
        .await
}

/// Complete `context_window` typed in `document`.
///
/// Project context is used when an embedding model is configured; without
/// one the completion runs on the context window alone.
pub async fn complete_workspace(
    workspace: &LocalWorkspace,
    ctx: &RequestContext,
    document: &str,
    context_window: &str,
) -> InfraResult<Option<String>> {
    workspace.config().completion_model()?;
    let retriever = match workspace.embedding() {
        Ok(embedding) => {
            let indexer = workspace.indexer(&embedding)?;
            indexer.open(ctx).await?;
            Some(LocalWorkspace::retriever(&indexer, &embedding))
        },
        Err(error) if error.code == ErrorCode::new("config", "missing_model") => None,
        Err(error) => return Err(error),
    };
    workspace
        .orchestrator(retriever)
        .complete(ctx, &CompletionRequest::new(context_window, document))
        .await
}

/// One chat turn with project context.
pub async fn chat_workspace(
    workspace: &LocalWorkspace,
    ctx: &RequestContext,
    prompt: &str,
) -> InfraResult<ChatMessage> {
    workspace.config().completion_model()?;
    let embedding = workspace.embedding()?;
    let indexer = workspace.indexer(&embedding)?;
    indexer.open(ctx).await?;
    let retriever = LocalWorkspace::retriever(&indexer, &embedding);
    workspace
        .chat_session(Some(retriever))
        .send(ctx, prompt)
        .await
}

/// Load or unload `model` on the configured server.
pub async fn model_lifecycle(
    workspace: &LocalWorkspace,
    ctx: &RequestContext,
    action: ModelAction,
    model: ModelName,
) -> InfraResult<()> {
    let service = workspace.model_service();
    match action {
        ModelAction::Load => service.load_model(ctx, model).await,
        ModelAction::Unload => service.unload_model(ctx, model).await,
    }
}

/// Blocking [`index_workspace`].
pub fn run_index_local(
    root: &Path,
    config_path: Option<&Path>,
    file: Option<&Path>,
    force: bool,
) -> InfraResult<IndexSummary> {
    run_local(root, config_path, "index", |workspace, ctx| async move {
        index_workspace(&workspace, &ctx, file, force).await
    })
}

/// Blocking [`prune_workspace`].
pub fn run_prune_local(root: &Path, config_path: Option<&Path>) -> InfraResult<IndexSummary> {
    run_local(root, config_path, "prune", |workspace, ctx| async move {
        prune_workspace(&workspace, &ctx).await
    })
}

/// Blocking [`retrieve_workspace`].
pub fn run_retrieve_local(
    root: &Path,
    config_path: Option<&Path>,
    query: &str,
    top_k: Option<usize>,
) -> InfraResult<RetrievalResult> {
    run_local(root, config_path, "retrieve", |workspace, ctx| async move {
        retrieve_workspace(&workspace, &ctx, query, top_k).await
    })
}

/// Blocking [`complete_workspace`].
pub fn run_complete_local(
    root: &Path,
    config_path: Option<&Path>,
    document: &str,
    context_window: &str,
) -> InfraResult<Option<String>> {
    run_local(root, config_path, "complete", |workspace, ctx| async move {
        complete_workspace(&workspace, &ctx, document, context_window).await
    })
}

/// Blocking [`chat_workspace`].
pub fn run_chat_local(
    root: &Path,
    config_path: Option<&Path>,
    prompt: &str,
) -> InfraResult<ChatMessage> {
    run_local(root, config_path, "chat", |workspace, ctx| async move {
        chat_workspace(&workspace, &ctx, prompt).await
    })
}

/// Blocking [`model_lifecycle`].
pub fn run_model_local(
    root: &Path,
    config_path: Option<&Path>,
    action: ModelAction,
    model: &str,
) -> InfraResult<()> {
    let model = ModelName::parse(model)?;
    run_local(root, config_path, "model", |workspace, ctx| async move {
        model_lifecycle(&workspace, &ctx, action, model).await
    })
}

/// Effective config with URL credentials masked.
pub fn show_config_local(root: &Path, config_path: Option<&Path>) -> InfraResult<PilotConfig> {
    Ok(load_workspace_config(root, config_path)?.redacted())
}

fn run_local<F, T>(
    root: &Path,
    config_path: Option<&Path>,
    command: &'static str,
    op: impl FnOnce(LocalWorkspace, RequestContext) -> F,
) -> InfraResult<T>
where
    F: Future<Output = InfraResult<T>>,
{
    let config = load_workspace_config(root, config_path)?;
    let ctx = RequestContext::new_request();
    let logger = scope_logger(logger_from_env().as_ref(), &ctx);
    let workspace = LocalWorkspace::new(root, config, logger.clone())?;
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(InfraError::from)?;

    runtime.block_on(async move {
        let watcher = spawn_interrupt_watcher(&ctx);
        let result = op(workspace, ctx.clone()).await;
        watcher.abort();
        log_outcome(logger.as_ref(), command, &result);
        result
    })
}

fn spawn_interrupt_watcher(ctx: &RequestContext) -> tokio::task::JoinHandle<()> {
    let token = ctx.cancellation_token();
    tokio::spawn(async move {
        tokio::select! {
            () = token.cancelled() => {},
            signal = tokio::signal::ctrl_c() => {
                if signal.is_ok() {
                    token.cancel();
                }
            },
        }
    })
}

fn log_outcome<T>(logger: Option<&Arc<dyn LoggerPort>>, command: &str, result: &InfraResult<T>) {
    let Some(logger) = logger else {
        return;
    };
    match result {
        Ok(_) => logger.debug(
            "cli.command.completed",
            "Command completed",
            Some(log_fields! { "command" => command }),
        ),
        Err(error) if error.is_cancelled() => logger.info(
            "cli.command.cancelled",
            "Command cancelled",
            Some(log_fields! { "command" => command }),
        ),
        Err(error) => logger.error(
            "cli.command.failed",
            "Command failed",
            Some(log_fields! {
                "command" => command,
                "code" => error.code.to_string(),
                "message" => error.message.clone(),
            }),
        ),
    }
}

/// Exit classes the CLI maps errors onto.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureClass {
    /// Bad arguments or config.
    InvalidInput,
    /// Filesystem or model server trouble.
    Service,
    /// Bugs and invariant violations.
    Internal,
}

/// Classify `error` for exit-code purposes.
#[must_use]
pub fn classify_failure(error: &ErrorEnvelope) -> FailureClass {
    let core = error.code.namespace() == "core";
    match error.code.code() {
        "io" | "not_found" | "permission_denied" | "timeout" | "dependency_unavailable"
        | "cancelled"
            if core =>
        {
            FailureClass::Service
        },
        "invalid_input" if core => FailureClass::InvalidInput,
        _ if matches!(error.code.namespace(), "config" | "ui" | "chat") => {
            FailureClass::InvalidInput
        },
        _ if matches!(error.code.namespace(), "ollama" | "model" | "store" | "workspace") => {
            if error.class == ErrorClass::Retriable {
                FailureClass::Service
            } else {
                FailureClass::InvalidInput
            }
        },
        _ => FailureClass::Internal,
    }
}
