//! Composition root: adapters and use cases for one local workspace.

use crate::InfraResult;
use pilot_adapters::{
    JsonChunkStore, LocalWorkspaceFiles, OllamaConfig, OllamaEmbedding, OllamaModelService,
    OllamaTransport,
};
use pilot_app::{
    ChatDeps, ChatSession, Chunker, CompletionDeps, CompletionOrchestrator, CompletionSettings,
    IndexHandle, Indexer, IndexerDeps, IndexerSettings, Retriever, SessionDeps, SessionSettings,
    WorkspaceSession,
};
use pilot_config::{ValidatedPilotConfig, discover_config_file, load_config_std_env};
use pilot_ports::{
    ChunkStorePort, EmbeddingPort, FileQuery, LoggerPort, ModelServicePort, NotificationPort,
};
use pilot_shared::{ErrorCode, ErrorEnvelope};
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

/// Load the effective config for `root`.
///
/// An explicit `config_path` wins; otherwise `.pilot/config.{toml,json}` under
/// the root is used when present. Env overrides apply on top of either.
pub fn load_workspace_config(
    root: &Path,
    config_path: Option<&Path>,
) -> InfraResult<ValidatedPilotConfig> {
    let discovered = match config_path {
        Some(path) => Some(path.to_path_buf()),
        None => discover_config_file(root),
    };
    load_config_std_env(discovered.as_deref())
}

/// `path` relative to `root` with `/` separators, as the index stores it.
pub fn workspace_relative(root: &Path, path: &Path) -> InfraResult<Box<str>> {
    let relative = if path.is_absolute() {
        path.strip_prefix(root).map_err(|_| {
            ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                format!("{} is outside the workspace {}", path.display(), root.display()),
            )
        })?
    } else {
        path
    };
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => parts.push(part.to_string_lossy().into_owned()),
            Component::CurDir => {},
            _ => {
                return Err(ErrorEnvelope::expected(
                    ErrorCode::invalid_input(),
                    format!("{} must stay inside the workspace", path.display()),
                ));
            },
        }
    }
    if parts.is_empty() {
        return Err(ErrorEnvelope::expected(
            ErrorCode::invalid_input(),
            "file path must name a file inside the workspace",
        ));
    }
    Ok(parts.join("/").into_boxed_str())
}

/// Adapters and use cases wired from config for a workspace root.
///
/// Embedding and model adapters are built on demand so commands that need
/// only one of them do not require both model names.
pub struct LocalWorkspace {
    root: PathBuf,
    config: ValidatedPilotConfig,
    transport: OllamaTransport,
    logger: Option<Arc<dyn LoggerPort>>,
}

impl LocalWorkspace {
    /// Wire `root` with `config`.
    pub fn new(
        root: impl Into<PathBuf>,
        config: ValidatedPilotConfig,
        logger: Option<Arc<dyn LoggerPort>>,
    ) -> InfraResult<Self> {
        let transport = OllamaTransport::new(&OllamaConfig::from_config(&config))?;
        Ok(Self {
            root: root.into(),
            config,
            transport,
            logger,
        })
    }

    /// Workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Effective config.
    #[must_use]
    pub const fn config(&self) -> &ValidatedPilotConfig {
        &self.config
    }

    /// Ollama embedding adapter for `model.embeddingModel`.
    pub fn embedding(&self) -> InfraResult<Arc<dyn EmbeddingPort>> {
        let model = self.config.embedding_model()?;
        Ok(Arc::new(OllamaEmbedding::new(self.transport.clone(), model)))
    }

    /// Ollama model service; completion and chat need `model.model`.
    #[must_use]
    pub fn model_service(&self) -> Arc<dyn ModelServicePort> {
        Arc::new(OllamaModelService::new(
            self.transport.clone(),
            self.config.completion_model().ok(),
        ))
    }

    /// Indexer over the local files and the JSON store, keyed by the
    /// embedding model of `embedding`.
    pub fn indexer(&self, embedding: &Arc<dyn EmbeddingPort>) -> InfraResult<Arc<Indexer>> {
        let indexing = &self.config.indexing;
        let mut store = JsonChunkStore::new(
            &self.root,
            &indexing.index_path,
            embedding.model().clone(),
        );
        if let Some(logger) = self.logger.as_ref() {
            store = store.with_logger(Arc::clone(logger));
        }
        tracing::debug!(
            root = %self.root.display(),
            store = ?store.index_path(),
            "wiring indexer"
        );
        let settings = IndexerSettings {
            query: FileQuery {
                include: boxed(&indexing.include_globs),
                exclude: boxed(&indexing.exclude_globs),
                max_results: to_usize(indexing.max_results),
            },
            chunker: Chunker::new(to_usize(indexing.chunk_lines), self.config.chunk_bounds())?,
        };
        Ok(Arc::new(Indexer::new(
            IndexerDeps {
                files: Arc::new(LocalWorkspaceFiles::new(self.root.clone())),
                embedding: Arc::clone(embedding),
                store: Arc::new(store) as Arc<dyn ChunkStorePort>,
                logger: self.logger.clone(),
            },
            settings,
            IndexHandle::default(),
        )?))
    }

    /// Retriever over the snapshots `indexer` publishes.
    #[must_use]
    pub fn retriever(indexer: &Indexer, embedding: &Arc<dyn EmbeddingPort>) -> Retriever {
        Retriever::new(Arc::clone(embedding), indexer.handle().clone())
    }

    /// Completion orchestrator with optional project context.
    #[must_use]
    pub fn orchestrator(&self, retriever: Option<Retriever>) -> CompletionOrchestrator {
        let completion = &self.config.completion;
        CompletionOrchestrator::new(
            CompletionDeps {
                model: self.model_service(),
                retriever,
                logger: self.logger.clone(),
            },
            CompletionSettings {
                system_message: self.config.prompts.auto_complete_system_message.clone(),
                context_lines: to_usize(completion.context_lines),
                top_k: to_usize(completion.top_k),
            },
        )
    }

    /// Chat session seeded with the chat system message.
    #[must_use]
    pub fn chat_session(&self, retriever: Option<Retriever>) -> ChatSession {
        ChatSession::new(
            ChatDeps {
                model: self.model_service(),
                retriever,
                logger: self.logger.clone(),
            },
            self.config.prompts.chat_system_message.clone(),
            self.config.chat.max_transcript_messages.map(to_usize),
        )
        .with_top_k(to_usize(self.config.completion.top_k))
    }

    /// Event-driven session over a fully wired workspace.
    pub fn session(&self, notifier: Arc<dyn NotificationPort>) -> InfraResult<WorkspaceSession> {
        let embedding = self.embedding()?;
        let indexer = self.indexer(&embedding)?;
        let retriever = Self::retriever(&indexer, &embedding);
        Ok(WorkspaceSession::new(
            SessionDeps {
                orchestrator: Arc::new(self.orchestrator(Some(retriever.clone()))),
                chat: Arc::new(self.chat_session(Some(retriever))),
                indexer,
                notifier,
                logger: self.logger.clone(),
            },
            SessionSettings {
                save_debounce: Duration::from_millis(self.config.indexing.save_debounce_ms),
                completion_debounce: Duration::from_millis(self.config.completion.debounce_ms),
            },
        ))
    }
}

fn boxed(globs: &[String]) -> Vec<Box<str>> {
    globs.iter().map(|glob| glob.as_str().into()).collect()
}

fn to_usize(value: u32) -> usize {
    usize::try_from(value).unwrap_or(usize::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths_use_forward_slashes() -> InfraResult<()> {
        let root = Path::new("/work/project");
        assert_eq!(&*workspace_relative(root, Path::new("/work/project/src/lib.rs"))?, "src/lib.rs");
        assert_eq!(&*workspace_relative(root, Path::new("./src/main.rs"))?, "src/main.rs");
        Ok(())
    }

    #[test]
    fn paths_outside_the_workspace_are_rejected() {
        let root = Path::new("/work/project");
        for path in ["/elsewhere/lib.rs", "../lib.rs", "."] {
            let error = workspace_relative(root, Path::new(path)).err();
            assert_eq!(
                error.map(|error| error.code),
                Some(ErrorCode::invalid_input()),
                "{path}"
            );
        }
    }
}
