//! Event-driven front door for one workspace.
//!
//! The host pushes [`WorkspaceEvent`]s into a channel; the session turns
//! them into indexer runs, scheduled completions and chat turns, and reports
//! back through the [`NotificationPort`]. Each event is handled on its own
//! task so a slow index run never delays a completion. Completion requests
//! claim their scheduler slot in the receive loop, so arrival order decides
//! which request supersedes which.

use crate::chat::ChatSession;
use crate::indexer::{IndexSummary, Indexer};
use crate::orchestrator::CompletionOrchestrator;
use crate::scheduler::{CompletionScheduler, CompletionTicket};
use pilot_domain::{ChatMessage, CompletionRequest};
use pilot_ports::{LoggerPort, Notification, NotificationPort, log_fields};
use pilot_shared::{
    CancellationToken, CorrelationId, Debouncer, ErrorEnvelope, RequestContext, Result,
    ScheduleOutcome,
};
use std::collections::BTreeSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;

/// Inputs the host feeds into a session.
#[derive(Debug)]
pub enum WorkspaceEvent {
    /// Workspace opened: load the persisted index, prune, then scan.
    Opened,
    /// A file was saved; re-indexed after the save debounce window.
    FileSaved {
        /// Saved file.
        path: Box<str>,
    },
    /// Files were deleted; their chunks are dropped immediately.
    FilesDeleted {
        /// Deleted files.
        paths: Vec<Box<str>>,
    },
    /// Explicit re-index request.
    ReindexRequested {
        /// Ignore watermarks and re-embed everything.
        force: bool,
    },
    /// Inline completion at the cursor.
    CompletionRequested {
        /// Context window and document.
        request: CompletionRequest,
        /// Fires when the host no longer wants the result.
        host_cancellation: CancellationToken,
        /// Receives the terminal outcome.
        reply: oneshot::Sender<ScheduleOutcome<Option<String>>>,
    },
    /// One chat turn.
    ChatRequested {
        /// User prompt.
        prompt: String,
        /// Receives the assistant reply.
        reply: oneshot::Sender<Result<ChatMessage>>,
    },
    /// Stop the session, cancelling outstanding work.
    Shutdown,
}

/// Dependencies required by a session.
#[derive(Clone)]
pub struct SessionDeps {
    /// Sole index writer.
    pub indexer: Arc<Indexer>,
    /// Completion pipeline.
    pub orchestrator: Arc<CompletionOrchestrator>,
    /// Conversation state.
    pub chat: Arc<ChatSession>,
    /// Host notifications.
    pub notifier: Arc<dyn NotificationPort>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Debounce windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SessionSettings {
    /// Quiet window before saved files are re-indexed.
    pub save_debounce: Duration,
    /// Quiet window before a completion request is issued.
    pub completion_debounce: Duration,
}

struct SessionInner {
    deps: SessionDeps,
    save_debouncer: Debouncer,
    saved_paths: Mutex<BTreeSet<Box<str>>>,
    scheduler: CompletionScheduler,
    shutdown: CancellationToken,
}

/// Consumes workspace events until shutdown.
#[derive(Clone)]
pub struct WorkspaceSession {
    inner: Arc<SessionInner>,
}

impl WorkspaceSession {
    /// Session over `deps`.
    #[must_use]
    pub fn new(deps: SessionDeps, settings: SessionSettings) -> Self {
        Self {
            inner: Arc::new(SessionInner {
                deps,
                save_debouncer: Debouncer::new(settings.save_debounce),
                saved_paths: Mutex::new(BTreeSet::new()),
                scheduler: CompletionScheduler::new(settings.completion_debounce),
                shutdown: CancellationToken::new(),
            }),
        }
    }

    /// Handle events until [`WorkspaceEvent::Shutdown`] or the channel closes,
    /// then cancel and drain outstanding work.
    pub async fn run(self, mut events: mpsc::Receiver<WorkspaceEvent>) {
        let mut tasks = JoinSet::new();
        while let Some(event) = events.recv().await {
            let inner = Arc::clone(&self.inner);
            match event {
                WorkspaceEvent::Shutdown => break,
                WorkspaceEvent::CompletionRequested {
                    request,
                    host_cancellation,
                    reply,
                } => {
                    let claimed = inner.scheduler.begin();
                    tasks.spawn(async move {
                        let outcome = inner.complete(claimed, request, &host_cancellation).await;
                        let _ = reply.send(outcome);
                    });
                },
                event => {
                    tasks.spawn(async move { inner.handle(event).await });
                },
            }
            while tasks.try_join_next().is_some() {}
        }

        self.inner.shutdown.cancel();
        self.inner.scheduler.cancel_in_flight();
        while tasks.join_next().await.is_some() {}
        if let Some(logger) = self.inner.deps.logger.as_ref() {
            logger.info("session.stopped", "Workspace session stopped", None);
        }
    }
}

impl SessionInner {
    fn request_ctx(&self) -> RequestContext {
        RequestContext::with_cancellation(CorrelationId::new_request_id(), self.shutdown.child())
    }

    async fn handle(&self, event: WorkspaceEvent) {
        match event {
            WorkspaceEvent::Opened => self.open().await,
            WorkspaceEvent::FileSaved { path } => self.file_saved(path).await,
            WorkspaceEvent::FilesDeleted { paths } => {
                let ctx = self.request_ctx();
                let result = self.deps.indexer.remove_paths(&ctx, &paths).await;
                self.report_index(result);
            },
            WorkspaceEvent::ReindexRequested { force } => {
                let ctx = self.request_ctx();
                let result = self.deps.indexer.run_full(&ctx, force).await;
                self.report_index(result);
            },
            WorkspaceEvent::ChatRequested { prompt, reply } => {
                let ctx = self.request_ctx();
                let _ = reply.send(self.deps.chat.send(&ctx, &prompt).await);
            },
            // Handled by the receive loop.
            WorkspaceEvent::CompletionRequested { .. } | WorkspaceEvent::Shutdown => {},
        }
    }

    async fn open(&self) {
        let ctx = self.request_ctx();
        let opened = self.deps.indexer.open(&ctx).await;
        let failed = opened.is_err();
        self.report_index(opened);
        if !failed {
            let result = self.deps.indexer.run_full(&ctx, false).await;
            self.report_index(result);
        }
    }

    async fn file_saved(&self, path: Box<str>) {
        self.lock_saved().insert(path);
        let ctx = self.request_ctx();
        let outcome = self
            .save_debouncer
            .run(&ctx, || async {
                let current = self.deps.indexer.snapshot();
                let mut merged = IndexSummary {
                    total_chunks: current.len(),
                    total_files: current.file_count(),
                    ..IndexSummary::default()
                };
                while let Some(path) = self.next_saved() {
                    let summary = match self.deps.indexer.run_file(&ctx, &path).await {
                        Ok(summary) => summary,
                        Err(error) => {
                            // Retried with the next save.
                            self.lock_saved().insert(path);
                            return Err(error);
                        },
                    };
                    merged.files_indexed += summary.files_indexed;
                    merged.files_removed += summary.files_removed;
                    merged.failures.extend(summary.failures);
                    merged.persist_error = summary.persist_error.or(merged.persist_error);
                    merged.total_chunks = summary.total_chunks;
                    merged.total_files = summary.total_files;
                }
                Ok::<_, ErrorEnvelope>(merged)
            })
            .await;
        match outcome {
            ScheduleOutcome::Completed(summary) => self.report_index(Ok(summary)),
            ScheduleOutcome::Failed(error) => self.report_index(Err(error)),
            ScheduleOutcome::Superseded | ScheduleOutcome::Cancelled => {},
        }
    }

    async fn complete(
        &self,
        claimed: CompletionTicket,
        request: CompletionRequest,
        host_cancellation: &CancellationToken,
    ) -> ScheduleOutcome<Option<String>> {
        let ctx = self.request_ctx().merged_with(host_cancellation);
        let orchestrator = Arc::clone(&self.deps.orchestrator);
        let scheduled = self
            .scheduler
            .run(claimed, &ctx, move |ctx| async move {
                orchestrator.complete(&ctx, &request).await
            })
            .await;

        match &scheduled.outcome {
            ScheduleOutcome::Completed(Some(text)) => {
                self.deps.notifier.notify(Notification::CompletionAvailable {
                    text: text.clone(),
                });
            },
            ScheduleOutcome::Completed(None) => {
                self.deps.notifier.notify(Notification::CompletionEmpty);
            },
            ScheduleOutcome::Failed(error) => {
                if let Some(logger) = self.deps.logger.as_ref() {
                    logger.warn(
                        "session.completion.failed",
                        "Completion failed",
                        Some(log_fields! { "code" => error.code.to_string() }),
                    );
                }
            },
            ScheduleOutcome::Superseded | ScheduleOutcome::Cancelled => {},
        }
        scheduled.outcome
    }

    fn report_index(&self, result: Result<IndexSummary>) {
        match result {
            Ok(summary) => {
                for failure in summary.failures {
                    self.deps.notifier.notify(Notification::IndexingError {
                        path: Some(failure.path),
                        message: failure.message,
                    });
                }
                if let Some(message) = summary.persist_error {
                    self.deps
                        .notifier
                        .notify(Notification::IndexingError { path: None, message });
                }
                self.deps.notifier.notify(Notification::IndexUpdated {
                    chunks: summary.total_chunks,
                    files: summary.total_files,
                });
            },
            Err(error) if error.is_cancelled() => {},
            Err(error) => {
                self.deps.notifier.notify(Notification::IndexingError {
                    path: None,
                    message: error.message,
                });
            },
        }
    }

    fn next_saved(&self) -> Option<Box<str>> {
        self.lock_saved().pop_first()
    }

    fn lock_saved(&self) -> std::sync::MutexGuard<'_, BTreeSet<Box<str>>> {
        self.saved_paths
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}
