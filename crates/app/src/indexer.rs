//! Incremental indexer.
//!
//! A file is re-chunked and re-embedded only when its modification time
//! differs from the watermark recorded at its last successful index. Both the
//! full scan and single-file runs only index paths the include/exclude globs
//! accept; indexed files the globs no longer accept are dropped. Per-file
//! failures are collected into the [`IndexSummary`]; only cancellation and an
//! unreachable embedding backend stop a run early, and even then the files
//! finished so far are published and persisted.

use crate::chunker::Chunker;
use crate::handle::IndexHandle;
use pilot_domain::{Chunk, IndexSnapshot};
use pilot_ports::{
    ChunkStorePort, EmbeddingPort, FileQuery, LogFields, LoggerPort, PathFilter,
    WorkspaceFilesPort, log_fields,
};
use pilot_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;

/// Dependencies required by the indexer.
#[derive(Clone)]
pub struct IndexerDeps {
    /// Workspace enumeration and reads.
    pub files: Arc<dyn WorkspaceFilesPort>,
    /// Embedding backend.
    pub embedding: Arc<dyn EmbeddingPort>,
    /// Persistence for the chunk list.
    pub store: Arc<dyn ChunkStorePort>,
    /// Optional logger.
    pub logger: Option<Arc<dyn LoggerPort>>,
}

/// Scan rules and chunking parameters.
#[derive(Debug, Clone)]
pub struct IndexerSettings {
    /// Include/exclude globs for every run; result cap for full scans.
    pub query: FileQuery,
    /// Line-window chunker.
    pub chunker: Chunker,
}

/// A file that could not be indexed during a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileFailure {
    /// File path as enumerated.
    pub path: Box<str>,
    /// Stable error code (`core:io`, ...).
    pub code: String,
    /// Error message.
    pub message: String,
}

/// Counters for one indexer operation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IndexSummary {
    /// Files considered.
    pub files_scanned: usize,
    /// Files re-chunked and re-embedded.
    pub files_indexed: usize,
    /// Files whose watermark matched.
    pub files_skipped: usize,
    /// Files dropped because they no longer exist.
    pub files_removed: usize,
    /// Chunks produced for indexed files.
    pub chunks_written: usize,
    /// Chunks dropped for removed or re-indexed files.
    pub chunks_removed: usize,
    /// Chunks stored without an embedding.
    pub embedding_failures: usize,
    /// Files skipped because of an error.
    pub failures: Vec<FileFailure>,
    /// Chunks in the index after the operation.
    pub total_chunks: usize,
    /// Files in the index after the operation.
    pub total_files: usize,
    /// Set when the updated index could not be written.
    pub persist_error: Option<String>,
}

impl IndexSummary {
    fn changed(&self) -> bool {
        self.files_indexed > 0 || self.chunks_removed > 0
    }

    fn record_removal(&mut self, working: &mut IndexSnapshot, path: &str) {
        let removed = working.remove_file(path);
        if removed > 0 {
            self.files_removed += 1;
            self.chunks_removed += removed;
        }
    }

    fn record_failure(&mut self, path: &str, error: &ErrorEnvelope) {
        self.failures.push(FileFailure {
            path: path.into(),
            code: error.code.to_string(),
            message: error.message.clone(),
        });
    }
}

/// Sole writer of the index.
///
/// Operations are serialized by an internal lock; readers go through the
/// [`IndexHandle`] and see the previous snapshot until a run publishes.
pub struct Indexer {
    deps: IndexerDeps,
    settings: IndexerSettings,
    filter: PathFilter,
    handle: IndexHandle,
    write_lock: tokio::sync::Mutex<()>,
}

impl Indexer {
    /// Indexer publishing into `handle`.
    ///
    /// # Errors
    ///
    /// `workspace:invalid_glob` when a scan glob does not parse.
    pub fn new(deps: IndexerDeps, settings: IndexerSettings, handle: IndexHandle) -> Result<Self> {
        let filter = PathFilter::new(&settings.query)?;
        Ok(Self {
            deps,
            settings,
            filter,
            handle,
            write_lock: tokio::sync::Mutex::new(()),
        })
    }

    /// Handle readers should use.
    #[must_use]
    pub const fn handle(&self) -> &IndexHandle {
        &self.handle
    }

    /// Current published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        self.handle.snapshot()
    }

    /// Load persisted chunks, publish them, then prune deleted files.
    pub async fn open(&self, ctx: &RequestContext) -> Result<IndexSummary> {
        let _guard = self.write_lock.lock().await;
        let loaded = self.deps.store.load(ctx).await?;
        self.info(
            "index.load.completed",
            "Loaded persisted index",
            log_fields! {
                "chunks" => loaded.len(),
                "files" => loaded.file_count(),
                "store" => self.deps.store.describe().to_string(),
            },
        );
        self.handle.publish(Arc::new(loaded));

        let started = Instant::now();
        let mut working = (*self.handle.snapshot()).clone();
        let mut summary = IndexSummary::default();
        let outcome = self.prune_into(ctx, &mut working, &mut summary).await;
        self.finish(ctx, "index.prune", working, summary, outcome, started)
            .await
    }

    /// Drop chunks of files that no longer exist and persist the result.
    pub async fn prune(&self, ctx: &RequestContext) -> Result<IndexSummary> {
        let _guard = self.write_lock.lock().await;
        let started = Instant::now();
        let mut working = (*self.handle.snapshot()).clone();
        let mut summary = IndexSummary::default();
        let outcome = self.prune_into(ctx, &mut working, &mut summary).await;
        self.finish(ctx, "index.prune", working, summary, outcome, started)
            .await
    }

    /// Prune, then scan the whole workspace.
    ///
    /// With `force`, watermarks are ignored and every file is re-embedded.
    #[tracing::instrument(
        name = "index.run",
        skip_all,
        fields(correlation_id = ctx.correlation_id().as_str(), force = force)
    )]
    pub async fn run_full(&self, ctx: &RequestContext, force: bool) -> Result<IndexSummary> {
        let _guard = self.write_lock.lock().await;
        let started = Instant::now();
        self.info(
            "index.run.start",
            "Workspace indexing started",
            log_fields! { "force" => force },
        );
        let mut working = (*self.handle.snapshot()).clone();
        let mut summary = IndexSummary::default();
        let outcome = self
            .run_full_locked(ctx, &mut working, &mut summary, force)
            .await;
        self.finish(ctx, "index.run", working, summary, outcome, started)
            .await
    }

    /// Re-index one file, or drop it when it no longer exists or the globs
    /// reject it.
    #[tracing::instrument(
        name = "index.file",
        skip_all,
        fields(correlation_id = ctx.correlation_id().as_str(), path = path)
    )]
    pub async fn run_file(&self, ctx: &RequestContext, path: &str) -> Result<IndexSummary> {
        let _guard = self.write_lock.lock().await;
        let started = Instant::now();
        let mut working = (*self.handle.snapshot()).clone();
        let mut summary = IndexSummary::default();
        let outcome = if self.filter.accepts(path) {
            summary.files_scanned = 1;
            self.index_file(ctx, &mut working, &mut summary, path, false)
                .await
        } else {
            tracing::debug!(path, "path rejected by index globs");
            summary.record_removal(&mut working, path);
            Ok(())
        };
        self.finish(ctx, "index.file", working, summary, outcome, started)
            .await
    }

    /// Drop every chunk of `paths`, without probing the filesystem.
    pub async fn remove_paths(
        &self,
        ctx: &RequestContext,
        paths: &[Box<str>],
    ) -> Result<IndexSummary> {
        let _guard = self.write_lock.lock().await;
        let started = Instant::now();
        let mut working = (*self.handle.snapshot()).clone();
        let mut summary = IndexSummary::default();
        for path in paths {
            summary.record_removal(&mut working, path);
        }
        self.finish(ctx, "index.remove", working, summary, Ok(()), started)
            .await
    }

    async fn run_full_locked(
        &self,
        ctx: &RequestContext,
        working: &mut IndexSnapshot,
        summary: &mut IndexSummary,
        force: bool,
    ) -> Result<()> {
        self.prune_into(ctx, working, summary).await?;
        ctx.ensure_not_cancelled("index.enumerate")?;
        let paths = self
            .deps
            .files
            .enumerate(ctx, self.settings.query.clone())
            .await?;
        summary.files_scanned = paths.len();

        for path in &paths {
            self.index_file(ctx, working, summary, path, force).await?;
        }
        Ok(())
    }

    /// Drop files that are gone or no longer accepted by the globs.
    async fn prune_into(
        &self,
        ctx: &RequestContext,
        working: &mut IndexSnapshot,
        summary: &mut IndexSummary,
    ) -> Result<()> {
        let indexed: Vec<Box<str>> = working.files().into_iter().map(Box::from).collect();
        for path in indexed {
            ctx.ensure_not_cancelled("index.prune")?;
            if !self.filter.accepts(&path) {
                summary.record_removal(working, &path);
                continue;
            }
            match self.deps.files.exists(ctx, path.clone()).await {
                Ok(true) => {},
                Ok(false) => summary.record_removal(working, &path),
                Err(error) if error.is_cancelled() => return Err(error),
                Err(error) => {
                    self.warn(
                        "index.prune.probe_failed",
                        "Liveness probe failed; keeping file",
                        log_fields! {
                            "path" => &*path,
                            "code" => error.code.to_string(),
                        },
                    );
                },
            }
        }
        Ok(())
    }

    async fn index_file(
        &self,
        ctx: &RequestContext,
        working: &mut IndexSnapshot,
        summary: &mut IndexSummary,
        path: &str,
        force: bool,
    ) -> Result<()> {
        ctx.ensure_not_cancelled("index.file")?;

        let mtime = match self.deps.files.stat(ctx, path.into()).await {
            Ok(Some(mtime)) => mtime,
            Ok(None) => {
                summary.record_removal(working, path);
                return Ok(());
            },
            Err(error) => return self.contain(summary, path, error),
        };

        if !force && working.watermark(path) == Some(mtime) {
            summary.files_skipped += 1;
            return Ok(());
        }

        let content = match self.deps.files.read(ctx, path.into()).await {
            Ok(content) => content,
            Err(error) => return self.contain(summary, path, error),
        };

        let mut chunks = Vec::new();
        for text in self.settings.chunker.chunk(&content.text) {
            ctx.ensure_not_cancelled("index.embed")?;
            let embedding = match self
                .deps
                .embedding
                .embed(ctx, text.as_str().into())
                .await
            {
                Ok(vector) => vector,
                Err(error) if aborts_run(&error) => return Err(error),
                Err(error) => {
                    summary.embedding_failures += 1;
                    self.warn(
                        "index.embed.failed",
                        "Embedding failed; chunk stored without a vector",
                        log_fields! {
                            "path" => path,
                            "code" => error.code.to_string(),
                            "message" => error.message.clone(),
                        },
                    );
                    Vec::new()
                },
            };
            chunks.push(Chunk::new(path, text, embedding, content.mtime));
        }

        let previous = working.chunks_for(path).count();
        // Nothing chunkable before or after: no watermark to record.
        if chunks.is_empty() && previous == 0 {
            summary.files_skipped += 1;
            return Ok(());
        }
        summary.chunks_removed += previous;
        summary.chunks_written += chunks.len();
        summary.files_indexed += 1;
        working.replace_file(path, content.mtime, chunks);
        Ok(())
    }

    fn contain(&self, summary: &mut IndexSummary, path: &str, error: ErrorEnvelope) -> Result<()> {
        if aborts_run(&error) {
            return Err(error);
        }
        self.warn(
            "index.file.failed",
            "Skipping file",
            log_fields! {
                "path" => path,
                "code" => error.code.to_string(),
                "message" => error.message.clone(),
            },
        );
        summary.record_failure(path, &error);
        Ok(())
    }

    async fn finish(
        &self,
        ctx: &RequestContext,
        event: &str,
        working: IndexSnapshot,
        mut summary: IndexSummary,
        outcome: Result<()>,
        started: Instant,
    ) -> Result<IndexSummary> {
        summary.total_chunks = working.len();
        summary.total_files = working.file_count();

        if summary.changed() {
            let published = Arc::new(working);
            self.handle.publish(Arc::clone(&published));
            // Persist even when the run itself was cancelled.
            let persist_ctx = RequestContext::new(ctx.correlation_id().clone());
            if let Err(error) = self.deps.store.save(&persist_ctx, published).await {
                self.warn(
                    "index.persist.failed",
                    "Failed to persist index",
                    log_fields! {
                        "code" => error.code.to_string(),
                        "message" => error.message.clone(),
                    },
                );
                summary.persist_error = Some(error.message);
            }
        }

        let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        match outcome {
            Ok(()) => {
                self.info(
                    &format!("{event}.completed"),
                    "Index updated",
                    log_fields! {
                        "filesIndexed" => summary.files_indexed,
                        "filesSkipped" => summary.files_skipped,
                        "filesRemoved" => summary.files_removed,
                        "chunks" => summary.total_chunks,
                        "failures" => summary.failures.len(),
                        "durationMs" => duration_ms,
                    },
                );
                Ok(summary)
            },
            Err(error) if error.is_cancelled() => {
                self.info(
                    &format!("{event}.cancelled"),
                    "Indexing cancelled",
                    log_fields! { "filesIndexed" => summary.files_indexed, "durationMs" => duration_ms },
                );
                Err(error)
            },
            Err(error) => {
                self.error(
                    &format!("{event}.failed"),
                    "Indexing stopped",
                    log_fields! {
                        "filesIndexed" => summary.files_indexed,
                        "code" => error.code.to_string(),
                        "message" => error.message.clone(),
                    },
                );
                Err(error)
            },
        }
    }

    fn info(&self, event: &str, message: &str, fields: LogFields) {
        if let Some(logger) = self.deps.logger.as_ref() {
            logger.info(event, message, Some(fields));
        }
    }

    fn warn(&self, event: &str, message: &str, fields: LogFields) {
        if let Some(logger) = self.deps.logger.as_ref() {
            logger.warn(event, message, Some(fields));
        }
    }

    fn error(&self, event: &str, message: &str, fields: LogFields) {
        if let Some(logger) = self.deps.logger.as_ref() {
            logger.error(event, message, Some(fields));
        }
    }
}

fn aborts_run(error: &ErrorEnvelope) -> bool {
    error.is_cancelled() || error.code == ErrorCode::dependency_unavailable()
}
