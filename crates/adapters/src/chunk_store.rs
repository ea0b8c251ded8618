//! JSON file chunk store with an embedding-model sidecar.

use pilot_config::IndexStorageMode;
use pilot_ports::{
    BoxFuture, Chunk, ChunkStorePort, IndexSnapshot, LogFields, LoggerPort, ModelName, NoopLogger,
    log_fields,
};
use pilot_shared::{ErrorClass, ErrorCode, ErrorEnvelope, RequestContext, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

const INDEX_META_VERSION: u32 = 1;

/// Sidecar describing how the chunk list was embedded.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct IndexMeta {
    version: u32,
    embedding_model: Box<str>,
    dimension: Option<usize>,
}

/// Persists the chunk list as a JSON array of `{filePath, text, embedding, mtime}`.
///
/// `index.meta.json` next to the index records the embedding model; an index
/// written under another model, or with mixed dimensions, loads as empty so
/// the next run rebuilds it.
pub struct JsonChunkStore {
    index_path: Option<PathBuf>,
    embedding_model: ModelName,
    logger: Arc<dyn LoggerPort>,
}

impl JsonChunkStore {
    /// Store for `workspace_root`, keyed by `embedding_model`.
    pub fn new(workspace_root: &Path, mode: &IndexStorageMode, embedding_model: ModelName) -> Self {
        Self {
            index_path: mode.resolve_index_path(workspace_root),
            embedding_model,
            logger: Arc::new(NoopLogger),
        }
    }

    /// Report corruption and save failures through `logger`.
    #[must_use]
    pub fn with_logger(mut self, logger: Arc<dyn LoggerPort>) -> Self {
        self.logger = logger;
        self
    }

    /// Resolved index file, `None` when persistence is disabled.
    #[must_use]
    pub fn index_path(&self) -> Option<&Path> {
        self.index_path.as_deref()
    }

    fn discard(&self, reason: &str, path: &Path, detail: impl Into<String>) -> IndexSnapshot {
        let detail: String = detail.into();
        self.logger.warn(
            "store.load.discarded",
            "persisted index ignored; a full reindex will rebuild it",
            Some(log_fields! {
                "code" => "store:corrupt_index",
                "reason" => reason,
                "path" => path.display().to_string(),
                "detail" => detail,
            }),
        );
        IndexSnapshot::empty()
    }

    async fn read_snapshot(&self, index_path: &Path) -> IndexSnapshot {
        let payload = match tokio::fs::read(index_path).await {
            Ok(payload) => payload,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => {
                self.logger.debug(
                    "store.load.missing",
                    "no persisted index",
                    Some(path_fields(index_path)),
                );
                return IndexSnapshot::empty();
            },
            Err(error) => return self.discard("unreadable", index_path, error.to_string()),
        };
        let chunks: Vec<Chunk> = match serde_json::from_slice(&payload) {
            Ok(chunks) => chunks,
            Err(error) => return self.discard("corrupt", index_path, error.to_string()),
        };

        let meta_path = meta_path_for(index_path);
        let meta = match tokio::fs::read(&meta_path).await {
            Ok(raw) => serde_json::from_slice::<IndexMeta>(&raw).ok(),
            Err(_) => None,
        };
        let Some(meta) = meta else {
            return self.discard("missing_meta", &meta_path, "index metadata missing or unreadable");
        };
        if meta.version != INDEX_META_VERSION
            || meta.embedding_model.as_ref() != self.embedding_model.as_str()
        {
            return self.discard(
                "model_mismatch",
                index_path,
                format!(
                    "index built with {} (v{}), current model is {}",
                    meta.embedding_model, meta.version, self.embedding_model
                ),
            );
        }

        let snapshot = IndexSnapshot::from_chunks(chunks);
        let dimension = snapshot.dominant_dimension();
        let mixed = snapshot
            .chunks()
            .iter()
            .any(|chunk| chunk.is_embedded() && Some(chunk.embedding.len()) != dimension);
        if mixed || (dimension.is_some() && meta.dimension != dimension) {
            return self.discard(
                "dimension_mismatch",
                index_path,
                format!("expected dimension {:?}, found {dimension:?}", meta.dimension),
            );
        }
        snapshot
    }

    async fn write_snapshot(&self, index_path: &Path, snapshot: &IndexSnapshot) -> Result<()> {
        if let Some(parent) = index_path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(ErrorEnvelope::from)?;
        }
        let payload = serde_json::to_vec(snapshot.chunks())
            .map_err(|error| store_error("serialize_failed", "failed to serialize index", &error))?;
        let meta = IndexMeta {
            version: INDEX_META_VERSION,
            embedding_model: self.embedding_model.as_str().into(),
            dimension: snapshot.dominant_dimension(),
        };
        let meta_payload = serde_json::to_vec_pretty(&meta).map_err(|error| {
            store_error("serialize_failed", "failed to serialize index metadata", &error)
        })?;

        write_atomic(index_path, &payload).await?;
        write_atomic(&meta_path_for(index_path), &meta_payload).await
    }
}

impl ChunkStorePort for JsonChunkStore {
    fn load(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<IndexSnapshot>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("chunk_store.load")?;
            let Some(index_path) = self.index_path.as_deref() else {
                return Ok(IndexSnapshot::empty());
            };
            Ok(self.read_snapshot(index_path).await)
        })
    }

    fn save(
        &self,
        ctx: &RequestContext,
        snapshot: Arc<IndexSnapshot>,
    ) -> BoxFuture<'_, Result<()>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("chunk_store.save")?;
            let Some(index_path) = self.index_path.as_deref() else {
                return Ok(());
            };
            self.write_snapshot(index_path, &snapshot)
                .await
                .map_err(|error| error.with_metadata("path", index_path.display().to_string()))
        })
    }

    fn describe(&self) -> Box<str> {
        self.index_path.as_deref().map_or_else(
            || "in-memory (persistence disabled)".into(),
            |path| path.display().to_string().into_boxed_str(),
        )
    }
}

fn meta_path_for(index_path: &Path) -> PathBuf {
    index_path.with_extension("meta.json")
}

async fn write_atomic(path: &Path, payload: &[u8]) -> Result<()> {
    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);
    tokio::fs::write(&tmp_path, payload)
        .await
        .map_err(ErrorEnvelope::from)?;
    tokio::fs::rename(&tmp_path, path)
        .await
        .map_err(ErrorEnvelope::from)
}

fn path_fields(path: &Path) -> LogFields {
    log_fields! { "path" => path.display().to_string() }
}

fn store_error(code: &'static str, message: &str, error: &serde_json::Error) -> ErrorEnvelope {
    ErrorEnvelope::unexpected(
        ErrorCode::new("store", code),
        format!("{message}: {error}"),
        ErrorClass::NonRetriable,
    )
}
