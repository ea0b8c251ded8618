//! Local workspace file adapter.

use pilot_ports::{BoxFuture, FileContent, FileQuery, Mtime, PathFilter, WorkspaceFilesPort};
use pilot_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};
use std::collections::VecDeque;
use std::fs::Metadata;
use std::path::{Path, PathBuf};
use std::time::UNIX_EPOCH;

/// Workspace files rooted at a local directory.
///
/// Paths exchanged with callers are relative to the root and use `/`
/// separators, so a persisted index stays valid if the workspace moves.
#[derive(Debug, Clone)]
pub struct LocalWorkspaceFiles {
    root: PathBuf,
}

impl LocalWorkspaceFiles {
    /// Adapter for the workspace at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Workspace root.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }

    async fn walk(&self, ctx: &RequestContext, query: FileQuery) -> Result<Vec<Box<str>>> {
        let filter = PathFilter::new(&query)?;
        let mut found = Vec::new();
        let mut pending = VecDeque::from([String::new()]);

        while let Some(relative_dir) = pending.pop_front() {
            ctx.ensure_not_cancelled("workspace_files.enumerate")?;
            for (name, is_dir) in read_dir_sorted(&self.resolve(&relative_dir)).await? {
                let relative = if relative_dir.is_empty() {
                    name
                } else {
                    format!("{relative_dir}/{name}")
                };
                if is_dir {
                    pending.push_back(relative);
                    continue;
                }
                if filter.accepts(&relative) {
                    found.push(relative.into_boxed_str());
                    if found.len() >= query.max_results {
                        return Ok(found);
                    }
                }
            }
        }
        Ok(found)
    }
}

impl WorkspaceFilesPort for LocalWorkspaceFiles {
    fn enumerate(
        &self,
        ctx: &RequestContext,
        query: FileQuery,
    ) -> BoxFuture<'_, Result<Vec<Box<str>>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            if query.max_results == 0 {
                return Ok(Vec::new());
            }
            self.walk(&ctx, query).await
        })
    }

    fn stat(&self, ctx: &RequestContext, path: Box<str>) -> BoxFuture<'_, Result<Option<Mtime>>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("workspace_files.stat")?;
            match tokio::fs::metadata(self.resolve(&path)).await {
                Ok(metadata) if metadata.is_file() => Ok(Some(mtime_ms(&metadata))),
                Ok(_) => Ok(None),
                Err(error) if error.kind() == std::io::ErrorKind::NotFound => Ok(None),
                Err(error) => Err(with_path(ErrorEnvelope::from(error), &path)),
            }
        })
    }

    fn read(&self, ctx: &RequestContext, path: Box<str>) -> BoxFuture<'_, Result<FileContent>> {
        let ctx = ctx.clone();
        Box::pin(async move {
            ctx.ensure_not_cancelled("workspace_files.read")?;
            let full_path = self.resolve(&path);
            let metadata = tokio::fs::metadata(&full_path)
                .await
                .map_err(|error| with_path(ErrorEnvelope::from(error), &path))?;
            if !metadata.is_file() {
                return Err(with_path(
                    ErrorEnvelope::expected(ErrorCode::not_found(), "path is not a file"),
                    &path,
                ));
            }
            let bytes = tokio::fs::read(&full_path)
                .await
                .map_err(|error| with_path(ErrorEnvelope::from(error), &path))?;
            let text = String::from_utf8(bytes).map_err(|_| {
                with_path(
                    ErrorEnvelope::expected(
                        ErrorCode::new("workspace", "not_utf8"),
                        "file is not valid UTF-8",
                    ),
                    &path,
                )
            })?;
            Ok(FileContent {
                text,
                mtime: mtime_ms(&metadata),
            })
        })
    }
}

async fn read_dir_sorted(dir: &Path) -> Result<Vec<(String, bool)>> {
    let mut read_dir = tokio::fs::read_dir(dir).await.map_err(ErrorEnvelope::from)?;
    let mut entries = Vec::new();
    while let Some(entry) = read_dir.next_entry().await.map_err(ErrorEnvelope::from)? {
        let file_type = entry.file_type().await.map_err(ErrorEnvelope::from)?;
        if file_type.is_symlink() {
            continue;
        }
        let Ok(name) = entry.file_name().into_string() else {
            continue;
        };
        entries.push((name, file_type.is_dir()));
    }
    entries.sort_unstable();
    Ok(entries)
}

fn mtime_ms(metadata: &Metadata) -> Mtime {
    metadata
        .modified()
        .ok()
        .and_then(|modified| modified.duration_since(UNIX_EPOCH).ok())
        .and_then(|duration| u64::try_from(duration.as_millis()).ok())
        .unwrap_or_default()
}

fn with_path(error: ErrorEnvelope, path: &str) -> ErrorEnvelope {
    error.with_metadata("path", path.to_owned())
}
