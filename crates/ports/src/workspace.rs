//! Workspace file access boundary contract.

use crate::BoxFuture;
use globset::{GlobBuilder, GlobSet, GlobSetBuilder};
use pilot_domain::Mtime;
use pilot_shared::{ErrorCode, ErrorEnvelope, RequestContext, Result};

/// Glob rules and cap for a workspace scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileQuery {
    /// Files must match at least one of these.
    pub include: Vec<Box<str>>,
    /// Files matching any of these are skipped.
    pub exclude: Vec<Box<str>>,
    /// Maximum number of paths returned.
    pub max_results: usize,
}

/// Compiled include/exclude rules of a [`FileQuery`].
///
/// `*` does not cross `/`; use `**` for any depth.
#[derive(Debug, Clone)]
pub struct PathFilter {
    include: GlobSet,
    exclude: GlobSet,
}

impl PathFilter {
    /// Compile the globs of `query`.
    ///
    /// # Errors
    ///
    /// `workspace:invalid_glob` when a pattern does not parse.
    pub fn new(query: &FileQuery) -> Result<Self> {
        Ok(Self {
            include: build_glob_set(&query.include)?,
            exclude: build_glob_set(&query.exclude)?,
        })
    }

    /// Whether `path` matches an include glob and no exclude glob.
    #[must_use]
    pub fn accepts(&self, path: &str) -> bool {
        self.include.is_match(path) && !self.exclude.is_match(path)
    }
}

fn build_glob_set(patterns: &[Box<str>]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        let glob = GlobBuilder::new(pattern)
            .literal_separator(true)
            .build()
            .map_err(|error| {
                ErrorEnvelope::expected(
                    ErrorCode::new("workspace", "invalid_glob"),
                    format!("invalid glob pattern: {error}"),
                )
                .with_metadata("pattern", pattern.to_string())
            })?;
        builder.add(glob);
    }
    builder.build().map_err(|error| {
        ErrorEnvelope::expected(
            ErrorCode::new("workspace", "invalid_glob"),
            format!("invalid glob set: {error}"),
        )
    })
}

/// Text content of a file with its modification time.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileContent {
    /// UTF-8 content.
    pub text: String,
    /// Modification time in milliseconds.
    pub mtime: Mtime,
}

/// Host-provided file enumeration and reads.
///
/// Paths are opaque strings; whatever `enumerate` returns is accepted by the
/// other methods.
pub trait WorkspaceFilesPort: Send + Sync {
    /// Candidate files under the include/exclude rules, at most `max_results`.
    fn enumerate(&self, ctx: &RequestContext, query: FileQuery)
    -> BoxFuture<'_, Result<Vec<Box<str>>>>;

    /// Modification time, or `None` when the file does not exist.
    fn stat(&self, ctx: &RequestContext, path: Box<str>) -> BoxFuture<'_, Result<Option<Mtime>>>;

    /// Read content and modification time.
    fn read(&self, ctx: &RequestContext, path: Box<str>) -> BoxFuture<'_, Result<FileContent>>;

    /// Liveness probe used for pruning.
    fn exists(&self, ctx: &RequestContext, path: Box<str>) -> BoxFuture<'_, Result<bool>> {
        let stat = self.stat(ctx, path);
        Box::pin(async move { Ok(stat.await?.is_some()) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(include: &[&str], exclude: &[&str]) -> FileQuery {
        FileQuery {
            include: include.iter().map(|glob| Box::from(*glob)).collect(),
            exclude: exclude.iter().map(|glob| Box::from(*glob)).collect(),
            max_results: 10,
        }
    }

    #[test]
    fn exclude_wins_over_include() -> Result<()> {
        let filter = PathFilter::new(&query(&["**/*.{rs,js}"], &["**/node_modules/**"]))?;
        assert!(filter.accepts("src/main.rs"));
        assert!(filter.accepts("main.rs"));
        assert!(!filter.accepts("node_modules/dep/index.js"));
        assert!(!filter.accepts("web/node_modules/dep/index.js"));
        assert!(!filter.accepts("notes.txt"));
        Ok(())
    }

    #[test]
    fn single_star_stays_in_one_directory() -> Result<()> {
        let filter = PathFilter::new(&query(&["src/*.rs"], &[]))?;
        assert!(filter.accepts("src/lib.rs"));
        assert!(!filter.accepts("src/nested/lib.rs"));
        Ok(())
    }

    #[test]
    fn malformed_glob_is_rejected() {
        let error = PathFilter::new(&query(&["**/*.{rs"], &[])).err();
        assert_eq!(
            error.map(|error| error.code),
            Some(ErrorCode::new("workspace", "invalid_glob"))
        );
    }
}
