//! In-memory index snapshot: chunks grouped by file under one mtime watermark.

use crate::chunk::{Chunk, Mtime};
use std::collections::{BTreeSet, HashMap};

/// Ordered set of chunks forming the current index.
///
/// Invariant: every chunk of a given file carries the same `mtime`, which is
/// that file's watermark. Within a file, chunks keep source line order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct IndexSnapshot {
    chunks: Vec<Chunk>,
}

impl IndexSnapshot {
    /// Empty snapshot.
    #[must_use]
    pub const fn empty() -> Self {
        Self { chunks: Vec::new() }
    }

    /// Build from loaded chunks, keeping each file's first-seen watermark.
    ///
    /// Chunks whose mtime disagrees with the first chunk of the same file are
    /// dropped, which only happens with hand-edited index files.
    #[must_use]
    pub fn from_chunks(chunks: Vec<Chunk>) -> Self {
        let mut watermarks: HashMap<Box<str>, Mtime> = HashMap::new();
        let chunks = chunks
            .into_iter()
            .filter(|chunk| {
                *watermarks
                    .entry(chunk.file_path.clone())
                    .or_insert(chunk.mtime)
                    == chunk.mtime
            })
            .collect();
        Self { chunks }
    }

    /// All chunks in insertion order.
    #[must_use]
    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    /// Consume into the chunk list.
    #[must_use]
    pub fn into_chunks(self) -> Vec<Chunk> {
        self.chunks
    }

    /// Number of chunks.
    #[must_use]
    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    /// Returns true when no chunks are stored.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Number of distinct files with at least one chunk.
    #[must_use]
    pub fn file_count(&self) -> usize {
        self.files().len()
    }

    /// Distinct file paths, sorted.
    #[must_use]
    pub fn files(&self) -> BTreeSet<&str> {
        self.chunks
            .iter()
            .map(|chunk| chunk.file_path.as_ref())
            .collect()
    }

    /// Path to last-indexed mtime.
    #[must_use]
    pub fn watermarks(&self) -> HashMap<&str, Mtime> {
        self.chunks
            .iter()
            .map(|chunk| (chunk.file_path.as_ref(), chunk.mtime))
            .collect()
    }

    /// Watermark of one file.
    #[must_use]
    pub fn watermark(&self, path: &str) -> Option<Mtime> {
        self.chunks
            .iter()
            .find(|chunk| chunk.file_path.as_ref() == path)
            .map(|chunk| chunk.mtime)
    }

    /// Chunks belonging to one file, in line order.
    pub fn chunks_for<'a>(&'a self, path: &'a str) -> impl Iterator<Item = &'a Chunk> + 'a {
        self.chunks
            .iter()
            .filter(move |chunk| chunk.file_path.as_ref() == path)
    }

    /// Replace every chunk of `path` with `chunks`, all stamped with `mtime`.
    pub fn replace_file(&mut self, path: &str, mtime: Mtime, chunks: Vec<Chunk>) {
        self.remove_file(path);
        self.chunks.extend(chunks.into_iter().map(|mut chunk| {
            chunk.file_path = path.into();
            chunk.mtime = mtime;
            chunk
        }));
    }

    /// Drop every chunk of `path`; returns the number removed.
    pub fn remove_file(&mut self, path: &str) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|chunk| chunk.file_path.as_ref() != path);
        before - self.chunks.len()
    }

    /// Keep only chunks whose file satisfies `keep`; returns the number removed.
    pub fn retain_files(&mut self, mut keep: impl FnMut(&str) -> bool) -> usize {
        let before = self.chunks.len();
        self.chunks.retain(|chunk| keep(&chunk.file_path));
        before - self.chunks.len()
    }

    /// Dimension shared by most embedded chunks, if any are embedded.
    #[must_use]
    pub fn dominant_dimension(&self) -> Option<usize> {
        let mut counts: HashMap<usize, usize> = HashMap::new();
        for chunk in self.chunks.iter().filter(|chunk| chunk.is_embedded()) {
            *counts.entry(chunk.embedding.len()).or_default() += 1;
        }
        counts
            .into_iter()
            .max_by(|left, right| left.1.cmp(&right.1).then(right.0.cmp(&left.0)))
            .map(|(dimension, _)| dimension)
    }
}
