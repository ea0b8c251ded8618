//! Line-window chunker.

use pilot_domain::{ChunkBounds, ChunkText};
use pilot_shared::{ErrorCode, ErrorEnvelope, Result};
use std::num::NonZeroUsize;

/// Default number of lines per chunk window.
pub const DEFAULT_CHUNK_LINES: usize = 50;

/// Splits file content into non-overlapping windows of whole lines.
///
/// Windows that are blank or fall outside the [`ChunkBounds`] band are
/// dropped; the rest keep source order and original indentation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Chunker {
    lines_per_chunk: NonZeroUsize,
    bounds: ChunkBounds,
}

impl Chunker {
    /// Build a chunker; `lines_per_chunk` must be positive.
    pub fn new(lines_per_chunk: usize, bounds: ChunkBounds) -> Result<Self> {
        let lines_per_chunk = NonZeroUsize::new(lines_per_chunk).ok_or_else(|| {
            ErrorEnvelope::expected(
                ErrorCode::invalid_input(),
                "chunk window must contain at least one line",
            )
        })?;
        Ok(Self {
            lines_per_chunk,
            bounds,
        })
    }

    /// Lines per window.
    #[must_use]
    pub const fn lines_per_chunk(&self) -> usize {
        self.lines_per_chunk.get()
    }

    /// Length band applied to each window.
    #[must_use]
    pub const fn bounds(&self) -> ChunkBounds {
        self.bounds
    }

    /// Lazily yield the windows of `content` that pass the length band.
    pub fn chunk<'a>(&self, content: &'a str) -> impl Iterator<Item = ChunkText> + 'a {
        let window = self.lines_per_chunk.get();
        let bounds = self.bounds;
        let mut lines = content.lines().peekable();
        std::iter::from_fn(move || {
            lines.peek()?;
            Some(lines.by_ref().take(window).collect::<Vec<_>>().join("\n"))
        })
        .filter_map(move |candidate| ChunkText::new(candidate, bounds).ok())
    }
}

impl Default for Chunker {
    fn default() -> Self {
        Self {
            lines_per_chunk: NonZeroUsize::MIN.saturating_add(DEFAULT_CHUNK_LINES - 1),
            bounds: ChunkBounds::default(),
        }
    }
}
