//! Chunk records and the length band candidate texts must satisfy.

use pilot_shared::{ErrorCode, ErrorEnvelope};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Default exclusive lower bound on trimmed chunk length, in characters.
pub const DEFAULT_MIN_CHUNK_CHARS: usize = 10;
/// Default exclusive upper bound on trimmed chunk length, in characters.
pub const DEFAULT_MAX_CHUNK_CHARS: usize = 4000;

/// Exclusive `(min, max)` band on the trimmed character length of a chunk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkBounds {
    min_chars: usize,
    max_chars: usize,
}

impl ChunkBounds {
    /// Build a band; `min_chars + 1 < max_chars` must hold so the band is non-empty.
    pub fn new(min_chars: usize, max_chars: usize) -> Result<Self, ChunkError> {
        if min_chars.saturating_add(1) >= max_chars {
            return Err(ChunkError::EmptyBand {
                min_chars,
                max_chars,
            });
        }
        Ok(Self {
            min_chars,
            max_chars,
        })
    }

    /// Exclusive lower bound.
    #[must_use]
    pub const fn min_chars(self) -> usize {
        self.min_chars
    }

    /// Exclusive upper bound.
    #[must_use]
    pub const fn max_chars(self) -> usize {
        self.max_chars
    }

    /// Check a candidate against the band.
    pub fn check(self, candidate: &str) -> Result<(), ChunkError> {
        let trimmed = candidate.trim();
        if trimmed.is_empty() {
            return Err(ChunkError::Blank);
        }
        let length = trimmed.chars().count();
        if length <= self.min_chars {
            return Err(ChunkError::TooShort {
                length,
                min: self.min_chars,
            });
        }
        if length >= self.max_chars {
            return Err(ChunkError::TooLong {
                length,
                max: self.max_chars,
            });
        }
        Ok(())
    }
}

impl Default for ChunkBounds {
    fn default() -> Self {
        Self {
            min_chars: DEFAULT_MIN_CHUNK_CHARS,
            max_chars: DEFAULT_MAX_CHUNK_CHARS,
        }
    }
}

/// Reasons a candidate is rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkError {
    /// Whitespace only.
    Blank,
    /// Trimmed length at or below the lower bound.
    TooShort {
        /// Observed trimmed length.
        length: usize,
        /// Exclusive lower bound.
        min: usize,
    },
    /// Trimmed length at or above the upper bound.
    TooLong {
        /// Observed trimmed length.
        length: usize,
        /// Exclusive upper bound.
        max: usize,
    },
    /// Bounds leave no admissible length.
    EmptyBand {
        /// Requested lower bound.
        min_chars: usize,
        /// Requested upper bound.
        max_chars: usize,
    },
}

impl fmt::Display for ChunkError {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Blank => formatter.write_str("chunk is blank"),
            Self::TooShort { length, min } => {
                write!(formatter, "chunk length {length} must exceed {min}")
            },
            Self::TooLong { length, max } => {
                write!(formatter, "chunk length {length} must be below {max}")
            },
            Self::EmptyBand {
                min_chars,
                max_chars,
            } => write!(
                formatter,
                "chunk bounds ({min_chars}, {max_chars}) admit no length"
            ),
        }
    }
}

impl std::error::Error for ChunkError {}

impl From<ChunkError> for ErrorEnvelope {
    fn from(error: ChunkError) -> Self {
        let code = match error {
            ChunkError::EmptyBand { .. } => "invalid_chunk_bounds",
            _ => "chunk_out_of_bounds",
        };
        Self::expected(ErrorCode::new("domain", code), error.to_string())
    }
}

/// Candidate text that passed a [`ChunkBounds`] check.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChunkText(Box<str>);

impl ChunkText {
    /// Validate `text` against `bounds`. The original text (with indentation) is kept.
    pub fn new(text: impl Into<Box<str>>, bounds: ChunkBounds) -> Result<Self, ChunkError> {
        let text = text.into();
        bounds.check(&text)?;
        Ok(Self(text))
    }

    /// Borrow the chunk text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume into the owned text.
    #[must_use]
    pub fn into_inner(self) -> Box<str> {
        self.0
    }
}

impl AsRef<str> for ChunkText {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

/// File modification time in milliseconds since the Unix epoch.
pub type Mtime = u64;

/// One indexed slice of a file.
///
/// Serialized as `{filePath, text, embedding, mtime}`. An empty `embedding`
/// marks a chunk whose embedding call failed; it never scores above zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chunk {
    /// Path of the source file, as reported by the file enumerator.
    pub file_path: Box<str>,
    /// Chunk text.
    pub text: Box<str>,
    /// Embedding vector; empty when embedding failed.
    #[serde(default)]
    pub embedding: Vec<f32>,
    /// Modification time of the file when this chunk was produced.
    #[serde(default)]
    pub mtime: Mtime,
}

impl Chunk {
    /// Build a chunk from validated text.
    pub fn new(
        file_path: impl Into<Box<str>>,
        text: ChunkText,
        embedding: Vec<f32>,
        mtime: Mtime,
    ) -> Self {
        Self {
            file_path: file_path.into(),
            text: text.into_inner(),
            embedding,
            mtime,
        }
    }

    /// Returns true when the chunk carries an embedding.
    #[must_use]
    pub fn is_embedded(&self) -> bool {
        !self.embedding.is_empty()
    }
}
