//! # pilot-domain
//!
//! Domain model with no infrastructure dependencies:
//!
//! - **Chunks** - `Chunk`, `ChunkText`, `ChunkBounds`
//! - **Index** - `IndexSnapshot` with per-file mtime watermarks
//! - **Retrieval** - `ScoredChunk`, `RetrievalResult`
//! - **Completion** - `CompletionRequest`, `CompletionState`
//! - **Chat** - `ChatMessage`, `ChatTranscript`
//! - **UI** - `UiMessage`
//!
//! ## Dependency Rules
//!
//! - Depends only on `shared` crate
//! - Pure domain logic with no I/O

#![deny(clippy::unwrap_used)]
#![deny(clippy::expect_used)]

pub use pilot_shared::shared_crate_version;

pub mod chat;
pub mod chunk;
pub mod completion;
pub mod index;
pub mod model;
pub mod retrieval;
pub mod ui;

pub use chat::{ChatMessage, ChatRole, ChatTranscript};
pub use chunk::{
    Chunk, ChunkBounds, ChunkError, ChunkText, DEFAULT_MAX_CHUNK_CHARS, DEFAULT_MIN_CHUNK_CHARS,
    Mtime,
};
pub use completion::{CompletionEvent, CompletionRequest, CompletionState, InvalidTransition};
pub use index::IndexSnapshot;
pub use model::ModelName;
pub use retrieval::{RetrievalResult, ScoredChunk};
pub use ui::UiMessage;

/// Returns the domain crate version.
#[must_use]
pub const fn domain_crate_version() -> &'static str {
    env!("CARGO_PKG_VERSION")
}
