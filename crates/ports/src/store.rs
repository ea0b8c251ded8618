//! Chunk persistence boundary contract.

use crate::BoxFuture;
use pilot_domain::IndexSnapshot;
use pilot_shared::{RequestContext, Result};
use std::sync::Arc;

/// Persists the chunk list.
pub trait ChunkStorePort: Send + Sync {
    /// Load persisted chunks.
    ///
    /// A missing, unreadable, or corrupt document yields an empty snapshot,
    /// never an error.
    fn load(&self, ctx: &RequestContext) -> BoxFuture<'_, Result<IndexSnapshot>>;

    /// Replace persisted state; readers never observe a partial write.
    fn save(&self, ctx: &RequestContext, snapshot: Arc<IndexSnapshot>)
    -> BoxFuture<'_, Result<()>>;

    /// Human-readable location, for reports.
    fn describe(&self) -> Box<str>;
}
