//! Shared, snapshot-based view of the current index.

use pilot_domain::IndexSnapshot;
use std::sync::{Arc, PoisonError, RwLock};

/// Cheaply cloneable handle to the published index.
///
/// Readers take an `Arc` of the current snapshot and never block the writer
/// for longer than a pointer swap; a reader holding an old snapshot keeps
/// seeing it unchanged.
#[derive(Debug, Clone, Default)]
pub struct IndexHandle {
    current: Arc<RwLock<Arc<IndexSnapshot>>>,
}

impl IndexHandle {
    /// Handle publishing `snapshot`.
    #[must_use]
    pub fn new(snapshot: IndexSnapshot) -> Self {
        Self {
            current: Arc::new(RwLock::new(Arc::new(snapshot))),
        }
    }

    /// Current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> Arc<IndexSnapshot> {
        Arc::clone(&self.current.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Replace the published snapshot.
    pub fn publish(&self, snapshot: Arc<IndexSnapshot>) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = snapshot;
    }
}
