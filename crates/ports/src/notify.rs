//! Outbound notifications to the host.

use serde::Serialize;

/// Something the host may surface to the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Notification {
    /// The index was rebuilt or updated and persisted.
    IndexUpdated {
        /// Total chunks in the index.
        chunks: usize,
        /// Distinct files in the index.
        files: usize,
    },
    /// Non-fatal per-file or persistence failure.
    IndexingError {
        /// Affected file, when the failure is file-specific.
        path: Option<Box<str>>,
        /// Human-readable cause.
        message: String,
    },
    /// A completion is ready to insert.
    CompletionAvailable {
        /// Insertion text.
        text: String,
    },
    /// The completion produced nothing to insert.
    CompletionEmpty,
}

/// Sink for [`Notification`] values.
pub trait NotificationPort: Send + Sync {
    /// Deliver a notification; delivery failures are the sink's concern.
    fn notify(&self, notification: Notification);
}
