//! Notification sinks.

use pilot_ports::{LoggerPort, Notification, NotificationPort, log_fields};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

/// Forwards notifications to a channel; a closed receiver drops them.
#[derive(Debug, Clone)]
pub struct ChannelNotifier {
    sender: UnboundedSender<Notification>,
}

impl ChannelNotifier {
    /// Notifier feeding `sender`.
    pub const fn new(sender: UnboundedSender<Notification>) -> Self {
        Self { sender }
    }
}

impl NotificationPort for ChannelNotifier {
    fn notify(&self, notification: Notification) {
        let _ = self.sender.send(notification);
    }
}

/// Writes notifications as structured log events.
pub struct LoggingNotifier {
    logger: Arc<dyn LoggerPort>,
}

impl LoggingNotifier {
    /// Notifier logging through `logger`.
    pub fn new(logger: Arc<dyn LoggerPort>) -> Self {
        Self { logger }
    }
}

impl NotificationPort for LoggingNotifier {
    fn notify(&self, notification: Notification) {
        let fields = serde_json::to_value(&notification)
            .ok()
            .map(|value| log_fields! { "notification" => value });
        match notification {
            Notification::IndexingError { .. } => {
                self.logger
                    .warn("notify.indexing_error", "indexing error", fields);
            },
            Notification::IndexUpdated { .. } => {
                self.logger.info("notify.index_updated", "index updated", fields);
            },
            Notification::CompletionAvailable { .. } | Notification::CompletionEmpty => {
                self.logger
                    .debug("notify.completion", "completion finished", fields);
            },
        }
    }
}
