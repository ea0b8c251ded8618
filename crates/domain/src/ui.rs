//! Messages posted by the chat view.

use serde::{Deserialize, Serialize};

/// Inbound chat-view message, tagged by `command`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "camelCase")]
pub enum UiMessage {
    /// Open the extension settings.
    OpenSettings,
    /// Send a chat prompt.
    SendMessage {
        /// Prompt text.
        text: String,
    },
}

impl UiMessage {
    /// Commands understood at the boundary.
    pub const COMMANDS: [&'static str; 2] = ["openSettings", "sendMessage"];
}
