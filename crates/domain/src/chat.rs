//! Chat messages and the windowed transcript.

use serde::{Deserialize, Serialize};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    /// Instructions or injected project context.
    System,
    /// The person typing.
    User,
    /// The model.
    Assistant,
}

/// One chat message, shaped like the model server's wire format.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Author.
    pub role: ChatRole,
    /// Message text.
    pub content: String,
}

impl ChatMessage {
    /// System message.
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    /// User message.
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    /// Assistant message.
    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Conversation history starting with the chat system message.
///
/// With a window set, the oldest stored messages after the initial system
/// message are evicted first; the initial message always stays. The window
/// bounds stored history only, never the turn being sent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatTranscript {
    messages: Vec<ChatMessage>,
    max_messages: Option<usize>,
}

impl ChatTranscript {
    /// Start a transcript. A window below 1 is raised to 1.
    pub fn new(system_message: impl Into<String>, max_messages: Option<usize>) -> Self {
        Self {
            messages: vec![ChatMessage::system(system_message)],
            max_messages: max_messages.map(|max| max.max(1)),
        }
    }

    /// All messages, including system messages.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// Messages shown to the user (system messages hidden).
    pub fn visible_messages(&self) -> impl Iterator<Item = &ChatMessage> {
        self.messages
            .iter()
            .filter(|message| message.role != ChatRole::System)
    }

    /// Stored history plus all of `pending`, as sent to the model for the
    /// next turn.
    #[must_use]
    pub fn with_pending(&self, pending: &[ChatMessage]) -> Vec<ChatMessage> {
        self.messages.iter().chain(pending).cloned().collect()
    }

    /// Append messages, then evict down to the window.
    pub fn extend(&mut self, messages: impl IntoIterator<Item = ChatMessage>) {
        self.messages.extend(messages);
        if let Some(max) = self.max_messages {
            let excess = self.messages.len().saturating_sub(max);
            if excess > 0 {
                self.messages.drain(1..=excess);
            }
        }
    }

    /// Number of messages, including system messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Always false: the initial system message is never evicted.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}
