//! Completion request lifecycle.

use pilot_shared::{ErrorCode, ErrorEnvelope};
use serde::Serialize;
use std::fmt;

/// Text before the cursor plus the identity of the document being edited.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletionRequest {
    /// Last lines before the cursor, already typed.
    pub context_window: String,
    /// Document name or path, used in the prompt and for logging.
    pub document: Box<str>,
}

impl CompletionRequest {
    /// Build a request.
    pub fn new(context_window: impl Into<String>, document: impl Into<Box<str>>) -> Self {
        Self {
            context_window: context_window.into(),
            document: document.into(),
        }
    }
}

/// States of one completion request.
///
/// `Created -> Issued -> {Completed | Failed}`, with `Cancelled` reachable
/// from both non-terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompletionState {
    /// Waiting out the debounce window.
    Created,
    /// Model call in flight.
    Issued,
    /// Superseded or cancelled by the host.
    Cancelled,
    /// Produced a (possibly empty) completion.
    Completed,
    /// Failed with an error.
    Failed,
}

/// Inputs driving [`CompletionState`] transitions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionEvent {
    /// Debounce window elapsed; the model is being called.
    Issue,
    /// Cancellation observed.
    Cancel,
    /// Result produced.
    Complete,
    /// Error produced.
    Fail,
}

impl CompletionState {
    /// Returns true for `Cancelled`, `Completed`, and `Failed`.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Cancelled | Self::Completed | Self::Failed)
    }

    /// Apply an event, rejecting transitions the lifecycle does not allow.
    pub fn apply(self, event: CompletionEvent) -> Result<Self, InvalidTransition> {
        match (self, event) {
            (Self::Created, CompletionEvent::Issue) => Ok(Self::Issued),
            (Self::Created | Self::Issued, CompletionEvent::Cancel) => Ok(Self::Cancelled),
            (Self::Issued, CompletionEvent::Complete) => Ok(Self::Completed),
            (Self::Issued, CompletionEvent::Fail) => Ok(Self::Failed),
            (from, event) => Err(InvalidTransition { from, event }),
        }
    }
}

impl fmt::Display for CompletionState {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter.write_str(match self {
            Self::Created => "created",
            Self::Issued => "issued",
            Self::Cancelled => "cancelled",
            Self::Completed => "completed",
            Self::Failed => "failed",
        })
    }
}

/// A transition the lifecycle forbids.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InvalidTransition {
    /// State the event was applied to.
    pub from: CompletionState,
    /// Rejected event.
    pub event: CompletionEvent,
}

impl fmt::Display for InvalidTransition {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(formatter, "{:?} not allowed from {}", self.event, self.from)
    }
}

impl std::error::Error for InvalidTransition {}

impl From<InvalidTransition> for ErrorEnvelope {
    fn from(error: InvalidTransition) -> Self {
        Self::invariant(
            ErrorCode::new("completion", "invalid_transition"),
            error.to_string(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_reaches_completed() -> Result<(), InvalidTransition> {
        let state = CompletionState::Created
            .apply(CompletionEvent::Issue)?
            .apply(CompletionEvent::Complete)?;
        assert_eq!(state, CompletionState::Completed);
        assert!(state.is_terminal());
        Ok(())
    }

    #[test]
    fn cancel_is_reachable_from_every_non_terminal_state() {
        for state in [CompletionState::Created, CompletionState::Issued] {
            assert_eq!(
                state.apply(CompletionEvent::Cancel),
                Ok(CompletionState::Cancelled)
            );
        }
    }

    #[test]
    fn terminal_states_reject_further_events() {
        for state in [
            CompletionState::Cancelled,
            CompletionState::Completed,
            CompletionState::Failed,
        ] {
            for event in [
                CompletionEvent::Issue,
                CompletionEvent::Cancel,
                CompletionEvent::Complete,
                CompletionEvent::Fail,
            ] {
                assert!(state.apply(event).is_err());
            }
        }
    }

    #[test]
    fn created_cannot_complete_without_issue() {
        let error = CompletionState::Created.apply(CompletionEvent::Complete);
        assert!(error.is_err());
        let envelope: Option<ErrorEnvelope> = error.err().map(Into::into);
        assert_eq!(
            envelope.map(|error| error.code.to_string()),
            Some("completion:invalid_transition".to_owned())
        );
    }
}
