//! Chat Events
//!
//! Events sent from the chat core to a rendering surface. The core is
//! UI-agnostic: a terminal UI, a web view or a headless test harness all
//! consume the same event stream and render it however they like.
//!
//! Surfaces are pure renderers. They hold no business logic - they apply
//! events to their display state and forward user actions back to the
//! controller.

use crate::error::ChatError;
use crate::session::{MessageId, MessageRole};

/// Events from the chat core to a surface.
#[derive(Clone, Debug)]
pub enum ChatEvent {
    /// A completed message was appended to the transcript (user input,
    /// or the whole response on the non-streaming path).
    Message {
        /// Unique message ID.
        id: MessageId,
        /// Who sent this message.
        role: MessageRole,
        /// The message content.
        content: String,
    },

    /// The streaming placeholder was appended; the response body has
    /// started arriving.
    StreamStart {
        /// ID of the placeholder message.
        id: MessageId,
    },

    /// Revealed text was appended to the streaming message.
    StreamDelta {
        /// ID of the streaming message.
        id: MessageId,
        /// The text fragment just revealed.
        text: String,
    },

    /// The streaming message completed.
    StreamEnd {
        /// ID of the completed message.
        id: MessageId,
        /// Final complete content.
        final_content: String,
    },

    /// The stream was cancelled; the partial content is retained.
    StreamCancelled {
        /// ID of the retained message.
        id: MessageId,
        /// Content revealed before cancellation.
        partial_content: String,
    },

    /// The stream failed; the placeholder (if one existed) was removed.
    StreamError {
        /// ID of the removed placeholder, when the failure happened
        /// after the body opened.
        id: Option<MessageId>,
        /// What went wrong.
        error: ChatError,
    },

    /// Controller state change.
    State {
        /// The new state.
        state: ChatState,
    },

    /// Notification for transient display (a status line, a toast).
    Notify {
        /// Notification level.
        level: NotifyLevel,
        /// Message content.
        message: String,
    },

    /// The transcript was wiped.
    Cleared,
}

/// Notification levels.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NotifyLevel {
    /// Informational.
    Info,
    /// Warning.
    Warning,
    /// Error.
    Error,
}

/// Request lifecycle states.
///
/// `Idle -> Sending -> Streaming -> {Completed | Cancelled | Errored}`,
/// and every terminal state settles back to `Idle` once the surface has
/// drained the terminal event. Submitting is only accepted in `Idle`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChatState {
    /// No request in flight.
    Idle,
    /// Request sent; waiting for the response body to open.
    Sending,
    /// Response body open; chunks are being revealed.
    Streaming,
    /// The stream finished successfully.
    Completed,
    /// The user cancelled; partial content was retained.
    Cancelled,
    /// The stream failed; the placeholder was discarded.
    Errored,
}

impl ChatState {
    /// Whether this is a terminal state awaiting settle back to `Idle`.
    #[must_use]
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Completed | Self::Cancelled | Self::Errored)
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_busy(self) -> bool {
        matches!(self, Self::Sending | Self::Streaming)
    }

    /// Human-readable description.
    #[must_use]
    pub fn description(self) -> &'static str {
        match self {
            Self::Idle => "Ready",
            Self::Sending => "Sending...",
            Self::Streaming => "Typing...",
            Self::Completed => "Done",
            Self::Cancelled => "Cancelled",
            Self::Errored => "Error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_state_predicates() {
        assert!(!ChatState::Idle.is_busy());
        assert!(ChatState::Sending.is_busy());
        assert!(ChatState::Streaming.is_busy());
        assert!(!ChatState::Completed.is_busy());

        assert!(ChatState::Completed.is_terminal());
        assert!(ChatState::Cancelled.is_terminal());
        assert!(ChatState::Errored.is_terminal());
        assert!(!ChatState::Streaming.is_terminal());
        assert!(!ChatState::Idle.is_terminal());
    }

    #[test]
    fn test_state_description() {
        assert_eq!(ChatState::Idle.description(), "Ready");
        assert_eq!(ChatState::Streaming.description(), "Typing...");
    }
}
