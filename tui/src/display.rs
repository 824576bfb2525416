//! Display State
//!
//! Types that represent the current display state for the TUI, derived
//! from [`ChatEvent`]s. The TUI is a thin client: it renders this state
//! and nothing else, so applying events is the only place display data
//! changes.

use std::time::{Duration, Instant};

use babbel_core::{ChatEvent, ChatState, MessageId, MessageRole, NotifyLevel};

/// How long a notification stays on the status line.
const NOTICE_TTL: Duration = Duration::from_secs(5);

/// A rendered conversation message.
#[derive(Clone, Debug)]
pub struct DisplayMessage {
    /// Unique message ID.
    pub id: MessageId,
    /// Who sent this message.
    pub role: MessageRole,
    /// The message content.
    pub content: String,
    /// Whether this message is still being streamed.
    pub streaming: bool,
}

/// A transient status-line notification.
#[derive(Clone, Debug)]
pub struct Notice {
    /// Severity, mapped to a color.
    pub level: NotifyLevel,
    /// The text to show.
    pub message: String,
    shown_at: Instant,
}

impl Notice {
    fn new(level: NotifyLevel, message: String) -> Self {
        Self {
            level,
            message,
            shown_at: Instant::now(),
        }
    }

    /// Whether the notice should still be displayed.
    #[must_use]
    pub fn is_fresh(&self) -> bool {
        self.shown_at.elapsed() < NOTICE_TTL
    }
}

/// Everything the TUI renders.
#[derive(Debug)]
pub struct DisplayState {
    /// Conversation messages, oldest first.
    pub messages: Vec<DisplayMessage>,
    /// Current controller state.
    pub chat_state: ChatState,
    /// Most recent notification, if any.
    pub notice: Option<Notice>,
}

impl Default for DisplayState {
    fn default() -> Self {
        Self::new()
    }
}

impl DisplayState {
    /// Create an empty display state.
    #[must_use]
    pub fn new() -> Self {
        Self {
            messages: Vec::new(),
            chat_state: ChatState::Idle,
            notice: None,
        }
    }

    /// Apply one event from the chat core.
    pub fn apply(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::Message { id, role, content } => {
                self.messages.push(DisplayMessage {
                    id,
                    role,
                    content,
                    streaming: false,
                });
            }
            ChatEvent::StreamStart { id } => {
                self.messages.push(DisplayMessage {
                    id,
                    role: MessageRole::Assistant,
                    content: String::new(),
                    streaming: true,
                });
            }
            ChatEvent::StreamDelta { id, text } => {
                if let Some(msg) = self.find_mut(&id) {
                    msg.content.push_str(&text);
                }
            }
            ChatEvent::StreamEnd { id, final_content } => {
                if let Some(msg) = self.find_mut(&id) {
                    msg.content = final_content;
                    msg.streaming = false;
                }
            }
            ChatEvent::StreamCancelled {
                id,
                partial_content,
            } => {
                if let Some(msg) = self.find_mut(&id) {
                    msg.content = partial_content;
                    msg.streaming = false;
                }
            }
            ChatEvent::StreamError { id, error: _ } => {
                if let Some(id) = id {
                    self.messages.retain(|m| m.id != id);
                }
                // The error text itself arrives as a Notify event.
            }
            ChatEvent::State { state } => {
                self.chat_state = state;
            }
            ChatEvent::Notify { level, message } => {
                self.notice = Some(Notice::new(level, message));
            }
            ChatEvent::Cleared => {
                self.messages.clear();
            }
        }
    }

    /// The notice to render, dropping it once stale.
    pub fn current_notice(&mut self) -> Option<&Notice> {
        if self.notice.as_ref().is_some_and(|n| !n.is_fresh()) {
            self.notice = None;
        }
        self.notice.as_ref()
    }

    fn find_mut(&mut self, id: &MessageId) -> Option<&mut DisplayMessage> {
        self.messages.iter_mut().find(|m| &m.id == id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use babbel_core::ChatError;
    use pretty_assertions::assert_eq;

    fn start_stream(state: &mut DisplayState) -> MessageId {
        let id = MessageId::new();
        state.apply(ChatEvent::StreamStart { id: id.clone() });
        id
    }

    #[test]
    fn test_stream_lifecycle_renders_incrementally() {
        let mut state = DisplayState::new();
        let id = start_stream(&mut state);

        state.apply(ChatEvent::StreamDelta {
            id: id.clone(),
            text: "He".to_string(),
        });
        state.apply(ChatEvent::StreamDelta {
            id: id.clone(),
            text: "llo".to_string(),
        });
        assert_eq!(state.messages[0].content, "Hello");
        assert!(state.messages[0].streaming);

        state.apply(ChatEvent::StreamEnd {
            id,
            final_content: "Hello".to_string(),
        });
        assert!(!state.messages[0].streaming);
    }

    #[test]
    fn test_cancelled_stream_keeps_partial_content() {
        let mut state = DisplayState::new();
        let id = start_stream(&mut state);
        state.apply(ChatEvent::StreamDelta {
            id: id.clone(),
            text: "part".to_string(),
        });

        state.apply(ChatEvent::StreamCancelled {
            id,
            partial_content: "part".to_string(),
        });

        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].content, "part");
        assert!(!state.messages[0].streaming);
    }

    #[test]
    fn test_stream_error_removes_placeholder() {
        let mut state = DisplayState::new();
        state.apply(ChatEvent::Message {
            id: MessageId::new(),
            role: MessageRole::User,
            content: "hi".to_string(),
        });
        let id = start_stream(&mut state);

        state.apply(ChatEvent::StreamError {
            id: Some(id),
            error: ChatError::Application("boom".to_string()),
        });

        assert_eq!(state.messages.len(), 1);
        assert_eq!(state.messages[0].role, MessageRole::User);
    }

    #[test]
    fn test_notify_and_state() {
        let mut state = DisplayState::new();
        state.apply(ChatEvent::State {
            state: ChatState::Streaming,
        });
        state.apply(ChatEvent::Notify {
            level: NotifyLevel::Error,
            message: "oops".to_string(),
        });

        assert_eq!(state.chat_state, ChatState::Streaming);
        let notice = state.current_notice().unwrap();
        assert_eq!(notice.message, "oops");
        assert_eq!(notice.level, NotifyLevel::Error);
    }

    #[test]
    fn test_cleared_wipes_messages() {
        let mut state = DisplayState::new();
        state.apply(ChatEvent::Message {
            id: MessageId::new(),
            role: MessageRole::User,
            content: "hi".to_string(),
        });
        state.apply(ChatEvent::Cleared);
        assert!(state.messages.is_empty());
    }
}
