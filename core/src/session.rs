//! Transcript Management
//!
//! The transcript is the ordered message list owned by one chat
//! controller. Messages are append-only; the single exception is the
//! most recent assistant message while its `streaming` flag is set,
//! which is mutated in place as characters are revealed. Once streaming
//! ends the message is immutable.

use serde::{Deserialize, Serialize};

/// Message identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MessageId(pub String);

impl MessageId {
    /// Generate a new unique message ID.
    #[must_use]
    pub fn new() -> Self {
        use std::sync::atomic::{AtomicU64, Ordering};
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        let id = COUNTER.fetch_add(1, Ordering::SeqCst);
        Self(format!("msg_{id}"))
    }
}

impl Default for MessageId {
    fn default() -> Self {
        Self::new()
    }
}

/// Who sent a message.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MessageRole {
    /// User input.
    User,
    /// The assistant's response.
    Assistant,
}

/// A message in the conversation.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Unique message ID.
    pub id: MessageId,
    /// Who sent this message.
    pub role: MessageRole,
    /// Message content. Mutable only while `streaming` is true.
    pub content: String,
    /// Whether the message is still being streamed.
    pub streaming: bool,
}

impl ChatMessage {
    /// A completed message.
    #[must_use]
    pub fn new(role: MessageRole, content: String) -> Self {
        Self {
            id: MessageId::new(),
            role,
            content,
            streaming: false,
        }
    }

    /// An empty assistant placeholder, to be filled while streaming.
    #[must_use]
    pub fn placeholder() -> Self {
        Self {
            id: MessageId::new(),
            role: MessageRole::Assistant,
            content: String::new(),
            streaming: true,
        }
    }
}

/// The message list one chat widget owns.
///
/// At most one message is streaming at any time; every mutating
/// streaming operation targets that message and is a no-op (returning
/// `None`/`false`) when no stream is active.
#[derive(Clone, Debug, Default)]
pub struct Transcript {
    messages: Vec<ChatMessage>,
    streaming_id: Option<MessageId>,
}

impl Transcript {
    /// Create an empty transcript.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a completed user message.
    pub fn push_user(&mut self, content: String) -> MessageId {
        let msg = ChatMessage::new(MessageRole::User, content);
        let id = msg.id.clone();
        self.messages.push(msg);
        id
    }

    /// Append a completed assistant message (the non-streaming path).
    pub fn push_assistant(&mut self, content: String) -> MessageId {
        let msg = ChatMessage::new(MessageRole::Assistant, content);
        let id = msg.id.clone();
        self.messages.push(msg);
        id
    }

    /// Append the streaming assistant placeholder.
    pub fn start_streaming(&mut self) -> MessageId {
        let msg = ChatMessage::placeholder();
        let id = msg.id.clone();
        self.streaming_id = Some(id.clone());
        self.messages.push(msg);
        id
    }

    /// Append revealed text to the streaming message.
    ///
    /// Returns `false` when no message is streaming (the text is
    /// dropped, never misattributed to a completed message).
    pub fn append_streaming(&mut self, text: &str) -> bool {
        match self.streaming_message_mut() {
            Some(msg) => {
                msg.content.push_str(text);
                true
            }
            None => false,
        }
    }

    /// Complete the streaming message with its final content.
    pub fn complete_streaming(&mut self, final_content: String) -> Option<MessageId> {
        let id = self.streaming_id.take()?;
        let msg = self.messages.iter_mut().find(|m| m.id == id)?;
        msg.content = final_content;
        msg.streaming = false;
        Some(id)
    }

    /// Keep the partially streamed content and clear the streaming
    /// flag (the cancellation path).
    pub fn retain_streaming(&mut self) -> Option<MessageId> {
        let id = self.streaming_id.take()?;
        let msg = self.messages.iter_mut().find(|m| m.id == id)?;
        msg.streaming = false;
        Some(id)
    }

    /// Remove the streaming message entirely (the error path).
    pub fn discard_streaming(&mut self) -> Option<MessageId> {
        let id = self.streaming_id.take()?;
        self.messages.retain(|m| m.id != id);
        Some(id)
    }

    /// Whether a message is currently streaming.
    #[must_use]
    pub fn is_streaming(&self) -> bool {
        self.streaming_id.is_some()
    }

    /// ID of the streaming message, if any.
    #[must_use]
    pub fn streaming_id(&self) -> Option<&MessageId> {
        self.streaming_id.as_ref()
    }

    /// Content of the streaming message so far, if any.
    #[must_use]
    pub fn streaming_content(&self) -> Option<&str> {
        let id = self.streaming_id.as_ref()?;
        self.messages
            .iter()
            .find(|m| &m.id == id)
            .map(|m| m.content.as_str())
    }

    /// All messages, oldest first.
    #[must_use]
    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    /// The last `count` completed (non-streaming) messages.
    #[must_use]
    pub fn completed_messages(&self, count: usize) -> Vec<&ChatMessage> {
        let completed: Vec<&ChatMessage> =
            self.messages.iter().filter(|m| !m.streaming).collect();
        let start = completed.len().saturating_sub(count);
        completed[start..].to_vec()
    }

    /// Number of messages, streaming placeholder included.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Whether the transcript is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    /// Wipe the transcript.
    pub fn clear(&mut self) {
        self.messages.clear();
        self.streaming_id = None;
    }

    fn streaming_message_mut(&mut self) -> Option<&mut ChatMessage> {
        let id = self.streaming_id.clone()?;
        self.messages.iter_mut().find(|m| m.id == id)
    }
}
