//! Chat Backend Traits
//!
//! Trait definitions for chat backends. The abstraction lets the
//! controller drive a real HTTP backend, and lets tests drive the whole
//! pipeline from a scripted token source without any network.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::ChatError;
use crate::session::{ChatMessage, MessageRole};

/// Channel-level events from a streaming chat response.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamingToken {
    /// The first bytes of the response body arrived. Sent exactly once,
    /// before any other token.
    Opened,
    /// A fragment of assistant text.
    Chunk(String),
    /// The API signalled completion.
    Done,
    /// Terminal failure (transport or application).
    Error(ChatError),
}

/// One prior conversation turn, in the chat API's wire shape.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    /// `"user"` or `"model"`.
    pub role: String,
    /// Message text parts (always a single element here).
    pub parts: Vec<String>,
}

impl HistoryEntry {
    /// Wire form of a completed transcript message.
    #[must_use]
    pub fn from_message(msg: &ChatMessage) -> Self {
        let role = match msg.role {
            MessageRole::User => "user",
            MessageRole::Assistant => "model",
        };
        Self {
            role: role.to_string(),
            parts: vec![msg.content.clone()],
        }
    }
}

/// Outbound request body, shared by both chat endpoints.
#[derive(Clone, Debug, Serialize)]
pub struct ChatRequest {
    /// The new user message.
    pub message: String,
    /// Prior completed turns, oldest first.
    pub history: Vec<HistoryEntry>,
    /// Optional system prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
}

impl ChatRequest {
    /// Create a request with an empty history.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            history: Vec::new(),
            system_prompt: None,
        }
    }

    /// Set the conversation history.
    #[must_use]
    pub fn with_history(mut self, history: Vec<HistoryEntry>) -> Self {
        self.history = history;
        self
    }

    /// Set the system prompt.
    #[must_use]
    pub fn with_system_prompt(mut self, system_prompt: impl Into<String>) -> Self {
        self.system_prompt = Some(system_prompt.into());
        self
    }
}

/// Response from the non-streaming chat endpoint.
#[derive(Clone, Debug, Deserialize)]
pub struct ChatResponse {
    /// The complete assistant response.
    pub response: String,
}

/// Chat backend trait.
#[async_trait]
pub trait ChatBackend: Send + Sync {
    /// Backend name, for logging.
    fn name(&self) -> &str;

    /// Check if the backend is reachable.
    async fn health_check(&self) -> bool;

    /// Send a request and stream the response.
    ///
    /// Returns a receiver of [`StreamingToken`]s. The channel closes
    /// after a terminal token; when the caller drops the receiver
    /// instead (the cancellation path), the read loop exits silently on
    /// its next send.
    async fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<StreamingToken>, ChatError>;

    /// Send a request and wait for the complete response.
    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError>;
}
