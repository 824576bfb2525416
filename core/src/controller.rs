//! Chat Controller
//!
//! The request lifecycle controller: owns the transcript, the lifecycle
//! state machine and the (at most one) active stream session, and feeds
//! [`ChatEvent`]s to whatever surface is rendering the conversation.
//!
//! # Lifecycle
//!
//! ```text
//! Idle -> Sending -> Streaming -> { Completed | Cancelled | Errored } -> Idle
//! ```
//!
//! - `submit` is accepted only in `Idle`; while a request is in flight
//!   it is rejected with [`SubmitError::Busy`]. This - not a lock - is
//!   what enforces the one-session-per-widget invariant.
//! - `Sending -> Streaming` happens when the first bytes of the
//!   response body arrive; the assistant placeholder is appended at
//!   that moment.
//! - Cancellation is silent: the partially revealed message is kept
//!   with its streaming flag cleared. An error discards the placeholder
//!   entirely and surfaces a notification.
//! - A terminal state settles back to `Idle` on the first `poll` that
//!   finds no pending session events, so a surface always observes the
//!   terminal state for at least one tick.
//!
//! The controller is poll-driven and never blocks on the network: the
//! surface's event loop calls [`ChatController::poll`] each tick, and
//! all pacing happens in the spawned session pump.

use std::sync::Arc;

use tokio::sync::mpsc;

use crate::backend::{ChatBackend, ChatRequest, HistoryEntry};
use crate::config::ChatConfig;
use crate::error::{ChatError, SubmitError};
use crate::events::{ChatEvent, ChatState, NotifyLevel};
use crate::session::{MessageRole, Transcript};
use crate::streaming::{SessionEvent, StreamSession};

/// The request lifecycle controller for one chat widget.
pub struct ChatController<B: ChatBackend> {
    config: ChatConfig,
    backend: Arc<B>,
    transcript: Transcript,
    state: ChatState,
    /// The active stream session, if any. Invariant: `Some` only while
    /// the state is `Sending` or `Streaming`.
    session: Option<StreamSession>,
    /// Channel to the rendering surface.
    tx: mpsc::Sender<ChatEvent>,
}

impl<B: ChatBackend + 'static> ChatController<B> {
    /// Create a controller with the given backend and event channel.
    pub fn new(backend: B, config: ChatConfig, tx: mpsc::Sender<ChatEvent>) -> Self {
        Self {
            config,
            backend: Arc::new(backend),
            transcript: Transcript::new(),
            state: ChatState::Idle,
            session: None,
            tx,
        }
    }

    /// Current lifecycle state.
    #[must_use]
    pub fn state(&self) -> ChatState {
        self.state
    }

    /// The transcript, oldest message first.
    #[must_use]
    pub fn transcript(&self) -> &Transcript {
        &self.transcript
    }

    /// Whether a request is in flight.
    #[must_use]
    pub fn is_busy(&self) -> bool {
        self.state.is_busy()
    }

    /// Check the backend once and warn the surface if it is
    /// unreachable.
    ///
    /// Purely advisory: submits are attempted regardless, and a real
    /// failure surfaces through the normal error path.
    pub async fn start(&mut self) {
        if !self.backend.health_check().await {
            tracing::warn!(backend = self.backend.name(), "backend not reachable");
            self.send(ChatEvent::Notify {
                level: NotifyLevel::Warning,
                message: "chat API not reachable - first request may fail".to_string(),
            })
            .await;
        }
    }

    /// Submit a user message.
    ///
    /// Appends the user message, sends the request and - on the
    /// streaming path - spawns the session pump. Returns without
    /// waiting for the response to finish; progress arrives through
    /// `poll` and the event channel.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Busy`] unless the controller is `Idle`;
    /// [`SubmitError::Empty`] for whitespace-only input.
    pub async fn submit(&mut self, content: impl Into<String>) -> Result<(), SubmitError> {
        let content = content.into().trim().to_string();
        if content.is_empty() {
            return Err(SubmitError::Empty);
        }
        if self.state != ChatState::Idle {
            return Err(SubmitError::Busy(self.state));
        }

        // History is built from the transcript as it stood before this
        // submission, completed messages only.
        let history: Vec<HistoryEntry> = self
            .transcript
            .completed_messages(self.config.max_history_messages)
            .into_iter()
            .map(HistoryEntry::from_message)
            .collect();

        let user_id = self.transcript.push_user(content.clone());
        self.send(ChatEvent::Message {
            id: user_id,
            role: MessageRole::User,
            content: content.clone(),
        })
        .await;

        let mut request = ChatRequest::new(content).with_history(history);
        if let Some(ref prompt) = self.config.system_prompt {
            request = request.with_system_prompt(prompt.clone());
        }

        self.set_state(ChatState::Sending).await;

        if self.config.streaming {
            self.submit_streaming(&request).await;
        } else {
            self.submit_blocking(&request).await;
        }

        Ok(())
    }

    /// Start a streaming request; tokens arrive via the session pump.
    async fn submit_streaming(&mut self, request: &ChatRequest) {
        match self.backend.stream_chat(request).await {
            Ok(tokens) => {
                self.session = Some(StreamSession::spawn(tokens, self.config.typing));
            }
            Err(error) => {
                tracing::warn!(backend = self.backend.name(), error = %error, "request failed");
                self.fail(None, error).await;
            }
        }
    }

    /// The non-streaming path: one request, one complete message.
    async fn submit_blocking(&mut self, request: &ChatRequest) {
        match self.backend.chat(request).await {
            Ok(response) => {
                let id = self.transcript.push_assistant(response.response.clone());
                self.send(ChatEvent::Message {
                    id,
                    role: MessageRole::Assistant,
                    content: response.response,
                })
                .await;
                self.set_state(ChatState::Completed).await;
            }
            Err(error) => {
                tracing::warn!(backend = self.backend.name(), error = %error, "request failed");
                self.fail(None, error).await;
            }
        }
    }

    /// Cancel the in-flight request, if any.
    ///
    /// Silent by design: the partially revealed message is retained
    /// with its streaming flag cleared, and no error is surfaced.
    /// Session events still buffered at the moment of cancellation are
    /// dropped, so nothing mutates the transcript afterwards.
    pub async fn cancel(&mut self) {
        let Some(session) = self.session.take() else {
            return;
        };
        session.cancel();
        // Dropping the session drops the event receiver; the pump and
        // the transport read loop unwind from there.
        drop(session);

        if let Some(id) = self.transcript.retain_streaming() {
            let partial_content = self
                .transcript
                .messages()
                .iter()
                .find(|m| m.id == id)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            self.send(ChatEvent::StreamCancelled {
                id,
                partial_content,
            })
            .await;
        }
        self.set_state(ChatState::Cancelled).await;
    }

    /// Wipe the transcript.
    ///
    /// # Errors
    ///
    /// [`SubmitError::Busy`] while a request is in flight.
    pub async fn clear(&mut self) -> Result<(), SubmitError> {
        if self.state.is_busy() {
            return Err(SubmitError::Busy(self.state));
        }
        self.transcript.clear();
        self.send(ChatEvent::Cleared).await;
        Ok(())
    }

    /// Drain pending session events and advance the state machine.
    ///
    /// Non-blocking; call this regularly from the surface's event loop.
    /// Returns `true` if anything changed.
    pub async fn poll(&mut self) -> bool {
        let Some(session) = self.session.as_mut() else {
            // A terminal state settles back to Idle once the session is
            // gone and nothing is left to deliver.
            if self.state.is_terminal() {
                self.set_state(ChatState::Idle).await;
                return true;
            }
            return false;
        };

        let mut events = Vec::new();
        while let Some(event) = session.try_recv() {
            let terminal = matches!(
                event,
                SessionEvent::Done { .. } | SessionEvent::Failed { .. }
            );
            events.push(event);
            if terminal {
                break;
            }
        }

        if events.is_empty() {
            return false;
        }

        for event in events {
            self.apply(event).await;
        }
        true
    }

    /// Apply one session event to the transcript and state machine.
    async fn apply(&mut self, event: SessionEvent) {
        match event {
            SessionEvent::Opened => {
                let id = self.transcript.start_streaming();
                self.send(ChatEvent::StreamStart { id }).await;
                self.set_state(ChatState::Streaming).await;
            }
            SessionEvent::Delta(text) => {
                if self.transcript.append_streaming(&text) {
                    if let Some(id) = self.transcript.streaming_id().cloned() {
                        self.send(ChatEvent::StreamDelta { id, text }).await;
                    }
                }
            }
            SessionEvent::Done { text } => {
                self.session = None;
                if let Some(id) = self.transcript.complete_streaming(text.clone()) {
                    self.send(ChatEvent::StreamEnd {
                        id,
                        final_content: text,
                    })
                    .await;
                }
                self.set_state(ChatState::Completed).await;
            }
            SessionEvent::Failed { error } => {
                self.session = None;
                let id = self.transcript.discard_streaming();
                self.fail(id, error).await;
            }
        }
    }

    /// Enter `Errored`: discard already happened (or never applied),
    /// surface the failure.
    async fn fail(&mut self, id: Option<crate::session::MessageId>, error: ChatError) {
        self.send(ChatEvent::StreamError {
            id,
            error: error.clone(),
        })
        .await;
        self.send(ChatEvent::Notify {
            level: NotifyLevel::Error,
            message: error.to_string(),
        })
        .await;
        self.set_state(ChatState::Errored).await;
    }

    async fn set_state(&mut self, state: ChatState) {
        if self.state == state {
            return;
        }
        tracing::debug!(from = ?self.state, to = ?state, "state transition");
        self.state = state;
        self.send(ChatEvent::State { state }).await;
    }

    /// Send an event to the surface. A full or closed channel is the
    /// surface's problem, not a stream failure.
    async fn send(&self, event: ChatEvent) {
        if let Err(e) = self.tx.send(event).await {
            tracing::warn!("failed to send event to surface: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::{ChatResponse, StreamingToken};
    use async_trait::async_trait;

    /// Backend that replays a scripted token sequence.
    struct ScriptedBackend {
        tokens: Vec<StreamingToken>,
    }

    #[async_trait]
    impl ChatBackend for ScriptedBackend {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> bool {
            true
        }

        async fn stream_chat(
            &self,
            _request: &ChatRequest,
        ) -> Result<mpsc::Receiver<StreamingToken>, ChatError> {
            let (tx, rx) = mpsc::channel(100);
            let tokens = self.tokens.clone();
            tokio::spawn(async move {
                for token in tokens {
                    if tx.send(token).await.is_err() {
                        break;
                    }
                }
            });
            Ok(rx)
        }

        async fn chat(&self, _request: &ChatRequest) -> Result<ChatResponse, ChatError> {
            Ok(ChatResponse {
                response: "scripted".to_string(),
            })
        }
    }

    fn test_config() -> ChatConfig {
        ChatConfig {
            typing: crate::animator::TypingConfig::instant(),
            ..ChatConfig::default()
        }
    }

    #[tokio::test]
    async fn test_controller_starts_idle() {
        let (tx, _rx) = mpsc::channel(100);
        let controller =
            ChatController::new(ScriptedBackend { tokens: vec![] }, test_config(), tx);
        assert_eq!(controller.state(), ChatState::Idle);
        assert!(!controller.is_busy());
    }

    #[tokio::test]
    async fn test_empty_submit_rejected() {
        let (tx, _rx) = mpsc::channel(100);
        let mut controller =
            ChatController::new(ScriptedBackend { tokens: vec![] }, test_config(), tx);

        assert_eq!(controller.submit("   ").await, Err(SubmitError::Empty));
        assert_eq!(controller.state(), ChatState::Idle);
        assert!(controller.transcript().is_empty());
    }

    #[tokio::test]
    async fn test_submit_appends_user_message_and_sends() {
        let (tx, mut rx) = mpsc::channel(100);
        let mut controller = ChatController::new(
            ScriptedBackend {
                tokens: vec![StreamingToken::Opened, StreamingToken::Done],
            },
            test_config(),
            tx,
        );

        controller.submit("  hello  ").await.unwrap();

        assert_eq!(controller.state(), ChatState::Sending);
        assert_eq!(controller.transcript().len(), 1);
        assert_eq!(controller.transcript().messages()[0].content, "hello");

        // First two events: the user message, then the Sending state.
        let first = rx.recv().await.unwrap();
        assert!(matches!(first, ChatEvent::Message { role: MessageRole::User, .. }));
        let second = rx.recv().await.unwrap();
        assert!(matches!(
            second,
            ChatEvent::State {
                state: ChatState::Sending
            }
        ));
    }

    #[tokio::test]
    async fn test_clear_rejected_while_busy() {
        let (tx, _rx) = mpsc::channel(100);
        let mut controller = ChatController::new(
            ScriptedBackend {
                tokens: vec![StreamingToken::Opened],
            },
            test_config(),
            tx,
        );

        controller.submit("hi").await.unwrap();
        assert!(matches!(
            controller.clear().await,
            Err(SubmitError::Busy(_))
        ));
    }
}
