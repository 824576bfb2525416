//! Babbel Core - Headless Streaming Chat Client
//!
//! This crate implements the streaming-chat mechanics for babbel,
//! completely independent of any UI framework. It can drive a TUI, a
//! GUI, or run headless for testing.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                        Surface                            │
//! │           (TUI, GUI, headless test harness)               │
//! │                                                           │
//! │      submit / cancel / clear (down)    ChatEvent (up)     │
//! └────────────────────────────┬──────────────────────────────┘
//!                              │
//! ┌────────────────────────────┼──────────────────────────────┐
//! │                     ChatController                        │
//! │   ┌────────────┐  ┌───────────────┐  ┌────────────────┐   │
//! │   │ Transcript │  │ StreamSession │  │    Backend     │   │
//! │   │ (messages) │  │ (typing pump) │  │  (chat API)    │   │
//! │   └────────────┘  └───────┬───────┘  └───────┬────────┘   │
//! │                           │                  │            │
//! │                     TypingPacer        LineSplitter       │
//! │                                         + SSE parser      │
//! └───────────────────────────────────────────────────────────┘
//! ```
//!
//! The response flows through three stages: the HTTP backend splits the
//! byte stream into lines and parses them into frames; the session pump
//! reveals chunk text character by character at an adaptive cadence; the
//! controller applies revealed text to the transcript and fans events
//! out to the surface.
//!
//! # Key Types
//!
//! - [`ChatController`]: the request lifecycle controller
//! - [`ChatEvent`]: messages from the core to a rendering surface
//! - [`Transcript`]: the conversation's message list
//! - [`ChatBackend`]: trait seam for the chat API transport
//! - [`ChatConfig`]: endpoint, history window and typing cadence
//!
//! # Quick Start
//!
//! ```ignore
//! use babbel_core::{ChatConfig, ChatController, HttpBackend};
//! use tokio::sync::mpsc;
//!
//! #[tokio::main]
//! async fn main() {
//!     let (tx, mut rx) = mpsc::channel(100);
//!     let config = ChatConfig::load().unwrap_or_default();
//!     let backend = HttpBackend::new(config.endpoint.clone());
//!     let mut controller = ChatController::new(backend, config, tx);
//!
//!     controller.submit("hello").await.unwrap();
//!
//!     loop {
//!         // Render incoming events.
//!         while let Ok(event) = rx.try_recv() {
//!             // ...
//!         }
//!         // Advance the stream.
//!         controller.poll().await;
//!     }
//! }
//! ```
//!
//! # No UI Dependencies
//!
//! This crate has **zero** dependencies on ratatui, crossterm, or any
//! other UI framework. It's pure protocol and state-machine logic.

#![deny(missing_docs)]
#![deny(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]

pub mod animator;
pub mod backend;
pub mod config;
pub mod controller;
pub mod error;
pub mod events;
pub mod session;
pub mod sse;
pub mod streaming;

// Re-exports for convenience
pub use animator::{TypingConfig, TypingPacer};
pub use backend::{ChatBackend, ChatRequest, ChatResponse, HistoryEntry, HttpBackend, StreamingToken};
pub use config::{default_config_path, ChatConfig, ConfigError};
pub use controller::ChatController;
pub use error::{ChatError, SubmitError};
pub use events::{ChatEvent, ChatState, NotifyLevel};
pub use session::{ChatMessage, MessageId, MessageRole, Transcript};
pub use streaming::{SessionEvent, StreamSession};
