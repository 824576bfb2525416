//! Error Types
//!
//! Error taxonomy for the streaming chat core.
//!
//! Every [`ChatError`] is local to a single stream session: a failed
//! stream never corrupts prior completed messages or other sessions.
//! Cancellation is deliberately absent from the taxonomy - it is not an
//! error, and the controller handles it silently.

use thiserror::Error;

use crate::events::ChatState;

/// Failures that can terminate or degrade one stream session.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ChatError {
    /// Network failure or a non-2xx HTTP response.
    #[error("transport error: {0}")]
    Transport(String),

    /// A response the client could not decode (outer body or a stream
    /// frame). Malformed individual frames are logged and skipped; this
    /// variant surfaces only when the whole response is unusable.
    #[error("protocol error: {0}")]
    Protocol(String),

    /// An `{"error": ...}` frame raised by the chat API itself.
    #[error("chat API error: {0}")]
    Application(String),
}

/// Why a `submit` call was rejected.
///
/// Rejection is a normal control-flow outcome, not a stream failure:
/// the transcript and any in-flight session are left untouched.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum SubmitError {
    /// A request is already in flight; only one session may be active
    /// per controller.
    #[error("a request is already in flight (state: {0:?})")]
    Busy(ChatState),

    /// The message was empty after trimming.
    #[error("message is empty")]
    Empty,
}
