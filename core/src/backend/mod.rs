//! Chat Backend
//!
//! Communication with the chat API: the trait seam the controller talks
//! through, and the HTTP implementation.

mod http;
mod traits;

pub use http::HttpBackend;
pub use traits::{ChatBackend, ChatRequest, ChatResponse, HistoryEntry, StreamingToken};
