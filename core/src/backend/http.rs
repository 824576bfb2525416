//! HTTP Backend Implementation
//!
//! Talks to the chat API over HTTP:
//! - `POST {base}/chat/stream` - SSE-like streaming response
//! - `POST {base}/chat` - complete JSON response `{"response": ...}`
//!
//! The streaming read loop runs in a spawned task feeding a token
//! channel. Cancellation needs no protocol message: when the receiver is
//! dropped, the next send fails and the loop exits, aborting the
//! in-flight request.

use std::time::Duration;

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::StatusCode;
use serde_json::Value;
use tokio::sync::mpsc;

use super::traits::{ChatBackend, ChatRequest, ChatResponse, StreamingToken};
use crate::error::ChatError;
use crate::sse::{self, LineSplitter, SseFrame, StreamFrame};

/// Timeout for the non-streaming request path. Streaming requests get
/// no overall deadline - only explicit cancellation ends a stalled
/// stream - so the client only bounds connection establishment.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// HTTP chat backend.
#[derive(Clone)]
pub struct HttpBackend {
    base_url: String,
    http_client: reqwest::Client,
}

impl HttpBackend {
    /// Create a backend for the given base URL (e.g.
    /// `http://localhost:5001/api/ai`).
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into();
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            http_client: reqwest::Client::builder()
                .connect_timeout(Duration::from_secs(10))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    /// Create from the `BABBEL_ENDPOINT` environment variable.
    #[must_use]
    pub fn from_env() -> Self {
        let base_url = std::env::var("BABBEL_ENDPOINT")
            .unwrap_or_else(|_| "http://localhost:5001/api/ai".to_string());
        Self::new(base_url)
    }

    /// The configured base URL.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn stream_url(&self) -> String {
        format!("{}/chat/stream", self.base_url)
    }

    fn chat_url(&self) -> String {
        format!("{}/chat", self.base_url)
    }
}

/// Extract the API's `{"error": ...}` detail from an error body, falling
/// back to the HTTP status.
fn error_detail(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(String::from))
        .unwrap_or_else(|| format!("HTTP {status}"))
}

#[async_trait]
impl ChatBackend for HttpBackend {
    fn name(&self) -> &str {
        "http"
    }

    async fn health_check(&self) -> bool {
        self.http_client
            .get(self.base_url.clone())
            .timeout(Duration::from_secs(5))
            .send()
            .await
            .is_ok()
    }

    async fn stream_chat(
        &self,
        request: &ChatRequest,
    ) -> Result<mpsc::Receiver<StreamingToken>, ChatError> {
        let (tx, rx) = mpsc::channel(100);

        let response = self
            .http_client
            .post(self.stream_url())
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Transport(error_detail(status, &body)));
        }

        let mut stream = response.bytes_stream();

        tokio::spawn(async move {
            let mut splitter = LineSplitter::new();
            let mut opened = false;

            while let Some(chunk) = stream.next().await {
                let bytes = match chunk {
                    Ok(bytes) => bytes,
                    Err(e) => {
                        let _ = tx
                            .send(StreamingToken::Error(ChatError::Transport(e.to_string())))
                            .await;
                        return;
                    }
                };

                if !opened {
                    opened = true;
                    if tx.send(StreamingToken::Opened).await.is_err() {
                        return;
                    }
                }

                for line in splitter.push(&bytes) {
                    match sse::parse_line(&line) {
                        None | Some(SseFrame::Comment) => {}
                        Some(SseFrame::Malformed) => {
                            tracing::warn!(line = %line, "skipping malformed stream line");
                        }
                        Some(SseFrame::Data(StreamFrame::Chunk(text))) => {
                            if tx.send(StreamingToken::Chunk(text)).await.is_err() {
                                // Receiver dropped: the stream was cancelled.
                                return;
                            }
                        }
                        Some(SseFrame::Data(StreamFrame::Done)) => {
                            let _ = tx.send(StreamingToken::Done).await;
                            return;
                        }
                        Some(SseFrame::Data(StreamFrame::Error(message))) => {
                            let _ = tx
                                .send(StreamingToken::Error(ChatError::Application(message)))
                                .await;
                            return;
                        }
                    }
                }
            }

            // Body ended without a terminal frame: treat as completion.
            let _ = tx.send(StreamingToken::Done).await;
        });

        Ok(rx)
    }

    async fn chat(&self, request: &ChatRequest) -> Result<ChatResponse, ChatError> {
        let response = self
            .http_client
            .post(self.chat_url())
            .timeout(REQUEST_TIMEOUT)
            .json(request)
            .send()
            .await
            .map_err(|e| ChatError::Transport(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ChatError::Transport(error_detail(status, &body)));
        }

        response
            .json::<ChatResponse>()
            .await
            .map_err(|e| ChatError::Protocol(format!("invalid response body: {e}")))
    }
}
