//! Stream Session Pump
//!
//! One in-flight response owns one [`StreamSession`]: a spawned task
//! that consumes transport tokens, paces character reveals through the
//! typing animator, and feeds [`SessionEvent`]s to the controller.
//!
//! The pump is the single place where pacing happens, so the controller
//! stays non-blocking: its `poll` drains whatever the pump has committed
//! so far. Ordering is guaranteed by construction - the pump reveals a
//! chunk's characters to completion before reading the next token, so
//! characters arrive in strict chunk order, never interleaved.
//!
//! Cancellation is cooperative. The flag is checked between transport
//! reads and before each character commit; dropping the session (and
//! with it the event receiver) makes the pump's next send fail, which in
//! turn drops the transport receiver and ends the network read loop.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::mpsc;

use crate::animator::{TypingConfig, TypingPacer};
use crate::backend::StreamingToken;
use crate::error::ChatError;

/// Events from the session pump to the controller.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SessionEvent {
    /// The response body opened; the placeholder should be appended now.
    Opened,
    /// One revealed character (a partial state commit).
    Delta(String),
    /// The stream completed; carries the full accumulated text.
    Done {
        /// Concatenation of every revealed chunk, in arrival order.
        text: String,
    },
    /// Terminal failure.
    Failed {
        /// What went wrong.
        error: ChatError,
    },
}

/// Handle to one in-flight stream session.
///
/// Dropping the session drops the event receiver, which unwinds the
/// pump and the transport read loop without any further signalling.
#[derive(Debug)]
pub struct StreamSession {
    events: mpsc::Receiver<SessionEvent>,
    cancelled: Arc<AtomicBool>,
}

impl StreamSession {
    /// Spawn the pump over a transport token receiver.
    #[must_use]
    pub fn spawn(tokens: mpsc::Receiver<StreamingToken>, typing: TypingConfig) -> Self {
        let (tx, rx) = mpsc::channel(256);
        let cancelled = Arc::new(AtomicBool::new(false));
        tokio::spawn(pump(tokens, tx, cancelled.clone(), typing));
        Self {
            events: rx,
            cancelled,
        }
    }

    /// Signal cooperative cancellation. The pump stops committing
    /// characters; the transport loop exits on its next send.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
    }

    /// Whether cancellation was signalled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }

    /// Non-blocking read of the next pending session event.
    pub fn try_recv(&mut self) -> Option<SessionEvent> {
        self.events.try_recv().ok()
    }
}

async fn pump(
    mut tokens: mpsc::Receiver<StreamingToken>,
    tx: mpsc::Sender<SessionEvent>,
    cancelled: Arc<AtomicBool>,
    typing: TypingConfig,
) {
    let mut pacer = TypingPacer::new(typing);
    let mut accumulated = String::new();

    while let Some(token) = tokens.recv().await {
        if cancelled.load(Ordering::SeqCst) {
            return;
        }

        match token {
            StreamingToken::Opened => {
                if tx.send(SessionEvent::Opened).await.is_err() {
                    return;
                }
            }
            StreamingToken::Chunk(text) => {
                // A zero-length chunk is a no-op: no reveal, and the
                // arrival clock is left untouched.
                if text.is_empty() {
                    continue;
                }

                let delay = pacer.delay_for(text.chars().count(), Instant::now());
                let mut chars = text.chars().peekable();
                while let Some(ch) = chars.next() {
                    if cancelled.load(Ordering::SeqCst) {
                        return;
                    }
                    accumulated.push(ch);
                    if tx.send(SessionEvent::Delta(ch.to_string())).await.is_err() {
                        return;
                    }
                    // No delay after a chunk's final character; the next
                    // chunk's cadence takes over from here.
                    if chars.peek().is_some() && !delay.is_zero() {
                        tokio::time::sleep(delay).await;
                    }
                }
            }
            StreamingToken::Done => {
                let _ = tx.send(SessionEvent::Done { text: accumulated }).await;
                return;
            }
            StreamingToken::Error(error) => {
                let _ = tx.send(SessionEvent::Failed { error }).await;
                return;
            }
        }
    }

    // Transport channel closed without a terminal token: treat as
    // completion with whatever was revealed.
    let _ = tx.send(SessionEvent::Done { text: accumulated }).await;
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    fn scripted_tokens(tokens: Vec<StreamingToken>) -> mpsc::Receiver<StreamingToken> {
        let (tx, rx) = mpsc::channel(100);
        tokio::spawn(async move {
            for token in tokens {
                if tx.send(token).await.is_err() {
                    break;
                }
            }
        });
        rx
    }

    async fn drain(session: &mut StreamSession) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        let deadline = Instant::now() + Duration::from_secs(2);
        loop {
            match session.try_recv() {
                Some(event) => {
                    let terminal =
                        matches!(event, SessionEvent::Done { .. } | SessionEvent::Failed { .. });
                    events.push(event);
                    if terminal {
                        return events;
                    }
                }
                None => {
                    if Instant::now() > deadline {
                        return events;
                    }
                    tokio::time::sleep(Duration::from_millis(1)).await;
                }
            }
        }
    }

    #[tokio::test]
    async fn test_pump_reveals_chunks_in_order() {
        let rx = scripted_tokens(vec![
            StreamingToken::Opened,
            StreamingToken::Chunk("Hel".to_string()),
            StreamingToken::Chunk("lo ".to_string()),
            StreamingToken::Chunk("world".to_string()),
            StreamingToken::Done,
        ]);
        let mut session = StreamSession::spawn(rx, TypingConfig::instant());

        let events = drain(&mut session).await;

        assert_eq!(events.first(), Some(&SessionEvent::Opened));

        let revealed: String = events
            .iter()
            .filter_map(|e| match e {
                SessionEvent::Delta(text) => Some(text.as_str()),
                _ => None,
            })
            .collect();
        assert_eq!(revealed, "Hello world");

        assert_eq!(
            events.last(),
            Some(&SessionEvent::Done {
                text: "Hello world".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_pump_zero_length_chunk_is_noop() {
        let rx = scripted_tokens(vec![
            StreamingToken::Opened,
            StreamingToken::Chunk(String::new()),
            StreamingToken::Chunk("ok".to_string()),
            StreamingToken::Done,
        ]);
        let mut session = StreamSession::spawn(rx, TypingConfig::instant());

        let events = drain(&mut session).await;

        let deltas = events
            .iter()
            .filter(|e| matches!(e, SessionEvent::Delta(_)))
            .count();
        assert_eq!(deltas, 2);
        assert_eq!(
            events.last(),
            Some(&SessionEvent::Done {
                text: "ok".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_pump_forwards_error() {
        let rx = scripted_tokens(vec![
            StreamingToken::Opened,
            StreamingToken::Chunk("par".to_string()),
            StreamingToken::Error(ChatError::Application("overloaded".to_string())),
        ]);
        let mut session = StreamSession::spawn(rx, TypingConfig::instant());

        let events = drain(&mut session).await;

        assert_eq!(
            events.last(),
            Some(&SessionEvent::Failed {
                error: ChatError::Application("overloaded".to_string())
            })
        );
    }

    #[tokio::test]
    async fn test_pump_eof_without_terminal_completes() {
        let rx = scripted_tokens(vec![
            StreamingToken::Opened,
            StreamingToken::Chunk("hi".to_string()),
        ]);
        let mut session = StreamSession::spawn(rx, TypingConfig::instant());

        let events = drain(&mut session).await;

        assert_eq!(
            events.last(),
            Some(&SessionEvent::Done {
                text: "hi".to_string()
            })
        );
    }

    #[tokio::test]
    async fn test_cancelled_pump_stops_revealing() {
        // A slow cadence so cancellation lands mid-reveal.
        let config = TypingConfig {
            min_delay: Duration::from_millis(20),
            max_delay: Duration::from_millis(20),
            scale: 1.0,
        };
        let rx = scripted_tokens(vec![
            StreamingToken::Opened,
            StreamingToken::Chunk("abcdefghij".to_string()),
            StreamingToken::Done,
        ]);
        let mut session = StreamSession::spawn(rx, config);

        // Let a few characters through, then cancel.
        tokio::time::sleep(Duration::from_millis(50)).await;
        session.cancel();
        tokio::time::sleep(Duration::from_millis(100)).await;

        let mut revealed = String::new();
        let mut saw_terminal = false;
        while let Some(event) = session.try_recv() {
            match event {
                SessionEvent::Delta(text) => revealed.push_str(&text),
                SessionEvent::Done { .. } | SessionEvent::Failed { .. } => saw_terminal = true,
                SessionEvent::Opened => {}
            }
        }

        // Some prefix was revealed, but the reveal never ran to
        // completion and no terminal event followed the cancel.
        assert!(!revealed.is_empty());
        assert!(revealed.len() < 10, "revealed: {revealed:?}");
        assert!("abcdefghij".starts_with(&revealed));
        assert!(!saw_terminal);
    }
}
