//! SSE Line Decoding
//!
//! Turns the raw byte stream of a `text/event-stream`-like response into
//! classified frames. Two stages:
//!
//! 1. [`LineSplitter`]: raw byte chunks (split at arbitrary boundaries
//!    by the network) -> complete newline-delimited lines. Partial lines
//!    are buffered until their newline arrives in a later chunk.
//! 2. [`parse_line`]: one line -> [`SseFrame`] (comment, data payload,
//!    or malformed).
//!
//! The wire format is dictated by the chat API: each meaningful line is
//! `data: <JSON>` where the JSON is one of `{"chunk": string}`,
//! `{"done": true}` or `{"error": string}`. Lines starting with `:` are
//! protocol comments (the server opens every stream with `: connected`).

use serde_json::Value;

/// Accumulates raw byte chunks and yields complete lines.
///
/// Bytes are decoded as UTF-8 with lossy replacement, matching how the
/// rest of the pipeline treats the stream as text. A line fragment left
/// over after the last `\n` stays buffered for the next chunk.
#[derive(Debug, Default)]
pub struct LineSplitter {
    buffer: String,
}

impl LineSplitter {
    /// Create an empty splitter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk of bytes; returns every line completed by it.
    ///
    /// Trailing `\r` is stripped so CRLF streams parse the same as LF.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.buffer.push_str(&String::from_utf8_lossy(bytes));

        let mut lines = Vec::new();
        while let Some(pos) = self.buffer.find('\n') {
            let line = self.buffer[..pos].trim_end_matches('\r').to_string();
            self.buffer.drain(..=pos);
            lines.push(line);
        }
        lines
    }

    /// Consume the splitter, returning any unterminated final line.
    #[must_use]
    pub fn finish(self) -> Option<String> {
        if self.buffer.is_empty() {
            None
        } else {
            Some(self.buffer)
        }
    }
}

/// One classified line of the event stream.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SseFrame {
    /// `:`-prefixed comment/heartbeat line; carries no data.
    Comment,
    /// A decoded `data:` payload.
    Data(StreamFrame),
    /// A non-empty line that fits no recognized shape. Skipped by the
    /// consumer (logged, never fatal).
    Malformed,
}

/// Decoded payload of a `data:` line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StreamFrame {
    /// A fragment of assistant text.
    Chunk(String),
    /// Terminal success marker.
    Done,
    /// Terminal failure raised by the chat API.
    Error(String),
}

/// Classify one line. Returns `None` for blank separator lines.
#[must_use]
pub fn parse_line(line: &str) -> Option<SseFrame> {
    if line.is_empty() {
        return None;
    }
    if line.starts_with(':') {
        return Some(SseFrame::Comment);
    }
    let Some(payload) = line.strip_prefix("data: ") else {
        return Some(SseFrame::Malformed);
    };
    match serde_json::from_str::<Value>(payload) {
        Ok(value) => Some(classify_payload(&value)),
        Err(_) => Some(SseFrame::Malformed),
    }
}

/// Map a decoded JSON payload onto a [`StreamFrame`].
///
/// Fields are probed in order: `chunk`, then `done`, then `error`.
/// Valid JSON of an unknown shape classifies as malformed.
fn classify_payload(value: &Value) -> SseFrame {
    if let Some(chunk) = value.get("chunk").and_then(Value::as_str) {
        return SseFrame::Data(StreamFrame::Chunk(chunk.to_string()));
    }
    if value.get("done").and_then(Value::as_bool).unwrap_or(false) {
        return SseFrame::Data(StreamFrame::Done);
    }
    if let Some(error) = value.get("error").and_then(Value::as_str) {
        return SseFrame::Data(StreamFrame::Error(error.to_string()));
    }
    SseFrame::Malformed
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_splitter_whole_lines() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.push(b"data: {\"chunk\": \"hi\"}\n\n");
        assert_eq!(lines, vec!["data: {\"chunk\": \"hi\"}".to_string(), String::new()]);
        assert_eq!(splitter.finish(), None);
    }

    #[test]
    fn test_splitter_buffers_partial_line_across_chunks() {
        let mut splitter = LineSplitter::new();

        // A single frame split across three physical chunks.
        assert!(splitter.push(b"data: {\"chu").is_empty());
        assert!(splitter.push(b"nk\": \"Hel").is_empty());
        let lines = splitter.push(b"lo\"}\n");

        assert_eq!(lines, vec!["data: {\"chunk\": \"Hello\"}".to_string()]);
        assert_eq!(
            parse_line(&lines[0]),
            Some(SseFrame::Data(StreamFrame::Chunk("Hello".to_string())))
        );
    }

    #[test]
    fn test_splitter_multiple_lines_in_one_chunk() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.push(b": connected\n\ndata: {\"done\": true}\n\ntrailing");
        assert_eq!(
            lines,
            vec![
                ": connected".to_string(),
                String::new(),
                "data: {\"done\": true}".to_string(),
                String::new(),
            ]
        );
        assert_eq!(splitter.finish(), Some("trailing".to_string()));
    }

    #[test]
    fn test_splitter_strips_carriage_return() {
        let mut splitter = LineSplitter::new();
        let lines = splitter.push(b"data: {\"done\": true}\r\n");
        assert_eq!(lines, vec!["data: {\"done\": true}".to_string()]);
    }

    #[test]
    fn test_splitter_lossy_utf8() {
        let mut splitter = LineSplitter::new();
        // 0xFF is never valid UTF-8; the line still comes through.
        let lines = splitter.push(b": \xff\n");
        assert_eq!(lines.len(), 1);
        assert_eq!(parse_line(&lines[0]), Some(SseFrame::Comment));
    }

    #[test]
    fn test_parse_blank_line() {
        assert_eq!(parse_line(""), None);
    }

    #[test]
    fn test_parse_comment() {
        assert_eq!(parse_line(": connected"), Some(SseFrame::Comment));
        assert_eq!(parse_line(":heartbeat"), Some(SseFrame::Comment));
    }

    #[test]
    fn test_parse_chunk() {
        assert_eq!(
            parse_line("data: {\"chunk\": \"Hello world\"}"),
            Some(SseFrame::Data(StreamFrame::Chunk("Hello world".to_string())))
        );
    }

    #[test]
    fn test_parse_empty_chunk() {
        assert_eq!(
            parse_line("data: {\"chunk\": \"\"}"),
            Some(SseFrame::Data(StreamFrame::Chunk(String::new())))
        );
    }

    #[test]
    fn test_parse_done() {
        assert_eq!(
            parse_line("data: {\"done\": true}"),
            Some(SseFrame::Data(StreamFrame::Done))
        );
        // `done: false` is not a terminal marker.
        assert_eq!(parse_line("data: {\"done\": false}"), Some(SseFrame::Malformed));
    }

    #[test]
    fn test_parse_error_frame() {
        assert_eq!(
            parse_line("data: {\"error\": \"model overloaded\"}"),
            Some(SseFrame::Data(StreamFrame::Error("model overloaded".to_string())))
        );
    }

    #[test]
    fn test_parse_invalid_json() {
        assert_eq!(parse_line("data: {not json"), Some(SseFrame::Malformed));
    }

    #[test]
    fn test_parse_unknown_shape() {
        assert_eq!(parse_line("data: {\"other\": 1}"), Some(SseFrame::Malformed));
        assert_eq!(parse_line("event: message"), Some(SseFrame::Malformed));
    }

    #[test]
    fn test_chunk_takes_priority_over_done() {
        // A payload carrying both fields reads as a chunk.
        assert_eq!(
            parse_line("data: {\"chunk\": \"x\", \"done\": true}"),
            Some(SseFrame::Data(StreamFrame::Chunk("x".to_string())))
        );
    }
}
