//! Outbound event protocol
//!
//! `RelayEvent` is everything a chat request emits to its caller. Transport
//! layers serialize each event as one JSON object with a `type` field.

use serde::Serialize;

/// Events emitted by a chat relay.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RelayEvent {
    /// Incremental text, only in incremental mode.
    Message { content: String },

    /// Final full text, post-processed.
    CompletedMessage { content: String },

    /// Terminal marker; always the last event of a request.
    StreamEnd,
}

impl RelayEvent {
    pub fn is_terminal(&self) -> bool {
        matches!(self, RelayEvent::StreamEnd)
    }
}

/// How accumulated text reaches the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StreamMode {
    /// Everything is held back until the final `completed_message`.
    #[default]
    Buffered,
    /// Each appended chunk is also forwarded as a `message` event.
    Incremental,
}

impl StreamMode {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "incremental" => Self::Incremental,
            _ => Self::Buffered,
        }
    }
}
