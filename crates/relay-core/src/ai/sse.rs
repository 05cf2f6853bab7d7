//! Server-sent event decoding for backend responses
//!
//! Buffers raw bytes until a blank line closes an event block, so multi-byte
//! characters split across network chunks survive intact.

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde_json::Value;
use tracing::{debug, warn};

use super::error::BackendError;

/// Incremental decoder from byte chunks to JSON event payloads.
#[derive(Debug, Default)]
pub struct SseDecoder {
    pending: Vec<u8>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk and return every event it completes, in order.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<Value> {
        // Earlier bytes were already searched; only the tail can start a
        // terminator. Two bytes back covers a CR rewritten to LF below.
        let mut scan_from = self.pending.len().saturating_sub(2);
        for &byte in chunk {
            // CRLF collapses to LF; a lone CR is kept
            if byte == b'\n' && self.pending.last() == Some(&b'\r') {
                self.pending.pop();
            }
            self.pending.push(byte);
        }

        let mut events = Vec::new();
        while let Some(pos) = find_block_end(&self.pending, scan_from) {
            let block: Vec<u8> = self.pending.drain(..pos + 2).collect();
            scan_from = 0;
            if let Some(event) = parse_block(&block[..pos]) {
                events.push(event);
            }
        }
        events
    }

    /// Flush a trailing block that was not terminated by a blank line.
    pub fn finish(&mut self) -> Option<Value> {
        let rest = std::mem::take(&mut self.pending);
        if rest.iter().all(u8::is_ascii_whitespace) {
            return None;
        }
        parse_block(&rest)
    }
}

/// Offset of the first blank-line terminator at or after `from`.
fn find_block_end(buf: &[u8], from: usize) -> Option<usize> {
    buf.get(from..)?
        .windows(2)
        .position(|w| w == b"\n\n")
        .map(|pos| pos + from)
}

/// Parse one event block into its JSON payload.
///
/// Multiple `data:` lines are joined with newlines. When the payload carries
/// no `type` field, the `event:` name fills it in.
fn parse_block(block: &[u8]) -> Option<Value> {
    let text = String::from_utf8_lossy(block);
    let mut event_name: Option<&str> = None;
    let mut data_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event_name = Some(rest.trim());
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.strip_prefix(' ').unwrap_or(rest));
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    let data = data_lines.join("\n");
    if data.trim() == "[DONE]" {
        debug!("SSE stream signalled [DONE]");
        return None;
    }

    let mut value: Value = match serde_json::from_str(&data) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                "Skipping malformed SSE payload ({}): {}",
                e,
                data.chars().take(120).collect::<String>()
            );
            return None;
        }
    };

    if let (Some(name), Some(obj)) = (event_name, value.as_object_mut()) {
        if !obj.contains_key("type") && !name.is_empty() {
            obj.insert("type".to_string(), Value::String(name.to_string()));
        }
    }

    Some(value)
}

/// Turn a raw byte stream into a stream of decoded event payloads.
///
/// A transport failure is yielded once and ends the stream.
pub fn decode_event_stream<S, E>(
    bytes: S,
) -> impl Stream<Item = Result<Value, BackendError>> + Send + 'static
where
    S: Stream<Item = Result<Bytes, E>> + Send + Unpin + 'static,
    E: std::fmt::Display + Send + 'static,
{
    struct State<S> {
        bytes: S,
        decoder: SseDecoder,
        ready: std::collections::VecDeque<Value>,
        done: bool,
    }

    let state = State {
        bytes,
        decoder: SseDecoder::new(),
        ready: std::collections::VecDeque::new(),
        done: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(event) = state.ready.pop_front() {
                return Some((Ok(event), state));
            }
            if state.done {
                return None;
            }

            match state.bytes.next().await {
                Some(Ok(chunk)) => state.ready.extend(state.decoder.push(&chunk)),
                Some(Err(e)) => {
                    state.done = true;
                    state.ready.clear();
                    return Some((Err(BackendError::Stream(e.to_string())), state));
                }
                None => {
                    state.done = true;
                    state.ready.extend(state.decoder.finish());
                }
            }
        }
    })
}
