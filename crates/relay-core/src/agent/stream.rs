//! Stream processing for one backend round.
//!
//! Consumes the round's raw events and:
//! - Normalizes each one and folds it into the request's `AccumulatedOutput`
//! - Collects the approval requests the round raised
//! - Forwards newly appended text when the sink runs in incremental mode

use futures::StreamExt;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ai::client::EventStream;
use crate::ai::error::BackendError;
use crate::ai::parsers::{normalize, NormalizedEvent, OutputItem};
use crate::ai::types::ApprovalRequest;

use super::events::{RelayEvent, StreamMode};
use super::output::AccumulatedOutput;

/// Caller-facing side of a request: the event channel plus the incremental
/// forwarding cursor.
#[derive(Debug)]
pub struct RelaySink {
    tx: mpsc::Sender<RelayEvent>,
    mode: StreamMode,
    forwarded_upto: usize,
}

impl RelaySink {
    pub fn new(tx: mpsc::Sender<RelayEvent>, mode: StreamMode) -> Self {
        Self {
            tx,
            mode,
            forwarded_upto: 0,
        }
    }

    /// Whether the caller has gone away.
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }

    /// Returns false once the receiver is gone.
    pub async fn send(&self, event: RelayEvent) -> bool {
        self.tx.send(event).await.is_ok()
    }

    /// Forward text appended since the last call. No-op in buffered mode.
    pub async fn forward_new_text(&mut self, output: &AccumulatedOutput) -> bool {
        if self.mode != StreamMode::Incremental {
            return true;
        }
        let text = output.text();
        if text.len() <= self.forwarded_upto {
            return true;
        }
        // The buffer is append-only, so the cursor always sits on a char boundary
        let chunk = text[self.forwarded_upto..].to_string();
        self.forwarded_upto = text.len();
        self.send(RelayEvent::Message { content: chunk }).await
    }
}

/// What a round left behind once its stream ended.
#[derive(Debug, Default)]
pub(crate) struct RoundResult {
    pub approvals: Vec<ApprovalRequest>,
    pub response_id: Option<String>,
    /// The caller disconnected mid-round
    pub cancelled: bool,
}

/// Drain one round's event stream into `output`.
///
/// Returns early, with `cancelled` set, when the caller disconnects; the
/// backend stream is dropped with the returned future.
pub(crate) async fn process_round(
    mut events: EventStream,
    output: &mut AccumulatedOutput,
    sink: &mut RelaySink,
    round: usize,
) -> Result<RoundResult, BackendError> {
    let mut result = RoundResult::default();

    while let Some(raw) = events.next().await {
        if sink.is_closed() {
            result.cancelled = true;
            break;
        }

        match normalize(&raw?)? {
            NormalizedEvent::Started { response_id } => {
                debug!(round, response_id = ?response_id, "Response started");
                result.response_id = response_id;
            }
            NormalizedEvent::TextChunk(_) => {}
            NormalizedEvent::TextDone { text } => output.push_text_done(&text),
            NormalizedEvent::PartialImage { .. } => output.record_partial_image(),
            NormalizedEvent::ItemDone(item) => {
                apply_item(item, output, &mut result.approvals, round);
            }
            NormalizedEvent::Completed { output: items } => {
                for item in items {
                    catch_up_item(item, output, &mut result.approvals, round);
                }
            }
            NormalizedEvent::Unknown => {}
        }

        if !sink.forward_new_text(output).await {
            result.cancelled = true;
            break;
        }
    }

    Ok(result)
}

fn collect_approval(
    request: ApprovalRequest,
    output: &mut AccumulatedOutput,
    approvals: &mut Vec<ApprovalRequest>,
    round: usize,
) {
    if request.id.is_empty() {
        warn!(round, tool = %request.tool_name, "Approval request without id ignored");
        return;
    }
    if approvals.iter().any(|seen| seen.id == request.id) {
        debug!(round, approval_id = %request.id, "Duplicate approval request ignored");
        return;
    }

    info!(
        round,
        approval_id = %request.id,
        tool = %request.tool_name,
        server = %request.server_label,
        "MCP approval request collected"
    );
    output.push_tool_notice(&request.tool_name);
    approvals.push(request);
}

fn apply_item(
    item: OutputItem,
    output: &mut AccumulatedOutput,
    approvals: &mut Vec<ApprovalRequest>,
    round: usize,
) {
    match item {
        OutputItem::ApprovalRequest(request) => collect_approval(request, output, approvals, round),
        OutputItem::ToolListing => info!(round, "MCP tools list received"),
        OutputItem::ImageResult { b64 } => {
            output.push_image(&b64);
        }
        OutputItem::MessageResult { texts } => {
            output.push_message_texts(&texts);
        }
        OutputItem::Other => {}
    }
}

/// Completed listings only fill gaps the item-done path left.
fn catch_up_item(
    item: OutputItem,
    output: &mut AccumulatedOutput,
    approvals: &mut Vec<ApprovalRequest>,
    round: usize,
) {
    match item {
        OutputItem::ApprovalRequest(request) => collect_approval(request, output, approvals, round),
        OutputItem::ImageResult { b64 } => {
            output.catch_up_image(&b64);
        }
        OutputItem::MessageResult { texts } => {
            if output.push_message_texts(&texts) {
                debug!(round, "Message text recovered from completed response");
            }
        }
        OutputItem::ToolListing | OutputItem::Other => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::{json, Value};

    fn stream_of(events: Vec<Value>) -> EventStream {
        Box::pin(futures::stream::iter(events.into_iter().map(Ok)))
    }

    #[tokio::test]
    async fn collects_approvals_once_per_id() {
        let (tx, _rx) = mpsc::channel(8);
        let mut sink = RelaySink::new(tx, StreamMode::Buffered);
        let mut output = AccumulatedOutput::new();

        let approval = json!({
            "type": "mcp_approval_request", "id": "a1", "name": "search",
            "server_label": "kb", "arguments": "{}"
        });
        let events = stream_of(vec![
            json!({"type": "response.created", "response": {"id": "resp_1"}}),
            json!({"type": "response.output_item.done", "item": approval.clone()}),
            json!({"type": "response.completed", "response": {"output": [approval]}}),
        ]);

        let result = process_round(events, &mut output, &mut sink, 1).await.unwrap();
        assert_eq!(result.approvals.len(), 1);
        assert_eq!(result.response_id.as_deref(), Some("resp_1"));
        assert!(!result.cancelled);
        assert_eq!(output.text().matches("Using tool: search").count(), 1);
    }

    #[tokio::test]
    async fn message_result_fills_missing_text() {
        let (tx, _rx) = mpsc::channel(8);
        let mut sink = RelaySink::new(tx, StreamMode::Buffered);
        let mut output = AccumulatedOutput::new();

        let events = stream_of(vec![
            json!({"type": "response.output_text.done", "text": "Part one."}),
            json!({"type": "response.completed", "response": {"output": [
                {"type": "message", "role": "assistant", "content": [
                    {"type": "output_text", "text": "Part one."},
                    {"type": "output_text", "text": " Part two."}
                ]}
            ]}}),
        ]);

        process_round(events, &mut output, &mut sink, 1).await.unwrap();
        assert_eq!(output.text(), "Part one. Part two.");
    }

    #[tokio::test]
    async fn error_frame_fails_the_round() {
        let (tx, _rx) = mpsc::channel(8);
        let mut sink = RelaySink::new(tx, StreamMode::Buffered);
        let mut output = AccumulatedOutput::new();

        let events = stream_of(vec![
            json!({"type": "response.output_text.done", "text": "partial"}),
            json!({"type": "error", "error": {"message": "rate limited"}}),
        ]);

        let err = process_round(events, &mut output, &mut sink, 1).await.unwrap_err();
        assert!(err.to_string().contains("rate limited"));
    }

    #[tokio::test]
    async fn stops_when_caller_disconnects() {
        let (tx, rx) = mpsc::channel(8);
        drop(rx);
        let mut sink = RelaySink::new(tx, StreamMode::Buffered);
        let mut output = AccumulatedOutput::new();

        let events = stream_of(vec![json!({"type": "response.output_text.done", "text": "x"})]);
        let result = process_round(events, &mut output, &mut sink, 1).await.unwrap();
        assert!(result.cancelled);
        assert!(output.is_empty());
    }

    #[tokio::test]
    async fn incremental_sink_forwards_only_new_text() {
        let (tx, mut rx) = mpsc::channel(8);
        let mut sink = RelaySink::new(tx, StreamMode::Incremental);
        let mut output = AccumulatedOutput::new();

        output.push_text_done("Hello");
        assert!(sink.forward_new_text(&output).await);
        assert!(sink.forward_new_text(&output).await);
        output.push_text_done(", world");
        assert!(sink.forward_new_text(&output).await);

        assert_eq!(
            rx.recv().await,
            Some(RelayEvent::Message {
                content: "Hello".to_string()
            })
        );
        assert_eq!(
            rx.recv().await,
            Some(RelayEvent::Message {
                content: ", world".to_string()
            })
        );
        assert!(rx.try_recv().is_err());
    }
}
