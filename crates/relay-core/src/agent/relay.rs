//! Chat relay: the entry point for one chat request.
//!
//! `ChatRelay` is cheap to clone and shared across requests. Each call to
//! `run()` spawns an independent task that owns its own output buffer and
//! round counter, and reports through the returned receiver.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{error, info};

use crate::ai::client::ResponsesBackend;
use crate::ai::convert;
use crate::ai::error::BackendError;
use crate::ai::types::ConversationTurn;
use crate::constants;

use super::events::{RelayEvent, StreamMode};
use super::orchestrator::{ApprovalLoop, LoopOutcome, LoopState};
use super::output::AccumulatedOutput;
use super::stream::RelaySink;

#[derive(Clone)]
pub struct ChatRelay {
    backend: Arc<dyn ResponsesBackend>,
    agent_name: String,
    image_generation_deployment: Option<String>,
    mode: StreamMode,
    max_rounds: usize,
}

impl ChatRelay {
    pub fn new(backend: Arc<dyn ResponsesBackend>, agent_name: impl Into<String>) -> Self {
        Self {
            backend,
            agent_name: agent_name.into(),
            image_generation_deployment: None,
            mode: StreamMode::default(),
            max_rounds: constants::approval::MAX_APPROVAL_ROUNDS,
        }
    }

    pub fn with_image_generation_deployment(mut self, deployment: Option<String>) -> Self {
        self.image_generation_deployment = deployment.filter(|d| !d.is_empty());
        self
    }

    pub fn with_stream_mode(mut self, mode: StreamMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds;
        self
    }

    pub fn agent_name(&self) -> &str {
        &self.agent_name
    }

    pub fn stream_mode(&self) -> StreamMode {
        self.mode
    }

    fn extra_headers(&self) -> Vec<(String, String)> {
        self.image_generation_deployment
            .iter()
            .map(|deployment| {
                (
                    constants::backend::IMAGE_GENERATION_HEADER.to_string(),
                    deployment.clone(),
                )
            })
            .collect()
    }

    /// Start relaying a conversation.
    ///
    /// The returned receiver yields this request's events and always ends
    /// with `StreamEnd`, even if the worker task panics. Dropping it stops
    /// the worker at its next checkpoint.
    pub fn run(&self, turns: Vec<ConversationTurn>) -> mpsc::Receiver<RelayEvent> {
        let (tx, rx) = mpsc::channel(constants::relay::EVENT_CHANNEL_BUFFER);
        let relay = self.clone();

        tokio::spawn(async move {
            let worker_tx = tx.clone();
            let worker = tokio::spawn(async move { relay.respond(turns, worker_tx).await });

            if let Err(e) = worker.await {
                error!("Relay task failed: {}", e);
                let _ = tx
                    .send(RelayEvent::CompletedMessage {
                        content: format!("An error occurred: {e}"),
                    })
                    .await;
                let _ = tx.send(RelayEvent::StreamEnd).await;
            }
        });

        rx
    }

    /// Relay one request to completion, writing events into `tx`.
    ///
    /// Returns the loop outcome, or `None` when a backend failure ended the
    /// request.
    pub async fn respond(
        &self,
        turns: Vec<ConversationTurn>,
        tx: mpsc::Sender<RelayEvent>,
    ) -> Option<LoopOutcome> {
        info!("Processing chat request with {} message(s)", turns.len());

        let mut output = AccumulatedOutput::new();
        let mut sink = RelaySink::new(tx, self.mode);
        let headers = self.extra_headers();
        let approval_loop = ApprovalLoop::new(self.backend.as_ref(), &self.agent_name)
            .with_extra_headers(&headers)
            .with_max_rounds(self.max_rounds);

        let result = approval_loop
            .drive(convert::to_input_items(&turns), &mut output, &mut sink)
            .await;

        let (content, outcome) = match result {
            Ok(outcome) if outcome.state == LoopState::Cancelled => {
                info!(rounds = outcome.rounds, "Client disconnected, relay stopped");
                return Some(outcome);
            }
            Ok(outcome) => {
                info!(
                    rounds = outcome.rounds,
                    approvals = outcome.approvals_granted,
                    "Response complete: {} characters",
                    output.len()
                );
                (output.finalize(), Some(outcome))
            }
            Err(e) => {
                error!("Agent chat error: {}", e);
                (user_safe_message(&e), None)
            }
        };

        sink.send(RelayEvent::CompletedMessage { content }).await;
        sink.send(RelayEvent::StreamEnd).await;
        outcome
    }
}

/// Caller-facing text for a failed request.
pub fn user_safe_message(err: &BackendError) -> String {
    if err.is_content_filtered() {
        constants::relay::CONTENT_FILTERED_MESSAGE.to_string()
    } else {
        format!("An error occurred: {err}")
    }
}
