//! Approval loop: the state machine behind one chat request.
//!
//! ```text
//!              approvals, round < max
//!   ┌─────────┐ ─────────────────► ┌───────────────────┐
//!   │ Calling │                    │ AwaitingApprovals │
//!   └─────────┘ ◄───────────────── └───────────────────┘
//!     │  │  │    approval input
//!     │  │  └── no approvals ──────► Done
//!     │  └───── approvals, round == max ► Aborted
//!     └──────── caller gone ───────► Cancelled
//! ```
//!
//! Each round's input replaces the previous one entirely: the first round
//! sends the converted conversation, later rounds send only approvals.

use tracing::{info, warn};

use crate::ai::client::{ResponsesBackend, ResponsesRequest};
use crate::ai::convert;
use crate::ai::error::BackendError;
use crate::ai::types::{ApprovalRequest, BackendInputItem};
use crate::constants;

use super::output::AccumulatedOutput;
use super::stream::{process_round, RelaySink};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    Calling,
    AwaitingApprovals,
    /// A round finished without approval requests
    Done,
    /// Round ceiling reached with approvals still pending
    Aborted,
    /// The caller disconnected
    Cancelled,
}

impl LoopState {
    pub fn is_terminal(self) -> bool {
        matches!(self, Self::Done | Self::Aborted | Self::Cancelled)
    }
}

/// How a loop ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoopOutcome {
    pub state: LoopState,
    /// Backend calls issued
    pub rounds: usize,
    pub approvals_granted: usize,
}

pub struct ApprovalLoop<'a> {
    backend: &'a dyn ResponsesBackend,
    agent_name: &'a str,
    extra_headers: &'a [(String, String)],
    max_rounds: usize,
}

impl<'a> ApprovalLoop<'a> {
    pub fn new(backend: &'a dyn ResponsesBackend, agent_name: &'a str) -> Self {
        Self {
            backend,
            agent_name,
            extra_headers: &[],
            max_rounds: constants::approval::MAX_APPROVAL_ROUNDS,
        }
    }

    pub fn with_extra_headers(mut self, headers: &'a [(String, String)]) -> Self {
        self.extra_headers = headers;
        self
    }

    pub fn with_max_rounds(mut self, max_rounds: usize) -> Self {
        self.max_rounds = max_rounds.max(1);
        self
    }

    fn request(&self, input: Vec<BackendInputItem>) -> ResponsesRequest {
        let mut request = ResponsesRequest::new(input, self.agent_name);
        request.extra_headers = self.extra_headers.to_vec();
        request
    }

    /// Run rounds until a terminal state.
    ///
    /// A failed call or stream ends the loop with `Err`; output accumulated
    /// up to that point stays in `output`.
    pub async fn drive(
        &self,
        initial_input: Vec<BackendInputItem>,
        output: &mut AccumulatedOutput,
        sink: &mut RelaySink,
    ) -> Result<LoopOutcome, BackendError> {
        let mut input = initial_input;
        let mut pending: Vec<ApprovalRequest> = Vec::new();
        let mut state = LoopState::Calling;
        let mut rounds = 0usize;
        let mut approvals_granted = 0usize;

        while !state.is_terminal() {
            state = match state {
                LoopState::Calling => {
                    if sink.is_closed() {
                        LoopState::Cancelled
                    } else {
                        rounds += 1;
                        info!(round = rounds, agent = %self.agent_name, "Sending request to agent");
                        let events = self
                            .backend
                            .stream_response(self.request(std::mem::take(&mut input)))
                            .await?;
                        let result = process_round(events, output, sink, rounds).await?;

                        if result.cancelled {
                            LoopState::Cancelled
                        } else if result.approvals.is_empty() {
                            LoopState::Done
                        } else if rounds >= self.max_rounds {
                            warn!(
                                round = rounds,
                                pending = result.approvals.len(),
                                "Reached maximum approval rounds ({})",
                                self.max_rounds
                            );
                            LoopState::Aborted
                        } else {
                            pending = result.approvals;
                            LoopState::AwaitingApprovals
                        }
                    }
                }
                LoopState::AwaitingApprovals => {
                    info!(
                        round = rounds,
                        "Auto-approving {} MCP tool request(s)",
                        pending.len()
                    );
                    input = convert::approval_responses(&pending);
                    approvals_granted += pending.len();
                    pending.clear();
                    LoopState::Calling
                }
                terminal => terminal,
            };
        }

        Ok(LoopOutcome {
            state,
            rounds,
            approvals_granted,
        })
    }
}
