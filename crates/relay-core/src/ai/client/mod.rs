//! Backend client
//!
//! `ResponsesBackend` is the seam between the relay and the remote agent
//! service: one call per round, yielding a stream of raw event payloads.

pub mod config;
mod streaming;

use std::pin::Pin;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;
use serde_json::Value;

use super::error::BackendError;
use super::types::BackendInputItem;

pub use config::BackendConfig;
pub use streaming::HttpResponsesClient;

/// Raw backend events for one round, in arrival order
pub type EventStream = Pin<Box<dyn Stream<Item = Result<Value, BackendError>> + Send>>;

/// Everything needed to start one streaming round.
#[derive(Debug, Clone, PartialEq)]
pub struct ResponsesRequest {
    pub input: Vec<BackendInputItem>,
    pub agent_name: String,
    /// Transport-level extras, e.g. the image generation deployment header
    pub extra_headers: Vec<(String, String)>,
}

impl ResponsesRequest {
    pub fn new(input: Vec<BackendInputItem>, agent_name: impl Into<String>) -> Self {
        Self {
            input,
            agent_name: agent_name.into(),
            extra_headers: Vec::new(),
        }
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    /// JSON body sent to the backend
    pub fn body(&self) -> RequestBody<'_> {
        RequestBody {
            input: &self.input,
            stream: true,
            agent: AgentReference {
                name: &self.agent_name,
                kind: "agent_reference",
            },
        }
    }
}

#[derive(Debug, Serialize)]
pub struct RequestBody<'a> {
    input: &'a [BackendInputItem],
    stream: bool,
    agent: AgentReference<'a>,
}

#[derive(Debug, Serialize)]
struct AgentReference<'a> {
    name: &'a str,
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Streaming call against the agent's response endpoint.
#[async_trait]
pub trait ResponsesBackend: Send + Sync {
    /// Start one round. Errors here mean the round never started.
    async fn stream_response(&self, request: ResponsesRequest) -> Result<EventStream, BackendError>;
}
