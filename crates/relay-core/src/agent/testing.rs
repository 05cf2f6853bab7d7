//! Scripted in-memory backend for relay tests

use std::sync::Mutex;

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::ai::client::{EventStream, ResponsesBackend, ResponsesRequest};
use crate::ai::error::BackendError;

#[derive(Debug, Clone)]
pub(crate) enum ScriptedRound {
    /// Stream these events, then end normally
    Events(Vec<Value>),
    /// The call itself fails
    FailCall(String),
    /// Stream these events, then fail the stream
    FailMidStream(Vec<Value>, String),
    /// The backend panics while starting the round
    Panic(String),
}

type Script = Box<dyn Fn(usize) -> ScriptedRound + Send + Sync>;

/// Replays one scripted round per call and records every request it saw.
pub(crate) struct ScriptedBackend {
    script: Script,
    requests: Mutex<Vec<ResponsesRequest>>,
}

impl ScriptedBackend {
    /// Rounds past the end of the list stream nothing.
    pub fn new(rounds: Vec<ScriptedRound>) -> Self {
        Self::from_fn(move |round| {
            rounds
                .get(round)
                .cloned()
                .unwrap_or(ScriptedRound::Events(Vec::new()))
        })
    }

    /// Build each round from its zero-based index.
    pub fn from_fn<F>(script: F) -> Self
    where
        F: Fn(usize) -> ScriptedRound + Send + Sync + 'static,
    {
        Self {
            script: Box::new(script),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    pub fn requests(&self) -> Vec<ResponsesRequest> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl ResponsesBackend for ScriptedBackend {
    async fn stream_response(&self, request: ResponsesRequest) -> Result<EventStream, BackendError> {
        let round = {
            let mut requests = self.requests.lock().unwrap();
            requests.push(request);
            requests.len() - 1
        };

        let items: Vec<Result<Value, BackendError>> = match (self.script)(round) {
            ScriptedRound::Events(events) => events.into_iter().map(Ok).collect(),
            ScriptedRound::FailCall(message) => return Err(BackendError::Transport(message)),
            ScriptedRound::FailMidStream(events, message) => events
                .into_iter()
                .map(Ok)
                .chain(std::iter::once(Err(BackendError::Stream(message))))
                .collect(),
            ScriptedRound::Panic(message) => panic!("{message}"),
        };
        Ok(Box::pin(futures::stream::iter(items)))
    }
}

pub(crate) fn text_done(text: &str) -> Value {
    json!({"type": "response.output_text.done", "text": text})
}

pub(crate) fn approval_event(id: &str, tool: &str) -> Value {
    json!({
        "type": "response.output_item.done",
        "item": {
            "type": "mcp_approval_request",
            "id": id,
            "name": tool,
            "server_label": "knowledge",
            "arguments": "{}"
        }
    })
}

pub(crate) fn image_done(b64: &str) -> Value {
    json!({
        "type": "response.output_item.done",
        "item": {"type": "image_generation_call", "result": b64}
    })
}

pub(crate) fn completed(output: Vec<Value>) -> Value {
    json!({"type": "response.completed", "response": {"output": output}})
}
