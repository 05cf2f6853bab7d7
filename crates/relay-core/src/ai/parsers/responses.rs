//! Responses API event parser
//!
//! Raw payloads are deserialized into tagged enums whose catch-all variant
//! absorbs any event or item type this relay does not act on. Missing
//! optional fields default rather than fail.

use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::ai::error::BackendError;
use crate::ai::types::ApprovalRequest;

/// Backend event after normalization
#[derive(Debug, Clone, PartialEq)]
pub enum NormalizedEvent {
    Started { response_id: Option<String> },
    /// Incremental text delta; the relay works from `TextDone` instead
    TextChunk(String),
    TextDone { text: String },
    PartialImage { b64: String },
    ItemDone(OutputItem),
    Completed { output: Vec<OutputItem> },
    Unknown,
}

/// Finished output item, either streamed alone or listed in `Completed`
#[derive(Debug, Clone, PartialEq)]
pub enum OutputItem {
    ApprovalRequest(ApprovalRequest),
    ToolListing,
    ImageResult { b64: String },
    /// Text parts of an assistant message, in order
    MessageResult { texts: Vec<String> },
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawEvent {
    #[serde(rename = "response.created")]
    Created {
        #[serde(default)]
        response: RawResponse,
    },

    #[serde(rename = "response.output_text.delta")]
    TextDelta {
        #[serde(default)]
        delta: String,
    },

    #[serde(rename = "response.output_text.done")]
    TextDone {
        #[serde(default)]
        text: String,
    },

    #[serde(rename = "response.image_generation_call.partial_image")]
    PartialImage {
        #[serde(default)]
        partial_image_b64: Option<String>,
    },

    #[serde(rename = "response.output_item.done")]
    ItemDone {
        #[serde(default)]
        item: Value,
    },

    #[serde(rename = "response.completed")]
    Completed {
        #[serde(default)]
        response: RawResponse,
    },

    #[serde(rename = "error")]
    Error {
        #[serde(default)]
        error: Option<Value>,
        #[serde(default)]
        message: Option<String>,
    },

    #[serde(rename = "response.failed")]
    Failed {
        #[serde(default)]
        response: RawResponse,
    },

    #[serde(other)]
    Other,
}

#[derive(Debug, Default, Deserialize)]
struct RawResponse {
    #[serde(default)]
    id: Option<String>,
    #[serde(default)]
    output: Vec<Value>,
    #[serde(default)]
    error: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawItem {
    #[serde(rename = "mcp_approval_request")]
    ApprovalRequest {
        #[serde(default)]
        id: String,
        #[serde(default)]
        name: String,
        #[serde(default)]
        server_label: String,
        #[serde(default)]
        arguments: Option<Value>,
    },

    #[serde(rename = "mcp_list_tools")]
    ListTools {},

    #[serde(rename = "image_generation_call")]
    ImageGeneration {
        #[serde(default)]
        result: Option<String>,
    },

    #[serde(rename = "message")]
    Message {
        #[serde(default)]
        role: Option<String>,
        #[serde(default)]
        content: Vec<Value>,
    },

    #[serde(other)]
    Other,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "type")]
enum RawContent {
    #[serde(rename = "output_text")]
    OutputText {
        #[serde(default)]
        text: String,
    },

    #[serde(other)]
    Other,
}

/// Normalize one backend event payload.
///
/// Error frames become `Err` so the caller can treat them like a failed call.
pub fn normalize(json: &Value) -> Result<NormalizedEvent, BackendError> {
    let raw = match RawEvent::deserialize(json) {
        Ok(raw) => raw,
        Err(e) => {
            if let Some(error) = json.get("error") {
                return Err(BackendError::Remote(error_message(error)));
            }
            debug!("Unrecognized backend event shape: {}", e);
            return Ok(NormalizedEvent::Unknown);
        }
    };

    let event = match raw {
        RawEvent::Created { response } => NormalizedEvent::Started {
            response_id: response.id,
        },
        RawEvent::TextDelta { delta } => NormalizedEvent::TextChunk(delta),
        RawEvent::TextDone { text } => NormalizedEvent::TextDone { text },
        RawEvent::PartialImage { partial_image_b64 } => {
            match partial_image_b64.filter(|b64| !b64.is_empty()) {
                Some(b64) => NormalizedEvent::PartialImage { b64 },
                None => NormalizedEvent::Unknown,
            }
        }
        RawEvent::ItemDone { item } => NormalizedEvent::ItemDone(parse_output_item(&item)),
        RawEvent::Completed { response } => NormalizedEvent::Completed {
            output: response.output.iter().map(parse_output_item).collect(),
        },
        RawEvent::Error { error, message } => {
            let text = error
                .as_ref()
                .map(error_message)
                .or(message)
                .unwrap_or_else(|| "Unknown error".to_string());
            return Err(BackendError::Remote(text));
        }
        RawEvent::Failed { response } => {
            let text = response
                .error
                .as_ref()
                .map(error_message)
                .unwrap_or_else(|| "Response failed".to_string());
            return Err(BackendError::Remote(text));
        }
        RawEvent::Other => {
            if let Some(event_type) = json.get("type").and_then(|t| t.as_str()) {
                debug!("Ignoring backend event: {}", event_type);
            }
            NormalizedEvent::Unknown
        }
    };

    Ok(event)
}

/// Render an error object as `code: message`, keeping both when present.
fn error_message(error: &Value) -> String {
    if let Some(text) = error.as_str() {
        return text.to_string();
    }
    let message = error
        .get("message")
        .and_then(|m| m.as_str())
        .unwrap_or("Unknown error");
    match error.get("code").and_then(|c| c.as_str()) {
        Some(code) if !code.is_empty() => format!("{code}: {message}"),
        _ => message.to_string(),
    }
}

fn parse_output_item(item: &Value) -> OutputItem {
    let Ok(raw) = RawItem::deserialize(item) else {
        return OutputItem::Other;
    };

    match raw {
        RawItem::ApprovalRequest {
            id,
            name,
            server_label,
            arguments,
        } => OutputItem::ApprovalRequest(ApprovalRequest {
            id,
            tool_name: name,
            server_label,
            arguments: match arguments {
                Some(Value::String(raw)) => raw,
                Some(Value::Null) | None => String::new(),
                Some(other) => other.to_string(),
            },
        }),
        RawItem::ListTools {} => OutputItem::ToolListing,
        RawItem::ImageGeneration { result } => match result.filter(|r| !r.is_empty()) {
            Some(b64) => OutputItem::ImageResult { b64 },
            None => OutputItem::Other,
        },
        RawItem::Message { role, content } => {
            if role.as_deref().is_some_and(|role| role != "assistant") {
                return OutputItem::Other;
            }
            let texts = content
                .iter()
                .filter_map(|part| match RawContent::deserialize(part) {
                    Ok(RawContent::OutputText { text }) => Some(text),
                    _ => None,
                })
                .collect();
            OutputItem::MessageResult { texts }
        }
        RawItem::Other => OutputItem::Other,
    }
}
