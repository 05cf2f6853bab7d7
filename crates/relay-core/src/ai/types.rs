//! Wire types for backend communication
//!
//! Inbound conversation turns come from the caller; input items are what
//! each round sends to the backend.

use serde::{Deserialize, Serialize};

use crate::constants;

/// Message role in a conversation
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Assistant,
}

/// A file attached to a conversation turn.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    /// Original filename
    pub name: String,
    /// MIME type, e.g. `image/jpeg` or `application/pdf`
    #[serde(rename = "type")]
    pub mime_type: String,
    /// Base64-encoded content
    pub data: String,
}

/// How an attachment is presented to the backend.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttachmentKind {
    Image,
    GenericFile,
}

impl Attachment {
    pub fn kind(&self) -> AttachmentKind {
        if self.mime_type.starts_with("image/") {
            AttachmentKind::Image
        } else {
            AttachmentKind::GenericFile
        }
    }

    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, self.data)
    }
}

/// One caller-supplied turn of the conversation.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationTurn {
    #[serde(default)]
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
}

impl ConversationTurn {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
            attachments: Vec::new(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            attachments: Vec::new(),
        }
    }
}

/// Content part of an input message
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    InputText { text: String },
    InputImage { image_url: String, detail: String },
    InputFile { file_data: String, filename: String },
}

/// Unit sent to the backend on each round; rebuilt every round.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
#[serde(tag = "type")]
pub enum BackendInputItem {
    #[serde(rename = "message")]
    Message {
        role: Role,
        content: Vec<ContentPart>,
    },

    #[serde(rename = "mcp_approval_response")]
    ApprovalResponse {
        approval_request_id: String,
        approve: bool,
        reason: String,
    },
}

/// Tool-use confirmation the backend needs before it continues generating.
///
/// Lives for one round: observed in a backend event, consumed when the next
/// round's input is built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalRequest {
    pub id: String,
    pub tool_name: String,
    pub server_label: String,
    /// Raw argument payload, never parsed
    pub arguments: String,
}

impl ApprovalRequest {
    /// Unconditional approval for this request.
    pub fn approve(&self) -> BackendInputItem {
        BackendInputItem::ApprovalResponse {
            approval_request_id: self.id.clone(),
            approve: true,
            reason: constants::approval::AUTO_APPROVE_REASON.to_string(),
        }
    }
}
