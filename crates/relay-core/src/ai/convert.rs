//! Conversion of caller turns and approvals into backend input items

use tracing::info;

use super::types::{
    ApprovalRequest, AttachmentKind, BackendInputItem, ContentPart, ConversationTurn,
};

/// Build the first-round input from the caller's full conversation.
///
/// Preserves turn order; within a turn the text comes first, then the
/// attachments in the order they were supplied.
pub fn to_input_items(turns: &[ConversationTurn]) -> Vec<BackendInputItem> {
    turns
        .iter()
        .map(|turn| {
            let mut content = Vec::with_capacity(turn.attachments.len() + 1);

            if !turn.content.is_empty() {
                content.push(ContentPart::InputText {
                    text: turn.content.clone(),
                });
            }

            for attachment in &turn.attachments {
                match attachment.kind() {
                    AttachmentKind::Image => {
                        content.push(ContentPart::InputImage {
                            image_url: attachment.data_url(),
                            detail: "auto".to_string(),
                        });
                        info!(
                            "Added image attachment: {} ({})",
                            attachment.name, attachment.mime_type
                        );
                    }
                    AttachmentKind::GenericFile => {
                        content.push(ContentPart::InputFile {
                            file_data: attachment.data_url(),
                            filename: attachment.name.clone(),
                        });
                        info!(
                            "Added file attachment: {} ({})",
                            attachment.name, attachment.mime_type
                        );
                    }
                }
            }

            BackendInputItem::Message {
                role: turn.role,
                content,
            }
        })
        .collect()
}

/// Build the next-round input: exactly one approval per request, in order.
pub fn approval_responses(requests: &[ApprovalRequest]) -> Vec<BackendInputItem> {
    requests.iter().map(ApprovalRequest::approve).collect()
}
