//! Per-request output accumulation
//!
//! One `AccumulatedOutput` lives for the duration of a single chat request.
//! It only ever grows; de-duplication guards keep the catch-up paths from
//! repeating what the incremental path already appended.

use serde_json::Value;
use tracing::{debug, info};

use crate::constants;
use crate::render;

/// Keys that mark a text payload as internal knowledge-retrieval JSON.
const INTERNAL_PAYLOAD_KEYS: &[&str] = &["request", "knowledgeAgentIntents"];

#[derive(Debug, Default)]
pub struct AccumulatedOutput {
    text: String,
    image_emitted: bool,
    partial_images: usize,
}

impl AccumulatedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn len(&self) -> usize {
        self.text.len()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }

    pub fn image_emitted(&self) -> bool {
        self.image_emitted
    }

    /// Append a finished text output. Empty text is ignored.
    pub fn push_text_done(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        let rendered = render_text_output(text);
        debug!(
            "Text output (buffered): {}",
            text.chars().take(100).collect::<String>()
        );
        self.text.push_str(&rendered);
    }

    pub fn push_tool_notice(&mut self, tool_name: &str) {
        self.text.push_str(&tool_notice(tool_name));
    }

    /// Partial images are counted, never rendered.
    pub fn record_partial_image(&mut self) {
        self.partial_images += 1;
        debug!("Partial image received ({} so far)", self.partial_images);
    }

    /// Append a finished image from an item-done event.
    ///
    /// Returns whether anything was appended.
    pub fn push_image(&mut self, b64: &str) -> bool {
        let appended = if self.text.contains(b64) {
            false
        } else {
            self.text.push_str(&image_markup(b64));
            info!("Image generation completed (buffered)");
            true
        };
        self.image_emitted = true;
        appended
    }

    /// Catch-up for an image seen only in the completed listing.
    pub fn catch_up_image(&mut self, b64: &str) -> bool {
        if self.image_emitted || self.text.contains(b64) {
            return false;
        }
        self.text.push_str(&image_markup(b64));
        self.image_emitted = true;
        info!("Image from completed response (buffered)");
        true
    }

    /// Append message text parts not already present.
    ///
    /// A part counts as present when either its raw or its rendered form is
    /// already a substring of the accumulated text.
    pub fn push_message_texts(&mut self, texts: &[String]) -> bool {
        let mut appended = false;
        for text in texts {
            if text.trim().is_empty() || self.text.contains(text.as_str()) {
                continue;
            }
            let rendered = render_text_output(text);
            if self.text.contains(rendered.as_str()) {
                continue;
            }
            self.text.push_str(&rendered);
            appended = true;
        }
        appended
    }

    /// Post-process the accumulated text for display.
    pub fn finalize(&self) -> String {
        render::post_process(&self.text)
    }
}

/// Replace internal retrieval JSON with a readable banner; other text passes
/// through as-is.
pub fn render_text_output(text: &str) -> String {
    let trimmed = text.trim();
    if !(trimmed.starts_with('{') && trimmed.ends_with('}')) {
        return text.to_string();
    }

    let Ok(Value::Object(map)) = serde_json::from_str::<Value>(trimmed) else {
        return text.to_string();
    };
    if !INTERNAL_PAYLOAD_KEYS.iter().any(|key| map.contains_key(*key)) {
        return text.to_string();
    }

    let pretty = match serde_json::to_string_pretty(&Value::Object(map)) {
        Ok(pretty) => pretty,
        Err(_) => return text.to_string(),
    };
    info!("Formatted knowledge base query JSON for display");
    format!("\n\n> 🔍 **Querying knowledge base...**\n\n```json\n{pretty}\n```\n\n---\n\n")
}

pub fn tool_notice(tool_name: &str) -> String {
    format!("\n\n🔧 *Using tool: {tool_name}...*\n\n")
}

pub fn image_markup(b64: &str) -> String {
    format!(
        "\n\n<img src=\"data:image/png;base64,{b64}\" alt=\"{}\" \
         style=\"max-width: 100%; border-radius: 8px; margin: 16px 0;\" />\n\n",
        constants::relay::GENERATED_IMAGE_ALT
    )
}
