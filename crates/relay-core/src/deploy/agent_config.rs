//! Local agent definition files
//!
//! `agent.yaml` holds the tool configuration, `prompts/system.txt` the
//! instructions. Both are optional: a missing or broken file degrades to
//! defaults with a warning.

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Map, Value};
use tracing::{error, info, warn};

use super::registry::AgentRegistry;
use crate::constants;

/// Parsed `agent.yaml`
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentFileConfig {
    /// Raw `tools` mapping, hashed as-is into the fingerprint
    pub tools: Value,
}

#[derive(Debug, Deserialize)]
struct RawAgentFile {
    #[serde(default)]
    tools: Option<Value>,
}

impl AgentFileConfig {
    /// Load `agent.yaml` from `dir`.
    pub fn load(dir: &Path) -> Self {
        let path = dir.join(constants::deploy::AGENT_CONFIG_FILE);
        let content = match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Self::empty(),
            Err(e) => {
                warn!("Could not load {}: {}", path.display(), e);
                return Self::empty();
            }
        };
        Self::parse(&content).unwrap_or_else(|e| {
            warn!("Could not parse {}: {}", path.display(), e);
            Self::empty()
        })
    }

    pub fn parse(content: &str) -> Result<Self, serde_yaml::Error> {
        if content.trim().is_empty() {
            return Ok(Self::empty());
        }
        let raw: Option<RawAgentFile> = serde_yaml::from_str(content)?;
        let tools = raw
            .and_then(|raw| raw.tools)
            .filter(|tools| tools.is_object())
            .unwrap_or_else(|| Value::Object(Map::new()));
        Ok(Self { tools })
    }

    pub fn empty() -> Self {
        Self {
            tools: Value::Object(Map::new()),
        }
    }

    /// Names of tool sections with `enabled: true`, in key order.
    pub fn enabled_tools(&self) -> Vec<String> {
        self.tools
            .as_object()
            .map(|sections| {
                sections
                    .iter()
                    .filter(|(_, section)| section.get("enabled") == Some(&Value::Bool(true)))
                    .map(|(name, _)| name.clone())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Typed view of one enabled section. Disabled, absent or malformed
    /// sections yield `None`.
    fn section<T: DeserializeOwned>(&self, name: &str) -> Option<T> {
        let raw = self.tools.get(name)?;
        if raw.get("enabled") != Some(&Value::Bool(true)) {
            return None;
        }
        match serde_json::from_value(raw.clone()) {
            Ok(section) => Some(section),
            Err(e) => {
                warn!("Ignoring malformed '{}' tool section: {}", name, e);
                None
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct EnabledSection {}

#[derive(Debug, Deserialize)]
struct BingSearchSection {
    #[serde(default)]
    connection_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FileSearchSection {
    #[serde(default)]
    vector_store_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AzureAiSearchSection {
    #[serde(default)]
    connection_name: Option<String>,
    #[serde(default)]
    index_name: Option<String>,
}

#[derive(Debug, Deserialize)]
struct McpSection {
    #[serde(default)]
    server_label: Option<String>,
    #[serde(default)]
    server_url: Option<String>,
    #[serde(default = "default_require_approval")]
    require_approval: String,
    #[serde(default)]
    allowed_tools: Option<Vec<String>>,
}

fn default_require_approval() -> String {
    "always".to_string()
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Build remote tool definitions for the enabled sections.
///
/// Sections missing required fields, or whose connection cannot be
/// resolved, are skipped with a warning.
pub async fn build_tool_definitions(
    config: &AgentFileConfig,
    registry: &dyn AgentRegistry,
) -> Vec<Value> {
    let mut tools = Vec::new();

    if config.section::<EnabledSection>("code_interpreter").is_some() {
        info!("Enabling Code Interpreter");
        tools.push(json!({"type": "code_interpreter", "container": {"type": "auto"}}));
    }

    if let Some(section) = config.section::<BingSearchSection>("bing_search") {
        match non_empty(section.connection_name) {
            Some(connection_name) => match registry.connection_id(&connection_name).await {
                Ok(connection_id) => {
                    info!("Enabling Bing Search (connection: {})", connection_name);
                    tools.push(json!({
                        "type": "bing_grounding",
                        "bing_grounding": {
                            "search_configurations": [{"project_connection_id": connection_id}]
                        }
                    }));
                }
                Err(e) => warn!("Could not enable Bing Search: {:#}", e),
            },
            None => warn!("Bing Search enabled but no connection_name specified"),
        }
    }

    if let Some(section) = config.section::<FileSearchSection>("file_search") {
        match non_empty(section.vector_store_name) {
            Some(vector_store) => {
                info!("Enabling File Search (vector store: {})", vector_store);
                tools.push(json!({"type": "file_search", "vector_store_ids": [vector_store]}));
            }
            None => warn!("File Search enabled but no vector_store_name specified"),
        }
    }

    if let Some(section) = config.section::<AzureAiSearchSection>("azure_ai_search") {
        match (non_empty(section.connection_name), non_empty(section.index_name)) {
            (Some(connection_name), Some(index_name)) => {
                match registry.connection_id(&connection_name).await {
                    Ok(connection_id) => {
                        info!("Enabling Azure AI Search (index: {})", index_name);
                        tools.push(json!({
                            "type": "azure_ai_search",
                            "azure_ai_search": {
                                "indexes": [{
                                    "project_connection_id": connection_id,
                                    "index_name": index_name
                                }]
                            }
                        }));
                    }
                    Err(e) => warn!("Could not enable Azure AI Search: {:#}", e),
                }
            }
            _ => warn!("Azure AI Search enabled but missing connection_name or index_name"),
        }
    }

    if config.section::<EnabledSection>("image_generation").is_some() {
        info!("Enabling Image Generation");
        tools.push(json!({"type": "image_generation"}));
    }

    if let Some(section) = config.section::<McpSection>("mcp") {
        match (non_empty(section.server_label), non_empty(section.server_url)) {
            (Some(server_label), Some(server_url)) => {
                info!("Enabling MCP server '{}' ({})", server_label, server_url);
                let mut tool = json!({
                    "type": "mcp",
                    "server_label": server_label,
                    "server_url": server_url,
                    "require_approval": section.require_approval,
                });
                if let Some(allowed) = section.allowed_tools {
                    tool["allowed_tools"] = json!(allowed);
                }
                tools.push(tool);
            }
            _ => warn!("MCP enabled but missing server_label or server_url"),
        }
    }

    tools
}

/// Load the agent instructions from `prompts/system.txt` under `dir`.
///
/// Only the text before the first `=====` marker is used.
pub fn load_system_prompt(dir: &Path) -> String {
    let path = dir.join(constants::deploy::SYSTEM_PROMPT_FILE);
    match std::fs::read_to_string(&path) {
        Ok(content) => extract_prompt(&content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            warn!("System prompt file not found at {}", path.display());
            constants::deploy::DEFAULT_SYSTEM_PROMPT.to_string()
        }
        Err(e) => {
            error!("Error reading system prompt: {}", e);
            constants::deploy::DEFAULT_SYSTEM_PROMPT.to_string()
        }
    }
}

fn extract_prompt(content: &str) -> String {
    let prompt = content
        .split(constants::deploy::PROMPT_SECTION_MARKER)
        .next()
        .unwrap_or("")
        .trim();
    if prompt.is_empty() {
        constants::deploy::DEFAULT_SYSTEM_PROMPT.to_string()
    } else {
        prompt.to_string()
    }
}
