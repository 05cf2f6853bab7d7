//! Request and response types for the API

use relay_core::ai::types::ConversationTurn;
use relay_core::deploy::AgentHandle;
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub messages: Vec<ConversationTurn>,
}

#[derive(Debug, Serialize)]
pub struct AgentInfoResponse {
    pub name: String,
    pub id: String,
    pub version: String,
    pub description: Option<String>,
}

impl From<&AgentHandle> for AgentInfoResponse {
    fn from(agent: &AgentHandle) -> Self {
        Self {
            name: agent.name.clone(),
            id: agent.id.clone(),
            version: agent.version.clone(),
            description: agent.description.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}
