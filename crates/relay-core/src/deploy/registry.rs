//! Remote agent registry
//!
//! `AgentRegistry` covers the three operations deployment needs against the
//! project: fetch an agent by name, publish a new version, and resolve a
//! named connection to its id.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::{debug, info};

use super::AgentHandle;
use crate::ai::client::BackendConfig;

/// Prompt agent definition published as a new version.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AgentDefinition {
    pub kind: &'static str,
    pub model: String,
    pub instructions: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tools: Vec<Value>,
}

impl AgentDefinition {
    pub fn prompt(
        model: impl Into<String>,
        instructions: impl Into<String>,
        tools: Vec<Value>,
    ) -> Self {
        Self {
            kind: "prompt",
            model: model.into(),
            instructions: instructions.into(),
            tools,
        }
    }
}

#[async_trait]
pub trait AgentRegistry: Send + Sync {
    /// Latest version of the named agent, or `None` when it does not exist.
    async fn get_agent(&self, name: &str) -> Result<Option<AgentHandle>>;

    async fn create_version(
        &self,
        name: &str,
        definition: &AgentDefinition,
        description: &str,
    ) -> Result<AgentHandle>;

    /// Resolve a project connection name to its id.
    async fn connection_id(&self, connection_name: &str) -> Result<String>;
}

/// `AgentRegistry` over the project's REST endpoints
#[derive(Debug, Clone)]
pub struct HttpAgentRegistry {
    http: reqwest::Client,
    config: BackendConfig,
}

impl HttpAgentRegistry {
    pub fn new(config: BackendConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            config,
        }
    }

    fn authorize(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.config.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_json(&self, path: &str) -> Result<Option<Value>> {
        let url = self.config.resource_url(path);
        debug!("GET {}", url);
        let response = self
            .authorize(self.http.get(&url))
            .send()
            .await
            .with_context(|| format!("Request to {path} failed"))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("GET {path} returned {status}: {body}");
        }
        let value = response
            .json::<Value>()
            .await
            .with_context(|| format!("Invalid JSON from {path}"))?;
        Ok(Some(value))
    }
}

#[async_trait]
impl AgentRegistry for HttpAgentRegistry {
    async fn get_agent(&self, name: &str) -> Result<Option<AgentHandle>> {
        let agent = self.get_json(&format!("agents/{name}")).await?;
        Ok(agent.map(|value| AgentHandle::from_json(&value, name)))
    }

    async fn create_version(
        &self,
        name: &str,
        definition: &AgentDefinition,
        description: &str,
    ) -> Result<AgentHandle> {
        let path = format!("agents/{name}/versions");
        let url = self.config.resource_url(&path);
        info!("Creating agent version for '{}'", name);

        let response = self
            .authorize(self.http.post(&url))
            .json(&json!({"definition": definition, "description": description}))
            .send()
            .await
            .with_context(|| format!("Request to {path} failed"))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("POST {path} returned {status}: {body}");
        }
        let value = response
            .json::<Value>()
            .await
            .with_context(|| format!("Invalid JSON from {path}"))?;
        Ok(AgentHandle::from_json(&value, name))
    }

    async fn connection_id(&self, connection_name: &str) -> Result<String> {
        let connection = self
            .get_json(&format!("connections/{connection_name}"))
            .await?
            .with_context(|| format!("Connection '{connection_name}' not found"))?;
        connection
            .get("id")
            .and_then(|id| id.as_str())
            .map(str::to_string)
            .with_context(|| format!("Connection '{connection_name}' has no id"))
    }
}
