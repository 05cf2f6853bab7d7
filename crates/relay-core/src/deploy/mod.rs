//! Agent deployment
//!
//! Decides at startup whether the remote agent definition can be reused or
//! needs a new version. In local mode the decision rests on the persisted
//! configuration fingerprint; in portal mode the agent is only looked up.

mod agent_config;
mod fingerprint;
mod registry;

#[cfg(test)]
pub(crate) mod testing;

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use serde::Serialize;
use serde_json::Value;
use tracing::info;

use crate::config::{ConfigSource, RelayConfig};
use crate::constants;

pub use agent_config::{build_tool_definitions, load_system_prompt, AgentFileConfig};
pub use fingerprint::{canonical_json, compute_fingerprint, FingerprintStore};
pub use registry::{AgentDefinition, AgentRegistry, HttpAgentRegistry};

/// The deployed agent the relay talks to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AgentHandle {
    pub id: String,
    pub name: String,
    pub version: String,
    pub description: Option<String>,
}

impl AgentHandle {
    /// Read a handle from a registry response, tolerating both flat version
    /// objects and agent objects that nest the latest version.
    pub fn from_json(value: &Value, fallback_name: &str) -> Self {
        let latest = value.get("versions").and_then(|v| v.get("latest"));
        let field = |key: &str| {
            value
                .get(key)
                .or_else(|| latest.and_then(|l| l.get(key)))
                .and_then(|v| match v {
                    Value::String(s) => Some(s.clone()),
                    Value::Number(n) => Some(n.to_string()),
                    _ => None,
                })
        };

        let name = field("name").unwrap_or_else(|| fallback_name.to_string());
        Self {
            id: field("id").unwrap_or_else(|| name.clone()),
            version: field("version").unwrap_or_else(|| "latest".to_string()),
            description: field("description"),
            name,
        }
    }
}

/// What `ensure_agent` did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeployAction {
    /// Fingerprint matched; the existing version was fetched
    Reused,
    /// A new version was published and the fingerprint stored
    Created,
    /// Portal-managed agent was fetched
    Portal,
}

pub struct AgentDeployer<'a> {
    registry: &'a dyn AgentRegistry,
    agent_name: String,
    model: Option<String>,
    source: ConfigSource,
    config_dir: PathBuf,
}

impl<'a> AgentDeployer<'a> {
    pub fn new(registry: &'a dyn AgentRegistry, config: &RelayConfig) -> Self {
        Self {
            registry,
            agent_name: config.agent_name.clone(),
            model: config.model.clone(),
            source: config.config_source,
            config_dir: config.config_dir.clone(),
        }
    }

    pub async fn ensure_agent(&self) -> Result<(AgentHandle, DeployAction)> {
        match self.source {
            ConfigSource::Portal => self.connect_portal().await,
            ConfigSource::Local => self.deploy_local().await,
        }
    }

    async fn connect_portal(&self) -> Result<(AgentHandle, DeployAction)> {
        info!("CONFIG MODE: PORTAL (local agent files are ignored)");
        let agent = self
            .registry
            .get_agent(&self.agent_name)
            .await
            .with_context(|| format!("Could not look up agent '{}'", self.agent_name))?;

        match agent {
            Some(agent) => {
                info!("Connected to agent: {} (v{})", agent.name, agent.version);
                Ok((agent, DeployAction::Portal))
            }
            None => bail!(
                "Agent '{}' not found. Create it in the portal first or set AGENT_CONFIG_SOURCE=local",
                self.agent_name
            ),
        }
    }

    async fn deploy_local(&self) -> Result<(AgentHandle, DeployAction)> {
        info!("CONFIG MODE: LOCAL");
        let Some(model) = self.model.as_deref() else {
            bail!("AZURE_AI_CHAT_DEPLOYMENT_NAME is required in local mode");
        };

        let instructions = load_system_prompt(&self.config_dir);
        let file_config = AgentFileConfig::load(&self.config_dir);
        let current = compute_fingerprint(
            &self.agent_name,
            model,
            &instructions,
            Some(&file_config.tools),
        );
        let store = FingerprintStore::in_dir(&self.config_dir);
        let stored = store.load();

        let enabled = file_config.enabled_tools();
        let enabled = if enabled.is_empty() {
            "None".to_string()
        } else {
            enabled.join(", ")
        };
        info!(
            agent = %self.agent_name,
            model,
            fingerprint = %&current[..16],
            tools = %enabled,
            "Agent configuration: {}...",
            instructions.chars().take(80).collect::<String>()
        );

        if stored.as_deref() == Some(current.as_str()) {
            info!("Config unchanged - using existing agent version");
            let agent = self
                .registry
                .get_agent(&self.agent_name)
                .await?
                .with_context(|| {
                    format!(
                        "Agent '{}' missing remotely although its configuration is unchanged; delete {} to redeploy",
                        self.agent_name,
                        store.path().display()
                    )
                })?;
            info!("Retrieved: {} (v{})", agent.name, agent.version);
            return Ok((agent, DeployAction::Reused));
        }

        if stored.is_some() {
            info!("Config changed - creating new agent version");
        } else {
            info!("First deployment - creating agent");
        }

        let tools = build_tool_definitions(&file_config, self.registry).await;
        let definition = AgentDefinition::prompt(model, instructions, tools);
        let agent = self
            .registry
            .create_version(&self.agent_name, &definition, constants::deploy::AGENT_DESCRIPTION)
            .await
            .context("Failed to create agent version")?;

        store.store(&current);
        info!(id = %agent.id, "New version created: {} (v{})", agent.name, agent.version);
        Ok((agent, DeployAction::Created))
    }
}
