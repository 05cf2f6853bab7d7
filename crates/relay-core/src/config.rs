//! Relay configuration
//!
//! Loaded from environment variables once at startup. Lookup goes through a
//! closure so tests can supply values without touching the process
//! environment.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};

use crate::agent::StreamMode;
use crate::constants;

/// Where the agent definition is managed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConfigSource {
    /// Instructions and tools come from local files; redeployed on change.
    #[default]
    Local,
    /// The agent is managed in the remote portal; local files are ignored.
    Portal,
}

impl ConfigSource {
    pub fn parse(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "portal" => Self::Portal,
            _ => Self::Local,
        }
    }
}

/// Optional HTTP basic-auth credentials for the web surface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BasicAuthCredentials {
    pub username: String,
    pub password: String,
}

#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Project endpoint of the agent service
    pub endpoint: String,
    /// Name of the remote agent definition
    pub agent_name: String,
    /// Model deployment name (required in local mode)
    pub model: Option<String>,
    pub config_source: ConfigSource,
    /// Image generation deployment; enables the extra transport header
    pub image_generation_deployment: Option<String>,
    /// Bearer token for the backend
    pub access_token: Option<String>,
    pub api_version: String,
    pub basic_auth: Option<BasicAuthCredentials>,
    pub log_file: Option<PathBuf>,
    pub port: u16,
    /// Directory holding agent.yaml, prompts/ and the persisted fingerprint
    pub config_dir: PathBuf,
    pub stream_mode: StreamMode,
}

impl RelayConfig {
    /// Load configuration from the process environment.
    pub fn load() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let endpoint = get("AZURE_EXISTING_AIPROJECT_ENDPOINT")
            .context("AZURE_EXISTING_AIPROJECT_ENDPOINT not set")?;

        let basic_auth = match (get("WEB_APP_USERNAME"), get("WEB_APP_PASSWORD")) {
            (Some(username), Some(password)) => Some(BasicAuthCredentials { username, password }),
            _ => None,
        };

        let port = match get("PORT") {
            Some(raw) => raw
                .parse::<u16>()
                .with_context(|| format!("Invalid PORT '{raw}'"))?,
            None => constants::server::DEFAULT_PORT,
        };

        let config_dir = match get("RELAY_CONFIG_DIR") {
            Some(dir) => PathBuf::from(dir),
            None => std::env::current_dir().context("Failed to resolve working directory")?,
        };

        Ok(Self {
            endpoint,
            agent_name: get("AZURE_AI_AGENT_NAME")
                .unwrap_or_else(|| constants::deploy::DEFAULT_AGENT_NAME.to_string()),
            model: get("AZURE_AI_CHAT_DEPLOYMENT_NAME"),
            config_source: get("AGENT_CONFIG_SOURCE")
                .as_deref()
                .map(ConfigSource::parse)
                .unwrap_or_default(),
            image_generation_deployment: get("AZURE_AI_IMAGE_GENERATION_DEPLOYMENT"),
            access_token: get("AZURE_AI_ACCESS_TOKEN"),
            api_version: get("AZURE_AI_API_VERSION")
                .unwrap_or_else(|| constants::backend::DEFAULT_API_VERSION.to_string()),
            basic_auth,
            log_file: get("APP_LOG_FILE").map(PathBuf::from),
            port,
            config_dir,
            stream_mode: get("RELAY_STREAM_MODE")
                .as_deref()
                .map(StreamMode::parse)
                .unwrap_or_default(),
        })
    }

    pub fn validate(&self) -> Result<()> {
        if !self.endpoint.starts_with("http://") && !self.endpoint.starts_with("https://") {
            bail!(
                "Invalid AZURE_EXISTING_AIPROJECT_ENDPOINT '{}': expected http:// or https:// URL",
                self.endpoint
            );
        }

        if self.config_source == ConfigSource::Local && self.model.is_none() {
            bail!("AZURE_AI_CHAT_DEPLOYMENT_NAME is required in local mode");
        }

        Ok(())
    }
}
