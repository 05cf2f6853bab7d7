//! Backend client configuration

use crate::config::RelayConfig;

/// Connection settings for the agent service
#[derive(Debug, Clone)]
pub struct BackendConfig {
    /// Project endpoint, without trailing slash
    pub endpoint: String,
    pub api_version: String,
    /// Bearer token; omitted from requests when absent
    pub access_token: Option<String>,
}

impl BackendConfig {
    pub fn new(endpoint: impl Into<String>, api_version: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into().trim_end_matches('/').to_string(),
            api_version: api_version.into(),
            access_token: None,
        }
    }

    pub fn with_access_token(mut self, token: Option<String>) -> Self {
        self.access_token = token;
        self
    }

    pub fn from_relay_config(config: &RelayConfig) -> Self {
        Self::new(&config.endpoint, &config.api_version)
            .with_access_token(config.access_token.clone())
    }

    /// URL of the streaming response endpoint
    pub fn responses_url(&self) -> String {
        format!(
            "{}/openai/responses?api-version={}",
            self.endpoint, self.api_version
        )
    }

    /// URL of an agent-service resource path, e.g. `agents/foo`
    pub fn resource_url(&self, path: &str) -> String {
        format!(
            "{}/{}?api-version={}",
            self.endpoint,
            path.trim_start_matches('/'),
            self.api_version
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_urls_without_double_slashes() {
        let config = BackendConfig::new("https://host/api/projects/p/", "2025-11-15-preview");
        assert_eq!(
            config.responses_url(),
            "https://host/api/projects/p/openai/responses?api-version=2025-11-15-preview"
        );
        assert_eq!(
            config.resource_url("/agents/demo"),
            "https://host/api/projects/p/agents/demo?api-version=2025-11-15-preview"
        );
    }
}
