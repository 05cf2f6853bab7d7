//! Relay server binary: configure, deploy the agent, serve.

use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use relay_core::ai::client::{BackendConfig, HttpResponsesClient};
use relay_core::deploy::{AgentDeployer, HttpAgentRegistry};
use relay_core::{ChatRelay, RelayConfig};
use relay_server::{start_server, AppState};

/// Console logging, plus a plain-text copy in `log_file` when configured.
fn init_tracing(log_file: Option<&Path>) -> anyhow::Result<()> {
    let file_layer = match log_file {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?;
            Some(fmt::layer().with_ansi(false).with_writer(Arc::new(file)))
        }
        None => None,
    };

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(tracing::Level::INFO.into()))
        .with(fmt::layer())
        .with(file_layer)
        .init();

    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = RelayConfig::load()?;
    init_tracing(config.log_file.as_deref())?;
    config.validate()?;

    tracing::info!(
        agent = %config.agent_name,
        endpoint = %config.endpoint,
        "Starting relay server"
    );

    let backend_config = BackendConfig::from_relay_config(&config);
    let registry = HttpAgentRegistry::new(backend_config.clone());
    let (agent, action) = AgentDeployer::new(&registry, &config)
        .ensure_agent()
        .await
        .context("Agent deployment failed")?;
    tracing::info!(?action, "Agent ready: {} (v{})", agent.name, agent.version);

    let backend = Arc::new(HttpResponsesClient::new(backend_config));
    let relay = ChatRelay::new(backend, agent.name.clone())
        .with_image_generation_deployment(config.image_generation_deployment.clone())
        .with_stream_mode(config.stream_mode);

    let state = AppState::new(relay, agent, config.basic_auth.clone());
    start_server(state, config.port).await
}
