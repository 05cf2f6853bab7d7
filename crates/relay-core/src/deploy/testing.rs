//! In-memory registry for deployment tests

use std::collections::HashMap;
use std::sync::Mutex;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use super::registry::{AgentDefinition, AgentRegistry};
use super::AgentHandle;

#[derive(Default)]
pub(crate) struct MockRegistry {
    agents: Mutex<HashMap<String, AgentHandle>>,
    connections: HashMap<String, String>,
    created: Mutex<Vec<AgentDefinition>>,
}

impl MockRegistry {
    pub fn with_agent(self, agent: AgentHandle) -> Self {
        self.agents.lock().unwrap().insert(agent.name.clone(), agent);
        self
    }

    pub fn with_connection(mut self, name: &str, id: &str) -> Self {
        self.connections.insert(name.to_string(), id.to_string());
        self
    }

    pub fn created(&self) -> Vec<AgentDefinition> {
        self.created.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentRegistry for MockRegistry {
    async fn get_agent(&self, name: &str) -> Result<Option<AgentHandle>> {
        Ok(self.agents.lock().unwrap().get(name).cloned())
    }

    async fn create_version(
        &self,
        name: &str,
        definition: &AgentDefinition,
        description: &str,
    ) -> Result<AgentHandle> {
        let mut created = self.created.lock().unwrap();
        created.push(definition.clone());
        let version = created.len().to_string();

        let agent = AgentHandle {
            id: format!("{name}:{version}"),
            name: name.to_string(),
            version,
            description: Some(description.to_string()),
        };
        self.agents
            .lock()
            .unwrap()
            .insert(name.to_string(), agent.clone());
        Ok(agent)
    }

    async fn connection_id(&self, connection_name: &str) -> Result<String> {
        self.connections
            .get(connection_name)
            .cloned()
            .ok_or_else(|| anyhow!("connection '{connection_name}' not found"))
    }
}
