//! Application-wide constants

pub mod approval {
    /// Hard ceiling on backend rounds per chat request.
    pub const MAX_APPROVAL_ROUNDS: usize = 10;
    pub const AUTO_APPROVE_REASON: &str = "Auto-approved by Foundry Agent Accelerator";
}

pub mod relay {
    /// Outbound events buffered per request before backpressure applies.
    pub const EVENT_CHANNEL_BUFFER: usize = 64;
    pub const CONTENT_FILTERED_MESSAGE: &str = "Content was filtered for safety reasons.";
    pub const GENERATED_IMAGE_ALT: &str = "Generated Image";
}

pub mod backend {
    pub const DEFAULT_API_VERSION: &str = "2025-11-15-preview";
    pub const IMAGE_GENERATION_HEADER: &str = "x-ms-oai-image-generation-deployment";
}

pub mod deploy {
    pub const DEFAULT_AGENT_NAME: &str = "foundry-accelerator-agent";
    pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a helpful assistant.";
    pub const AGENT_DESCRIPTION: &str = "Agent created/updated by Foundry Agent Accelerator";
    pub const CONFIG_HASH_FILE: &str = ".agent_config_hash";
    pub const AGENT_CONFIG_FILE: &str = "agent.yaml";
    pub const SYSTEM_PROMPT_FILE: &str = "prompts/system.txt";
    /// Everything after this marker in the prompt file is authoring notes.
    pub const PROMPT_SECTION_MARKER: &str = "=====";
}

pub mod server {
    pub const DEFAULT_PORT: u16 = 50505;
}
