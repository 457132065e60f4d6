//! Configuration schema for the companion core.

use serde::{Deserialize, Serialize};

/// Root configuration for an embedded companion instance.
///
/// Persisted configuration (key storage, settings UI) is the host
/// application's concern; this type only models the values the core needs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompanionConfig {
    /// Base persona text placed at the top of every system prompt.
    #[serde(default = "default_persona")]
    pub persona: String,
    /// Model identifier passed to the chat-completion endpoint.
    #[serde(default = "default_model")]
    pub model: String,
    /// API key for the chat-completion endpoint.
    #[serde(default)]
    pub api_key: Option<String>,
    /// Base URL of the OpenAI-compatible endpoint.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Long-term memory behavior.
    #[serde(default)]
    pub memory: MemoryConfig,
    /// Conversation loop behavior.
    #[serde(default)]
    pub orchestrator: OrchestratorConfig,
}

impl Default for CompanionConfig {
    fn default() -> Self {
        Self {
            persona: default_persona(),
            model: default_model(),
            api_key: None,
            base_url: default_base_url(),
            memory: MemoryConfig::default(),
            orchestrator: OrchestratorConfig::default(),
        }
    }
}

impl CompanionConfig {
    /// Start building a config programmatically with defaults applied.
    pub fn builder() -> CompanionConfigBuilder {
        CompanionConfigBuilder::new()
    }
}

/// Builder for assembling a `CompanionConfig` in code.
#[derive(Debug, Default, Clone)]
pub struct CompanionConfigBuilder {
    config: CompanionConfig,
}

impl CompanionConfigBuilder {
    /// Create a new builder seeded with default config values.
    pub fn new() -> Self {
        Self {
            config: CompanionConfig::default(),
        }
    }

    /// Replace the persona text.
    pub fn persona(mut self, persona: impl Into<String>) -> Self {
        self.config.persona = persona.into();
        self
    }

    /// Replace the model identifier.
    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.model = model.into();
        self
    }

    /// Set the API key.
    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.config.api_key = Some(api_key.into());
        self
    }

    /// Replace the endpoint base URL.
    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.config.base_url = base_url.into();
        self
    }

    /// Replace the memory configuration.
    pub fn memory(mut self, memory: MemoryConfig) -> Self {
        self.config.memory = memory;
        self
    }

    /// Replace the orchestrator configuration.
    pub fn orchestrator(mut self, orchestrator: OrchestratorConfig) -> Self {
        self.config.orchestrator = orchestrator;
        self
    }

    /// Finalize and return the built `CompanionConfig`.
    pub fn build(self) -> CompanionConfig {
        self.config
    }
}

/// Long-term memory behavior for the orchestrator.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryConfig {
    /// Inject relevant memories into the system prompt each turn.
    #[serde(default = "default_true")]
    pub auto_inject: bool,
    /// Maximum number of memories injected per turn.
    #[serde(default = "default_inject_limit")]
    pub inject_limit: usize,
    /// Register the built-in memory tools at construction.
    #[serde(default = "default_true")]
    pub register_builtin_tools: bool,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            auto_inject: true,
            inject_limit: default_inject_limit(),
            register_builtin_tools: true,
        }
    }
}

/// Conversation loop behavior.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Maximum complete user/assistant exchanges retained before a new turn.
    #[serde(default = "default_max_context_messages")]
    pub max_context_messages: usize,
    /// Default model round-trip bound within a single run.
    #[serde(default = "default_max_recursions")]
    pub max_recursions: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            max_context_messages: default_max_context_messages(),
            max_recursions: default_max_recursions(),
        }
    }
}

fn default_persona() -> String {
    "你是一个温柔体贴的虚拟伙伴，会认真倾听、记住关于用户的重要事情，并用自然的中文交流。"
        .to_string()
}

fn default_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_inject_limit() -> usize {
    5
}

fn default_max_context_messages() -> usize {
    20
}

fn default_max_recursions() -> usize {
    3
}

fn default_true() -> bool {
    true
}
