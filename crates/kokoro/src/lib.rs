//! # kokoro
//!
//! Embeddable core of an interactive character companion: a persistent,
//! searchable long-term memory store plus an agent loop that drives an
//! OpenAI-compatible chat-completion endpoint with model-issued memory
//! tools.
//!
//! The UI layer (avatar, chat surface, settings) consumes this crate; the
//! crate itself has no rendering or server surface.
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use kokoro::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = CompanionConfig::builder()
//!         .api_key("sk-...")
//!         .build();
//!     let store = Arc::new(SqliteMemoryStore::open("memories.db")?);
//!     let client = Arc::new(OpenAiChatClient::new(
//!         config.base_url.clone(),
//!         config.api_key.clone(),
//!         config.model.clone(),
//!     ));
//!
//!     let mut agent = Agent::new(config, store, client);
//!     let reply = agent.run("我养了一只猫，叫团子", RunOptions::default()).await?;
//!     println!("{}", reply.content);
//!     Ok(())
//! }
//! ```

// Re-export sub-crates
pub use kokoro_config as config;
pub use kokoro_core as agent;
pub use kokoro_llm as llm;
pub use kokoro_memory as memory;
pub use kokoro_protocol as protocol;
pub use kokoro_tools as tools;

/// Commonly used types and traits.
pub mod prelude {
    pub use crate::agent::{Agent, AgentError, MemoryStats, RunOptions, RunResult};
    pub use crate::config::CompanionConfig;
    pub use crate::llm::{ChatClient, ChatOptions, ChatResponse, OpenAiChatClient};
    pub use crate::memory::{
        MemoryCategory, MemoryRecord, MemoryStore, MemoryUpdate, SqliteMemoryStore,
    };
    pub use crate::protocol::{ChatMessage, MessageRole, ToolCallRequest, ToolDefinition};
    pub use crate::tools::{Tool, ToolRegistry, builtin_memory_tools};
}
