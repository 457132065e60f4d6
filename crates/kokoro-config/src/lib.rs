//! Configuration model for the kokoro companion core.

mod model;

pub use model::{
    CompanionConfig, CompanionConfigBuilder, MemoryConfig, OrchestratorConfig,
};
