//! Error types for the orchestration core.

use kokoro_llm::LlmError;
use kokoro_memory::MemoryError;
use thiserror::Error;

/// Errors that abort a conversation turn.
#[derive(Debug, Error)]
pub enum AgentError {
    /// The provider response violated the chat-completion contract.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Chat client failure.
    #[error("chat client error: {0}")]
    Llm(#[from] LlmError),
    /// Memory store failure outside the best-effort injection path.
    #[error("memory error: {0}")]
    Memory(#[from] MemoryError),
}
