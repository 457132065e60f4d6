//! Error types for the chat client adapter.

/// Errors returned by chat clients.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    /// No API key was configured for the endpoint.
    #[error("no API key configured")]
    MissingApiKey,
    /// HTTP transport failure.
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// The provider response did not match the chat-completion shape.
    #[error("protocol error: {0}")]
    Protocol(String),
    /// Payload (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(#[from] serde_json::Error),
}
