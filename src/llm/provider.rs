use async_trait::async_trait;
use thiserror::Error;

use super::types::ChatRequest;

#[derive(Debug, Error)]
pub enum GenerateError {
    /// The completion call failed (network error, non-2xx, unusable body).
    #[error("generation failed: {0}")]
    Failed(String),
    /// The completion did not finish within the configured deadline.
    #[error("generation timed out after {0}s")]
    Timeout(u64),
}

/// Text generation capability. The synthesis pipeline only depends on this
/// trait, so the vendor behind it is swappable.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Provider name, for logs and the status endpoint.
    fn name(&self) -> &str;

    /// Check that the backend is reachable.
    async fn health_check(&self) -> bool;

    /// Run a chat completion and return the generated text.
    async fn chat(&self, request: ChatRequest) -> Result<String, GenerateError>;
}
