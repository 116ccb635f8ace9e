use thiserror::Error;

use crate::core::config::ConfigError;
use crate::core::errors::ApiError;
use crate::embedding::EmbedderError;
use crate::rag::IndexError;

/// Startup failures. Every variant is fatal: the service refuses to serve
/// rather than run with a missing embedder or a bad index.
#[derive(Debug, Error)]
pub enum InitError {
    #[error("configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("embedding backend: {0}")]
    Embedder(#[from] EmbedderError),
    #[error("vector index: {0}")]
    Index(#[from] IndexError),
    #[error("history store: {0}")]
    History(ApiError),
}
