//! Embedding provider abstraction.
//!
//! Retrieval and indexing only see the [`Embedder`] trait; the shipped
//! implementation talks to an OpenAI-compatible `/v1/embeddings` endpoint.

pub mod openai;
#[cfg(test)]
pub(crate) mod test_util;

use async_trait::async_trait;
use thiserror::Error;

pub use openai::HttpEmbedder;

#[derive(Debug, Error)]
pub enum EmbedderError {
    /// The embedding backend could not be reached or rejected the model.
    /// Fatal at startup, not per-request.
    #[error("embedding backend unavailable: {0}")]
    Unavailable(String),
    #[error("embedding request failed: {0}")]
    Request(String),
    /// The backend returned a vector of unexpected dimension or count.
    #[error("embedding response malformed: {0}")]
    Malformed(String),
}

/// Maps text to fixed-dimension dense vectors.
///
/// For a fixed model the mapping is deterministic; all vectors produced by
/// one instance share the dimension reported by [`dimensions`](Embedder::dimensions).
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Embed a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError>;

    /// Embed a batch of texts, preserving input order. Used during indexing
    /// for throughput.
    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError>;

    /// Dimension of every vector this embedder produces.
    fn dimensions(&self) -> usize;
}
