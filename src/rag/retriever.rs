//! Query-time retrieval: embed the query, search the loaded index.

use std::sync::Arc;

use serde::Serialize;

use crate::core::errors::ApiError;
use crate::embedding::Embedder;

use super::index::IndexHandle;

/// One retrieved chunk with its text, provenance, and similarity score.
/// Ephemeral — produced fresh per query, never persisted.
#[derive(Debug, Clone, Serialize)]
pub struct RetrievedChunk {
    pub chunk_id: String,
    pub document_id: String,
    pub text: String,
    pub span: (usize, usize),
    pub score: f32,
}

pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<IndexHandle>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<IndexHandle>) -> Self {
        Self { embedder, index }
    }

    pub fn index(&self) -> &Arc<IndexHandle> {
        &self.index
    }

    /// Return the top `k` chunks for `query`, highest similarity first.
    ///
    /// `k` is clamped to the index size; an empty index yields an empty
    /// result rather than an error. `k == 0` and blank queries are client
    /// errors.
    pub async fn retrieve(&self, query: &str, k: usize) -> Result<Vec<RetrievedChunk>, ApiError> {
        if query.trim().is_empty() {
            return Err(ApiError::BadRequest("query must not be empty".to_string()));
        }
        if k == 0 {
            return Err(ApiError::BadRequest("k must be at least 1".to_string()));
        }

        let index = self.index.current();
        if index.is_empty() {
            return Ok(Vec::new());
        }
        let k = k.min(index.len());

        let query_embedding = self
            .embedder
            .embed(query)
            .await
            .map_err(|e| ApiError::internal(format!("query embedding failed: {e}")))?;

        let hits = index.search(&query_embedding, k);
        tracing::debug!(results = hits.len(), k, "retrieval complete");

        Ok(hits
            .into_iter()
            .map(|hit| RetrievedChunk {
                chunk_id: hit.chunk.chunk_id,
                document_id: hit.chunk.document_id,
                text: hit.chunk.text,
                span: (hit.chunk.start, hit.chunk.end),
                score: hit.score,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::test_util::HashEmbedder;
    use crate::rag::builder::IndexBuilder;
    use crate::rag::chunker::Chunker;
    use crate::rag::index::{test_meta, VectorIndex};
    use crate::rag::loader::Document;

    fn empty_retriever() -> Retriever {
        Retriever::new(
            Arc::new(HashEmbedder::new(64)),
            Arc::new(IndexHandle::new(VectorIndex::new(64, test_meta()))),
        )
    }

    async fn corpus_retriever(docs: &[(&str, &str)]) -> Retriever {
        let embedder = Arc::new(HashEmbedder::new(128));
        let builder = IndexBuilder::new(
            embedder.clone(),
            Chunker::new(200, 20).unwrap(),
            "hash-test",
        );
        let documents: Vec<Document> = docs
            .iter()
            .map(|(id, text)| Document {
                id: id.to_string(),
                text: text.to_string(),
                source_uri: None,
            })
            .collect();
        let index = builder.build(&documents).await.unwrap();
        Retriever::new(embedder, Arc::new(IndexHandle::new(index)))
    }

    #[tokio::test]
    async fn empty_index_returns_empty_result() {
        let retriever = empty_retriever();
        let results = retriever.retrieve("anything", 5).await.unwrap();
        assert!(results.is_empty());
    }

    #[tokio::test]
    async fn zero_k_is_a_client_error() {
        let retriever = empty_retriever();
        let err = retriever.retrieve("anything", 0).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn blank_query_is_a_client_error() {
        let retriever = empty_retriever();
        let err = retriever.retrieve("   ", 3).await.unwrap_err();
        assert!(matches!(err, ApiError::BadRequest(_)));
    }

    #[tokio::test]
    async fn k_is_clamped_to_index_size() {
        let retriever = corpus_retriever(&[("only.txt", "a single tiny document")]).await;
        let results = retriever.retrieve("tiny document", 50).await.unwrap();
        assert_eq!(results.len(), 1);
    }

    #[tokio::test]
    async fn relevant_document_ranks_first() {
        let retriever = corpus_retriever(&[
            ("loans.txt", "Home loans have a 2% fee"),
            ("pets.txt", "Pet insurance covers vet visits"),
        ])
        .await;

        let results = retriever
            .retrieve("What fees apply to home loans?", 2)
            .await
            .unwrap();
        assert_eq!(results[0].document_id, "loans.txt");
        assert!(results[0].score > results[1].score);
    }
}
