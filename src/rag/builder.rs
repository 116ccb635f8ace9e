//! Offline indexing pipeline: load → chunk → embed → persist.

use std::path::Path;
use std::sync::Arc;

use sha2::{Digest, Sha256};
use thiserror::Error;

use crate::embedding::{Embedder, EmbedderError};

use super::chunker::{ChunkRecord, Chunker};
use super::index::{IndexError, IndexMeta, VectorIndex};
use super::loader::Document;
use super::sqlite::save_index;

/// Chunks per embedding request during a build.
const EMBED_BATCH: usize = 64;

#[derive(Debug, Error)]
pub enum BuildError {
    #[error(transparent)]
    Embed(#[from] EmbedderError),
    #[error(transparent)]
    Index(#[from] IndexError),
}

/// One-shot builder producing a fresh [`VectorIndex`] from a document set.
///
/// Rebuilding from the same documents with the same configuration yields
/// the same chunk set; the fingerprint in the artifact's meta table records
/// what went in.
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    chunker: Chunker,
    embedding_model: String,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, chunker: Chunker, embedding_model: &str) -> Self {
        Self {
            embedder,
            chunker,
            embedding_model: embedding_model.to_string(),
        }
    }

    pub async fn build(&self, documents: &[Document]) -> Result<VectorIndex, BuildError> {
        let mut chunks: Vec<ChunkRecord> = Vec::new();
        for document in documents {
            let before = chunks.len();
            chunks.extend(self.chunker.chunk(document));
            tracing::debug!(
                document = %document.id,
                chunks = chunks.len() - before,
                "chunked document"
            );
        }
        tracing::info!(
            documents = documents.len(),
            chunks = chunks.len(),
            "chunking complete"
        );

        let meta = IndexMeta {
            embedding_model: self.embedding_model.clone(),
            chunk_size: self.chunker.chunk_size(),
            chunk_overlap: self.chunker.chunk_overlap(),
            document_count: documents.len(),
            fingerprint: self.fingerprint(documents),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let mut index = VectorIndex::new(self.embedder.dimensions(), meta);

        for batch in chunks.chunks(EMBED_BATCH) {
            let texts: Vec<String> = batch.iter().map(|c| c.text.clone()).collect();
            let embeddings = self.embedder.embed_many(&texts).await?;

            for (chunk, embedding) in batch.iter().zip(embeddings) {
                index.insert(chunk.clone(), embedding)?;
            }
            tracing::debug!(indexed = index.len(), total = chunks.len(), "embedded batch");
        }

        Ok(index)
    }

    /// Build and persist in one step; the artifact swap is atomic.
    pub async fn build_and_save(
        &self,
        documents: &[Document],
        path: &Path,
    ) -> Result<VectorIndex, BuildError> {
        let index = self.build(documents).await?;
        save_index(&index, path).await?;
        Ok(index)
    }

    fn fingerprint(&self, documents: &[Document]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.embedding_model.as_bytes());
        hasher.update(self.chunker.chunk_size().to_le_bytes());
        hasher.update(self.chunker.chunk_overlap().to_le_bytes());
        for document in documents {
            hasher.update(document.id.as_bytes());
            hasher.update(document.text.len().to_le_bytes());
        }
        hex::encode(hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::test_util::HashEmbedder;

    fn doc(id: &str, text: &str) -> Document {
        Document {
            id: id.to_string(),
            text: text.to_string(),
            source_uri: None,
        }
    }

    fn builder() -> IndexBuilder {
        IndexBuilder::new(
            Arc::new(HashEmbedder::new(16)),
            Chunker::new(40, 10).unwrap(),
            "hash-test",
        )
    }

    #[tokio::test]
    async fn build_indexes_every_chunk() {
        let documents = vec![
            doc("a.txt", &"alpha beta gamma ".repeat(10)),
            doc("b.txt", "short document"),
        ];

        let index = builder().build(&documents).await.unwrap();

        let expected: usize = {
            let chunker = Chunker::new(40, 10).unwrap();
            documents.iter().map(|d| chunker.chunk(d).count()).sum()
        };
        assert_eq!(index.len(), expected);
        assert_eq!(index.meta().document_count, 2);
        assert_eq!(index.meta().embedding_model, "hash-test");
    }

    #[tokio::test]
    async fn rebuild_is_reproducible() {
        let documents = vec![doc("a.txt", &"one two three four ".repeat(8))];

        let first = builder().build(&documents).await.unwrap();
        let second = builder().build(&documents).await.unwrap();

        assert_eq!(first.meta().fingerprint, second.meta().fingerprint);
        assert_eq!(first.len(), second.len());
        for (x, y) in first.entries().iter().zip(second.entries()) {
            assert_eq!(x.chunk, y.chunk);
            assert_eq!(x.embedding, y.embedding);
        }
    }

    #[tokio::test]
    async fn build_and_save_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("index.db");
        let documents = vec![doc("a.txt", &"quick brown fox ".repeat(6))];

        let built = builder().build_and_save(&documents, &path).await.unwrap();
        let loaded = crate::rag::sqlite::load_index(&path).await.unwrap();

        assert_eq!(built.len(), loaded.len());
        assert_eq!(built.meta(), loaded.meta());
    }
}
