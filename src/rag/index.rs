//! In-memory vector index with exact cosine search.
//!
//! Built append-only by the indexing pipeline, immutable while serving.
//! [`IndexHandle`] is the shared access point: queries clone the current
//! `Arc` and search without holding any lock; a reload swaps the pointer.

use std::collections::HashSet;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use thiserror::Error;

use super::chunker::ChunkRecord;

#[derive(Debug, Error)]
pub enum IndexError {
    #[error("index not found at {0}")]
    NotFound(PathBuf),
    #[error("index corrupt: {0}")]
    Corrupt(String),
    #[error("duplicate chunk id {0}")]
    DuplicateChunk(String),
    #[error("embedding dimension mismatch: index is {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
    #[error("failed to persist index: {0}")]
    Persist(String),
}

/// Build-time metadata persisted next to the vectors. `fingerprint`
/// identifies the (model, chunk config, corpus) combination that produced
/// the artifact.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexMeta {
    pub embedding_model: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub document_count: usize,
    pub fingerprint: String,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct IndexEntry {
    pub chunk: ChunkRecord,
    pub embedding: Vec<f32>,
}

/// A chunk returned by [`VectorIndex::search`] with its similarity score.
#[derive(Debug, Clone)]
pub struct SearchHit {
    pub chunk: ChunkRecord,
    pub score: f32,
}

#[derive(Debug)]
pub struct VectorIndex {
    dimension: usize,
    meta: IndexMeta,
    entries: Vec<IndexEntry>,
    ids: HashSet<String>,
}

impl VectorIndex {
    pub fn new(dimension: usize, meta: IndexMeta) -> Self {
        Self {
            dimension,
            meta,
            entries: Vec::new(),
            ids: HashSet::new(),
        }
    }

    pub fn dimension(&self) -> usize {
        self.dimension
    }

    pub fn meta(&self) -> &IndexMeta {
        &self.meta
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[IndexEntry] {
        &self.entries
    }

    /// Append one (chunk, embedding) pair. Chunk ids are unique per index
    /// and every embedding must match the index dimension.
    pub fn insert(&mut self, chunk: ChunkRecord, embedding: Vec<f32>) -> Result<(), IndexError> {
        if embedding.len() != self.dimension {
            return Err(IndexError::DimensionMismatch {
                expected: self.dimension,
                got: embedding.len(),
            });
        }
        if !self.ids.insert(chunk.chunk_id.clone()) {
            return Err(IndexError::DuplicateChunk(chunk.chunk_id));
        }
        self.entries.push(IndexEntry { chunk, embedding });
        Ok(())
    }

    /// Exact top-k by cosine similarity, descending; equal scores are
    /// ordered by chunk id so results are deterministic.
    pub fn search(&self, query: &[f32], k: usize) -> Vec<SearchHit> {
        let mut hits: Vec<SearchHit> = self
            .entries
            .iter()
            .map(|entry| SearchHit {
                chunk: entry.chunk.clone(),
                score: cosine_similarity(query, &entry.embedding),
            })
            .collect();

        hits.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.chunk.chunk_id.cmp(&b.chunk.chunk_id))
        });
        hits.truncate(k.min(self.entries.len()));
        hits
    }
}

pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    let denom = norm_a * norm_b;

    if denom <= f32::EPSILON {
        0.0
    } else {
        dot / denom
    }
}

/// Shared, swappable view of the loaded index. Readers never block each
/// other; reload replaces the pointer so in-flight searches finish on the
/// old index.
pub struct IndexHandle {
    inner: RwLock<Arc<VectorIndex>>,
}

impl IndexHandle {
    pub fn new(index: VectorIndex) -> Self {
        Self {
            inner: RwLock::new(Arc::new(index)),
        }
    }

    pub fn current(&self) -> Arc<VectorIndex> {
        self.inner
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn swap(&self, index: VectorIndex) {
        let mut guard = self
            .inner
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        *guard = Arc::new(index);
    }
}

#[cfg(test)]
pub(crate) fn test_meta() -> IndexMeta {
    IndexMeta {
        embedding_model: "test-model".to_string(),
        chunk_size: 100,
        chunk_overlap: 20,
        document_count: 1,
        fingerprint: "test".to_string(),
        created_at: "2025-01-01T00:00:00Z".to_string(),
    }
}
