//! Shared fixtures for integration tests: a deterministic embedder, a
//! scripted LLM, and a fully wired application state.
#![allow(dead_code)]

use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use docqa_backend::chat::{AnswerSynthesizer, SynthesizerConfig};
use docqa_backend::core::config::{AppPaths, Settings};
use docqa_backend::embedding::{Embedder, EmbedderError};
use docqa_backend::history::{ConversationStore, InMemoryConversationStore};
use docqa_backend::llm::{ChatRequest, GenerateError, LlmClient};
use docqa_backend::rag::{
    Chunker, Document, IndexBuilder, IndexHandle, Retriever, VectorIndex,
};
use docqa_backend::state::AppState;

pub const DIMENSIONS: usize = 128;

/// Bag-of-words embedding hashed into a fixed number of buckets. Texts
/// sharing terms score higher under cosine similarity, deterministically.
pub struct HashEmbedder {
    dimensions: usize,
}

impl HashEmbedder {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn embed_sync(&self, text: &str) -> Vec<f32> {
        let mut vec = vec![0.0f32; self.dimensions];
        for token in text
            .to_lowercase()
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| !t.is_empty())
        {
            let bucket = djb2(token) as usize % self.dimensions;
            vec[bucket] += 1.0;
        }
        vec
    }
}

fn djb2(s: &str) -> u64 {
    s.bytes().fold(5381u64, |h, b| {
        h.wrapping_mul(33).wrapping_add(u64::from(b))
    })
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbedderError> {
        Ok(self.embed_sync(text))
    }

    async fn embed_many(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedderError> {
        Ok(texts.iter().map(|t| self.embed_sync(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }
}

/// Scripted LLM: either answers with a fixed string or fails.
pub struct MockLlm {
    reply: Result<String, String>,
    pub requests: Mutex<Vec<ChatRequest>>,
}

impl MockLlm {
    pub fn answering(reply: &str) -> Self {
        Self {
            reply: Ok(reply.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn failing(message: &str) -> Self {
        Self {
            reply: Err(message.to_string()),
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl LlmClient for MockLlm {
    fn name(&self) -> &str {
        "mock"
    }

    async fn health_check(&self) -> bool {
        true
    }

    async fn chat(&self, request: ChatRequest) -> Result<String, GenerateError> {
        self.requests.lock().unwrap().push(request);
        match &self.reply {
            Ok(text) => Ok(text.clone()),
            Err(msg) => Err(GenerateError::Failed(msg.clone())),
        }
    }
}

pub fn document(id: &str, text: &str) -> Document {
    Document {
        id: id.to_string(),
        text: text.to_string(),
        source_uri: None,
    }
}

pub async fn build_index(docs: &[(&str, &str)]) -> VectorIndex {
    let embedder = Arc::new(HashEmbedder::new(DIMENSIONS));
    let builder = IndexBuilder::new(embedder, Chunker::new(200, 20).unwrap(), "hash-test");
    let documents: Vec<Document> = docs.iter().map(|(id, text)| document(id, text)).collect();
    builder.build(&documents).await.unwrap()
}

fn test_paths(dir: &std::path::Path) -> AppPaths {
    AppPaths {
        project_root: dir.to_path_buf(),
        user_data_dir: dir.to_path_buf(),
        log_dir: dir.join("logs"),
        index_path: dir.join("index.db"),
        history_db_path: dir.join("history.db"),
        docs_dir: dir.join("docs"),
    }
}

/// Wire a complete [`AppState`] around an in-memory corpus and a scripted
/// LLM, bypassing the network-facing initialize path.
pub async fn app_state(docs: &[(&str, &str)], llm: Arc<MockLlm>) -> Arc<AppState> {
    let dir = tempfile::tempdir().unwrap();
    let paths = Arc::new(test_paths(dir.path()));
    let settings = Settings::default();

    let embedder = Arc::new(HashEmbedder::new(DIMENSIONS));
    let index = if docs.is_empty() {
        // An empty index still carries the embedder's dimension.
        let builder = IndexBuilder::new(
            embedder.clone(),
            Chunker::new(200, 20).unwrap(),
            "hash-test",
        );
        builder.build(&[]).await.unwrap()
    } else {
        build_index(docs).await
    };
    let index = Arc::new(IndexHandle::new(index));

    let history: Arc<dyn ConversationStore> = Arc::new(InMemoryConversationStore::new(200));
    let retriever = Retriever::new(embedder, index.clone());
    let synthesizer = AnswerSynthesizer::new(
        retriever,
        history.clone(),
        llm,
        SynthesizerConfig::default(),
    );

    Arc::new(AppState {
        paths,
        settings,
        index,
        history,
        synthesizer,
    })
}
