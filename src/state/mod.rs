use std::sync::Arc;
use std::time::Duration;

use crate::chat::{AnswerSynthesizer, PromptBudget, SynthesizerConfig};
use crate::core::config::{AppPaths, Settings};
use crate::embedding::{Embedder, HttpEmbedder};
use crate::history::{ConversationStore, InMemoryConversationStore, SqliteConversationStore};
use crate::llm::{LlmClient, OpenAiCompatClient};
use crate::rag::{load_index, IndexHandle, Retriever};

pub mod error;

use error::InitError;

/// Global application state shared across all routes.
///
/// Initialization is strict: the embedding backend is probed and the index
/// artifact loaded before the server binds. Any failure aborts startup.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub settings: Settings,
    pub index: Arc<IndexHandle>,
    pub history: Arc<dyn ConversationStore>,
    pub synthesizer: AnswerSynthesizer,
}

impl AppState {
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitError> {
        let settings = Settings::load(&paths)?;

        let embedder: Arc<dyn Embedder> = Arc::new(
            HttpEmbedder::connect(
                &settings.embedding.base_url,
                &settings.embedding.model,
                settings.embedding.api_key.as_deref(),
            )
            .await?,
        );

        let index = load_index(&paths.index_path).await?;
        if index.dimension() != embedder.dimensions() {
            return Err(InitError::Index(crate::rag::IndexError::Corrupt(format!(
                "index dimension {} does not match embedder dimension {}",
                index.dimension(),
                embedder.dimensions()
            ))));
        }
        if index.meta().embedding_model != settings.embedding.model {
            tracing::warn!(
                index_model = %index.meta().embedding_model,
                configured_model = %settings.embedding.model,
                "index was built with a different embedding model"
            );
        }
        tracing::info!(
            chunks = index.len(),
            documents = index.meta().document_count,
            dimension = index.dimension(),
            "index loaded"
        );
        let index = Arc::new(IndexHandle::new(index));

        let history: Arc<dyn ConversationStore> = match settings.history.backend.as_str() {
            "sqlite" => Arc::new(
                SqliteConversationStore::new(paths.history_db_path.clone())
                    .await
                    .map_err(InitError::History)?,
            ),
            _ => Arc::new(InMemoryConversationStore::new(settings.history.max_turns)),
        };

        let llm: Arc<dyn LlmClient> = Arc::new(OpenAiCompatClient::new(
            "openai-compat",
            &settings.llm.base_url,
            &settings.llm.model,
            settings.llm.api_key.as_deref(),
            Duration::from_secs(settings.llm.timeout_secs),
        ));
        if !llm.health_check().await {
            tracing::warn!(base_url = %settings.llm.base_url, "LLM backend not reachable yet");
        }

        let retriever = Retriever::new(embedder, index.clone());
        let synthesizer = AnswerSynthesizer::new(
            retriever,
            history.clone(),
            llm,
            SynthesizerConfig {
                top_k: settings.retrieval.top_k,
                history_limit: settings.chat.history_limit,
                budget: PromptBudget {
                    context_window: settings.chat.context_window,
                    system_reserve: settings.chat.system_reserve,
                    output_reserve: settings.chat.output_reserve,
                },
                temperature: settings.llm.temperature,
                max_tokens: settings.llm.max_tokens,
            },
        );

        Ok(Arc::new(AppState {
            paths,
            settings,
            index,
            history,
            synthesizer,
        }))
    }
}
