//! Answer synthesis: retrieve → recall history → prompt → generate →
//! record the exchange.

use std::sync::Arc;

use serde::Serialize;

use crate::core::errors::ApiError;
use crate::history::{ConversationStore, ConversationTurn, Role};
use crate::llm::{ChatRequest, GenerateError, LlmClient};
use crate::rag::Retriever;

use super::prompt::{assemble, PromptBudget};

#[derive(Debug, Clone)]
pub struct SynthesizerConfig {
    /// Chunks retrieved per query.
    pub top_k: usize,
    /// Most recent turns pulled from the conversation store.
    pub history_limit: usize,
    pub budget: PromptBudget,
    pub temperature: Option<f64>,
    pub max_tokens: Option<i32>,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            top_k: 4,
            history_limit: 20,
            budget: PromptBudget::default(),
            temperature: None,
            max_tokens: None,
        }
    }
}

/// A source attribution: which document, and which span of it, backed the
/// answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SourceRef {
    pub document_id: String,
    pub span: (usize, usize),
}

#[derive(Debug, Clone, Serialize)]
pub struct ChatAnswer {
    pub answer: String,
    pub sources: Vec<SourceRef>,
}

pub struct AnswerSynthesizer {
    retriever: Retriever,
    store: Arc<dyn ConversationStore>,
    llm: Arc<dyn LlmClient>,
    config: SynthesizerConfig,
}

impl AnswerSynthesizer {
    pub fn new(
        retriever: Retriever,
        store: Arc<dyn ConversationStore>,
        llm: Arc<dyn LlmClient>,
        config: SynthesizerConfig,
    ) -> Self {
        Self {
            retriever,
            store,
            llm,
            config,
        }
    }

    pub fn store(&self) -> &Arc<dyn ConversationStore> {
        &self.store
    }

    pub fn retriever(&self) -> &Retriever {
        &self.retriever
    }

    /// Answer `query` within `conversation_id`.
    ///
    /// The conversation is only extended after the model answers; a failed
    /// or timed-out generation leaves the history exactly as it was.
    pub async fn answer(
        &self,
        conversation_id: &str,
        query: &str,
    ) -> Result<ChatAnswer, ApiError> {
        if conversation_id.trim().is_empty() {
            return Err(ApiError::BadRequest(
                "conversation_id must not be empty".to_string(),
            ));
        }

        let retrieved = self.retriever.retrieve(query, self.config.top_k).await?;
        let history = self
            .store
            .history(conversation_id, self.config.history_limit)
            .await?;

        let prompt = assemble(&self.config.budget, &history, &retrieved, query);
        tracing::debug!(
            conversation = conversation_id,
            retrieved = retrieved.len(),
            in_prompt = prompt.included_chunks.len(),
            history = history.len(),
            "prompt assembled"
        );

        let mut request = ChatRequest::new(prompt.messages);
        request.temperature = self.config.temperature;
        request.max_tokens = self.config.max_tokens;

        let raw = self.llm.chat(request).await.map_err(|e| match e {
            GenerateError::Failed(msg) => ApiError::BadGateway(format!("generation failed: {msg}")),
            GenerateError::Timeout(secs) => {
                ApiError::GatewayTimeout(format!("generation timed out after {secs}s"))
            }
        })?;
        let answer = clean_answer(&raw);

        self.store
            .append(conversation_id, ConversationTurn::now(Role::User, query))
            .await?;
        self.store
            .append(
                conversation_id,
                ConversationTurn::now(Role::Assistant, answer.clone()),
            )
            .await?;

        let mut sources: Vec<SourceRef> = Vec::new();
        for chunk in &prompt.included_chunks {
            let source = SourceRef {
                document_id: chunk.document_id.clone(),
                span: chunk.span,
            };
            if !sources.contains(&source) {
                sources.push(source);
            }
        }

        Ok(ChatAnswer { answer, sources })
    }
}

/// Strip prompt-echo lines and markdown emphasis from model output while
/// keeping paragraphs and list structure.
fn clean_answer(response: &str) -> String {
    let mut cleaned_lines = Vec::new();
    for line in response.lines() {
        let line = line.trim_end();
        let lower = line.trim().to_lowercase();
        if ["user:", "assistant:", "context:", "question:"]
            .iter()
            .any(|marker| lower.starts_with(marker))
        {
            continue;
        }
        cleaned_lines.push(line.replace(['*', '_'], ""));
    }

    let mut out = cleaned_lines.join("\n");
    while out.contains("\n\n\n") {
        out = out.replace("\n\n\n", "\n\n");
    }
    out.trim().to_string()
}
