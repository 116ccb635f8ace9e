//! Prompt assembly under a context-window budget.
//!
//! Token counts are estimated at ~4 characters per token; the budget
//! exists to keep prompts inside the model's window, not to be exact.
//! When the assembled prompt would overflow, the oldest history turns go
//! first, then the lowest-scoring chunks.

use crate::history::ConversationTurn;
use crate::llm::ChatMessage;
use crate::rag::RetrievedChunk;

#[derive(Debug, Clone, Copy)]
pub struct PromptBudget {
    pub context_window: usize,
    pub system_reserve: usize,
    pub output_reserve: usize,
}

impl PromptBudget {
    /// Tokens available for history + retrieved context + the query.
    pub fn available(&self) -> usize {
        self.context_window
            .saturating_sub(self.system_reserve)
            .saturating_sub(self.output_reserve)
    }
}

impl Default for PromptBudget {
    fn default() -> Self {
        Self {
            context_window: 8192,
            system_reserve: 500,
            output_reserve: 1000,
        }
    }
}

pub fn estimate_tokens(text: &str) -> usize {
    (text.len() + 3) / 4
}

const SYSTEM_INSTRUCTIONS: &str = "You are a helpful product assistant. Provide clear, structured answers \
about the products and services described in the context documents.\n\
- Respond in clean, readable plain text without markdown symbols.\n\
- Present product names followed by a dash and a short description.\n\
- Be concise and informative.\n\
- Only mention products that the provided context actually describes.";

const NO_CONTEXT_NOTE: &str = "No relevant documentation was found for this question. Say so explicitly, \
and keep any answer brief and cautious.";

/// The prompt handed to the LLM plus the chunks that actually made it in.
#[derive(Debug)]
pub struct AssembledPrompt {
    pub messages: Vec<ChatMessage>,
    pub included_chunks: Vec<RetrievedChunk>,
}

/// Assemble system instructions, recent history, labeled context, and the
/// query into chat messages, trimming to fit `budget`.
pub fn assemble(
    budget: &PromptBudget,
    history: &[ConversationTurn],
    chunks: &[RetrievedChunk],
    query: &str,
) -> AssembledPrompt {
    let available = budget.available();
    let query_tokens = estimate_tokens(query);

    let mut kept_history = history.len();
    let mut kept_chunks = chunks.len();

    let history_tokens =
        |n: usize| -> usize { history[history.len() - n..].iter().map(turn_tokens).sum() };
    let chunk_tokens =
        |n: usize| -> usize { chunks[..n].iter().map(|c| estimate_tokens(&c.text) + 16).sum() };

    // Oldest history first, then lowest-scoring chunks.
    while kept_history > 0
        && query_tokens + history_tokens(kept_history) + chunk_tokens(kept_chunks) > available
    {
        kept_history -= 1;
    }
    while kept_chunks > 0
        && query_tokens + history_tokens(kept_history) + chunk_tokens(kept_chunks) > available
    {
        kept_chunks -= 1;
    }

    let included_chunks: Vec<RetrievedChunk> = chunks[..kept_chunks].to_vec();

    let mut system = SYSTEM_INSTRUCTIONS.to_string();
    if included_chunks.is_empty() {
        system.push_str("\n\n");
        system.push_str(NO_CONTEXT_NOTE);
    }

    let mut messages = Vec::with_capacity(kept_history + 2);
    messages.push(ChatMessage::new("system", system));
    for turn in &history[history.len() - kept_history..] {
        messages.push(ChatMessage::new(turn.role.as_str(), turn.content.clone()));
    }
    messages.push(ChatMessage::new(
        "user",
        final_user_message(&included_chunks, query),
    ));

    AssembledPrompt {
        messages,
        included_chunks,
    }
}

fn turn_tokens(turn: &ConversationTurn) -> usize {
    estimate_tokens(&turn.content) + 4
}

fn final_user_message(chunks: &[RetrievedChunk], query: &str) -> String {
    if chunks.is_empty() {
        return query.to_string();
    }

    let mut message = String::from("Context from product documents:\n\n");
    for (i, chunk) in chunks.iter().enumerate() {
        message.push_str(&format!(
            "[{}] (Source: {}, relevance: {:.2})\n{}\n\n",
            i + 1,
            chunk.document_id,
            chunk.score,
            chunk.text.trim()
        ));
    }
    message.push_str("Question: ");
    message.push_str(query);
    message
}
