//! Conversation history: process-wide keyed state mapping a conversation
//! id to its ordered turns.
//!
//! Two backings implement [`ConversationStore`]: an in-memory map with
//! per-conversation locking (single-process deployments) and a SQLite
//! store for history that must survive restarts or be shared across
//! processes.

pub mod memory;
pub mod sqlite;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::core::errors::ApiError;

pub use memory::InMemoryConversationStore;
pub use sqlite::SqliteConversationStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

/// One exchange in a conversation. Append-only; ordering within a
/// conversation is the order of appends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: Role,
    pub content: String,
    pub created_at: String,
}

impl ConversationTurn {
    pub fn now(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
        }
    }
}

#[async_trait]
pub trait ConversationStore: Send + Sync {
    /// Append a turn, creating the conversation if it does not exist.
    async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> Result<(), ApiError>;

    /// The most recent `max_turns` turns, oldest first. Unknown
    /// conversations yield an empty history.
    async fn history(
        &self,
        conversation_id: &str,
        max_turns: usize,
    ) -> Result<Vec<ConversationTurn>, ApiError>;

    /// Number of stored turns for one conversation.
    async fn turn_count(&self, conversation_id: &str) -> Result<usize, ApiError>;

    /// Number of stored turns across all conversations.
    async fn total_turns(&self) -> Result<usize, ApiError>;
}
