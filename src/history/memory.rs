use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::core::errors::ApiError;

use super::{ConversationStore, ConversationTurn};

type TurnLog = Arc<Mutex<VecDeque<ConversationTurn>>>;

/// In-memory conversation store.
///
/// The outer map lock is held only to look up or create a conversation's
/// entry; appends then serialize on that conversation's own mutex, so
/// unrelated conversations never contend. Each conversation keeps at most
/// `max_turns` turns, evicting the oldest on append.
pub struct InMemoryConversationStore {
    max_turns: usize,
    conversations: RwLock<HashMap<String, TurnLog>>,
}

impl InMemoryConversationStore {
    pub fn new(max_turns: usize) -> Self {
        Self {
            max_turns: max_turns.max(1),
            conversations: RwLock::new(HashMap::new()),
        }
    }

    fn log_for(&self, conversation_id: &str) -> Option<TurnLog> {
        let map = self
            .conversations
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.get(conversation_id).cloned()
    }

    fn log_or_create(&self, conversation_id: &str) -> TurnLog {
        if let Some(log) = self.log_for(conversation_id) {
            return log;
        }
        let mut map = self
            .conversations
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        map.entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(VecDeque::new())))
            .clone()
    }
}

#[async_trait]
impl ConversationStore for InMemoryConversationStore {
    async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> Result<(), ApiError> {
        let log = self.log_or_create(conversation_id);
        let mut turns = log.lock().await;
        turns.push_back(turn);
        while turns.len() > self.max_turns {
            turns.pop_front();
        }
        Ok(())
    }

    async fn history(
        &self,
        conversation_id: &str,
        max_turns: usize,
    ) -> Result<Vec<ConversationTurn>, ApiError> {
        let Some(log) = self.log_for(conversation_id) else {
            return Ok(Vec::new());
        };
        let turns = log.lock().await;
        let skip = turns.len().saturating_sub(max_turns);
        Ok(turns.iter().skip(skip).cloned().collect())
    }

    async fn turn_count(&self, conversation_id: &str) -> Result<usize, ApiError> {
        match self.log_for(conversation_id) {
            Some(log) => Ok(log.lock().await.len()),
            None => Ok(0),
        }
    }

    async fn total_turns(&self) -> Result<usize, ApiError> {
        let logs: Vec<TurnLog> = {
            let map = self
                .conversations
                .read()
                .unwrap_or_else(|poisoned| poisoned.into_inner());
            map.values().cloned().collect()
        };
        let mut total = 0;
        for log in logs {
            total += log.lock().await.len();
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::history::Role;

    fn turn(role: Role, content: &str) -> ConversationTurn {
        ConversationTurn::now(role, content)
    }

    #[tokio::test]
    async fn history_returns_most_recent_oldest_first() {
        let store = InMemoryConversationStore::new(100);
        store.append("x", turn(Role::User, "A")).await.unwrap();
        store.append("x", turn(Role::Assistant, "B")).await.unwrap();
        store.append("x", turn(Role::User, "C")).await.unwrap();

        let recent = store.history("x", 2).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["B", "C"]);
    }

    #[tokio::test]
    async fn unknown_conversation_is_empty() {
        let store = InMemoryConversationStore::new(100);
        assert!(store.history("nobody", 10).await.unwrap().is_empty());
        assert_eq!(store.turn_count("nobody").await.unwrap(), 0);
    }

    #[tokio::test]
    async fn oldest_turns_evicted_past_cap() {
        let store = InMemoryConversationStore::new(3);
        for i in 0..5 {
            store
                .append("x", turn(Role::User, &format!("m{i}")))
                .await
                .unwrap();
        }

        let all = store.history("x", 100).await.unwrap();
        let contents: Vec<&str> = all.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["m2", "m3", "m4"]);
    }

    #[tokio::test]
    async fn concurrent_appends_do_not_interleave_within_a_conversation() {
        let store = Arc::new(InMemoryConversationStore::new(1000));

        let mut handles = Vec::new();
        for conv in 0..100 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                let id = format!("conv-{conv}");
                for i in 0..10 {
                    store
                        .append(&id, turn(Role::User, &format!("{conv}:{i}")))
                        .await
                        .unwrap();
                }
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(store.total_turns().await.unwrap(), 1000);
        for conv in 0..100 {
            let id = format!("conv-{conv}");
            let turns = store.history(&id, 100).await.unwrap();
            assert_eq!(turns.len(), 10);
            // Appends within one conversation kept their order.
            for (i, t) in turns.iter().enumerate() {
                assert_eq!(t.content, format!("{conv}:{i}"));
            }
        }
    }
}
