use std::path::PathBuf;

use async_trait::async_trait;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::{Row, SqlitePool};

use crate::core::errors::ApiError;

use super::{ConversationStore, ConversationTurn, Role};

/// SQLite-backed conversation store. Writes serialize through the pool
/// and the per-append transaction; that is the scaling limit of this
/// backing compared to the in-memory one.
#[derive(Clone)]
pub struct SqliteConversationStore {
    pool: SqlitePool,
}

impl SqliteConversationStore {
    pub async fn new(db_path: PathBuf) -> Result<Self, ApiError> {
        let options = SqliteConnectOptions::new()
            .filename(&db_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            .foreign_keys(true);

        let pool = SqlitePoolOptions::new()
            .min_connections(1)
            .max_connections(5)
            .connect_with(options)
            .await
            .map_err(|e| ApiError::internal(format!("failed to open history db: {e}")))?;

        let store = Self { pool };
        store.init_schema().await?;
        Ok(store)
    }

    async fn init_schema(&self) -> Result<(), ApiError> {
        sqlx::query(
            "CREATE TABLE IF NOT EXISTS conversations (
                id TEXT PRIMARY KEY,
                created_at TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query(
            "CREATE TABLE IF NOT EXISTS turns (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                conversation_id TEXT NOT NULL,
                role TEXT NOT NULL,
                content TEXT NOT NULL,
                created_at TEXT NOT NULL,
                FOREIGN KEY(conversation_id) REFERENCES conversations(id) ON DELETE CASCADE
            )",
        )
        .execute(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        sqlx::query("CREATE INDEX IF NOT EXISTS idx_turns_conversation ON turns(conversation_id)")
            .execute(&self.pool)
            .await
            .map_err(ApiError::internal)?;

        Ok(())
    }

    fn row_to_turn(row: &sqlx::sqlite::SqliteRow) -> ConversationTurn {
        let role = match row.try_get::<String, _>("role").as_deref() {
            Ok("assistant") => Role::Assistant,
            _ => Role::User,
        };
        ConversationTurn {
            role,
            content: row.try_get::<String, _>("content").unwrap_or_default(),
            created_at: row.try_get::<String, _>("created_at").unwrap_or_default(),
        }
    }
}

#[async_trait]
impl ConversationStore for SqliteConversationStore {
    async fn append(&self, conversation_id: &str, turn: ConversationTurn) -> Result<(), ApiError> {
        let now = chrono::Utc::now().to_rfc3339();

        let mut tx = self.pool.begin().await.map_err(ApiError::internal)?;

        sqlx::query("INSERT OR IGNORE INTO conversations (id, created_at, updated_at) VALUES (?1, ?2, ?3)")
            .bind(conversation_id)
            .bind(&now)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query("UPDATE conversations SET updated_at = ?1 WHERE id = ?2")
            .bind(&now)
            .bind(conversation_id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::internal)?;

        sqlx::query(
            "INSERT INTO turns (conversation_id, role, content, created_at) VALUES (?1, ?2, ?3, ?4)",
        )
        .bind(conversation_id)
        .bind(turn.role.as_str())
        .bind(&turn.content)
        .bind(&turn.created_at)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::internal)?;

        tx.commit().await.map_err(ApiError::internal)
    }

    async fn history(
        &self,
        conversation_id: &str,
        max_turns: usize,
    ) -> Result<Vec<ConversationTurn>, ApiError> {
        let rows = sqlx::query(
            "SELECT role, content, created_at FROM (
                SELECT * FROM turns WHERE conversation_id = ?1 ORDER BY id DESC LIMIT ?2
             ) ORDER BY id ASC",
        )
        .bind(conversation_id)
        .bind(max_turns as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(ApiError::internal)?;

        Ok(rows.iter().map(Self::row_to_turn).collect())
    }

    async fn turn_count(&self, conversation_id: &str) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM turns WHERE conversation_id = ?1")
            .bind(conversation_id)
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count as usize)
    }

    async fn total_turns(&self) -> Result<usize, ApiError> {
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM turns")
            .fetch_one(&self.pool)
            .await
            .map_err(ApiError::internal)?;
        Ok(count as usize)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_store() -> SqliteConversationStore {
        let path = std::env::temp_dir().join(format!("docqa-history-test-{}.db", uuid::Uuid::new_v4()));
        SqliteConversationStore::new(path).await.unwrap()
    }

    #[tokio::test]
    async fn append_and_read_back_in_order() {
        let store = test_store().await;
        store
            .append("x", ConversationTurn::now(Role::User, "A"))
            .await
            .unwrap();
        store
            .append("x", ConversationTurn::now(Role::Assistant, "B"))
            .await
            .unwrap();
        store
            .append("x", ConversationTurn::now(Role::User, "C"))
            .await
            .unwrap();

        let recent = store.history("x", 2).await.unwrap();
        let contents: Vec<&str> = recent.iter().map(|t| t.content.as_str()).collect();
        assert_eq!(contents, vec!["B", "C"]);
        assert_eq!(recent[0].role, Role::Assistant);

        assert_eq!(store.turn_count("x").await.unwrap(), 3);
        assert_eq!(store.total_turns().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn conversations_are_isolated() {
        let store = test_store().await;
        store
            .append("a", ConversationTurn::now(Role::User, "for a"))
            .await
            .unwrap();
        store
            .append("b", ConversationTurn::now(Role::User, "for b"))
            .await
            .unwrap();

        let a = store.history("a", 10).await.unwrap();
        assert_eq!(a.len(), 1);
        assert_eq!(a[0].content, "for a");
        assert!(store.history("c", 10).await.unwrap().is_empty());
    }
}
