use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct MessagesQuery {
    #[serde(default = "default_limit")]
    pub limit: usize,
}

fn default_limit() -> usize {
    50
}

/// `GET /api/conversations/:conversation_id/messages` — recent turns,
/// oldest first.
pub async fn get_messages(
    State(state): State<Arc<AppState>>,
    Path(conversation_id): Path<String>,
    Query(query): Query<MessagesQuery>,
) -> Result<Json<Value>, ApiError> {
    if query.limit == 0 {
        return Err(ApiError::BadRequest("limit must be at least 1".to_string()));
    }

    let turns = state.history.history(&conversation_id, query.limit).await?;
    Ok(Json(json!({
        "conversation_id": conversation_id,
        "messages": turns,
    })))
}
