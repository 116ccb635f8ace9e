use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::chat::ChatAnswer;
use crate::core::errors::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequestBody {
    pub conversation_id: String,
    pub query: String,
}

/// `POST /api/chat` — answer a question within a conversation.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(body): Json<ChatRequestBody>,
) -> Result<Json<ChatAnswer>, ApiError> {
    let request_id = uuid::Uuid::new_v4();
    tracing::info!(
        %request_id,
        conversation = %body.conversation_id,
        "chat request"
    );

    let answer = state
        .synthesizer
        .answer(&body.conversation_id, &body.query)
        .await
        .map_err(|err| {
            tracing::warn!(%request_id, error = %err, "chat request failed");
            err
        })?;

    tracing::info!(%request_id, sources = answer.sources.len(), "chat request answered");
    Ok(Json(answer))
}
