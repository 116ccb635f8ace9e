use std::sync::Arc;

use axum::extract::State;
use axum::response::IntoResponse;
use axum::Json;
use serde_json::json;

use crate::core::errors::ApiError;
use crate::state::AppState;

/// Readiness: the state only exists once the embedder probe and the index
/// load have succeeded, so reaching this handler means the service can
/// answer queries.
pub async fn health(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let index = state.index.current();
    Json(json!({
        "status": "ok",
        "index_chunks": index.len(),
        "dimension": index.dimension(),
    }))
}

pub async fn get_status(State(state): State<Arc<AppState>>) -> Result<impl IntoResponse, ApiError> {
    let index = state.index.current();
    let total_turns = state.history.total_turns().await.unwrap_or(0);
    Ok(Json(json!({
        "index": {
            "chunks": index.len(),
            "documents": index.meta().document_count,
            "embedding_model": index.meta().embedding_model,
            "created_at": index.meta().created_at,
        },
        "llm_model": state.settings.llm.model,
        "history_backend": state.settings.history.backend,
        "total_turns": total_turns,
    })))
}
