use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use journal_store::types::ChatSession;

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::authenticate;

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    #[serde(default = "default_conversation_type")]
    pub conversation_type: String,
    #[serde(default)]
    pub metadata: Value,
}

fn default_conversation_type() -> String {
    "journaling".to_string()
}

#[derive(Serialize)]
pub struct CreateSessionResponse {
    pub session_id: String,
    pub conversation_type: String,
    pub created_at: String,
}

/// `POST /sessions`.
pub async fn create_session_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateSessionRequest>,
) -> Result<Json<CreateSessionResponse>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let session = state
        .store
        .create_session(&tx, &user_id, &req.conversation_type, req.metadata)?;
    tx.commit()?;
    Ok(Json(CreateSessionResponse {
        session_id: session.id,
        conversation_type: session.conversation_type,
        created_at: session.created_at,
    }))
}

/// `GET /sessions`.
pub async fn list_sessions_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<ChatSession>>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let sessions = state.store.list_sessions_for_user(&tx, &user_id)?;
    tx.commit()?;
    Ok(Json(sessions))
}
