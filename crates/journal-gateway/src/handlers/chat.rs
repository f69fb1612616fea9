use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::authenticate;

#[derive(Deserialize)]
pub struct ChatRequest {
    pub text: String,
    #[serde(default)]
    #[allow(dead_code)]
    pub metadata: Value,
}

#[derive(Serialize)]
pub struct ToolCallView {
    pub name: String,
    pub input: Value,
    pub output: String,
    pub is_error: bool,
}

#[derive(Serialize)]
pub struct ChatResponse {
    pub text: String,
    pub session_id: String,
    pub updated_draft_data: Map<String, Value>,
    pub tool_calls: Vec<ToolCallView>,
    pub metadata: Value,
}

/// `POST /agent/chat/{session_id}`.
///
/// Holds the session's advisory lock for the whole turn and only commits
/// the transaction on success: an error from `AgentRuntime::turn` leaves
/// the `Tx` to roll back on drop, which undoes the early-persisted user
/// message along with everything else the turn attempted. That keeps the
/// message from being lost on failure and keeps a failed turn from leaving
/// an orphaned message behind, both at once.
pub async fn chat_handler(
    State(state): State<Arc<AppState>>,
    Path(session_id): Path<String>,
    headers: HeaderMap,
    Json(req): Json<ChatRequest>,
) -> Result<Json<ChatResponse>, ApiError> {
    let _session_guard = state.lock_session(&session_id).await;

    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;

    let result = state
        .agent
        .turn(
            &state.store,
            &tx,
            &state.templates,
            &state.tasks,
            &user_id,
            &session_id,
            &req.text,
        )
        .await;

    let turn = match result {
        Ok(turn) => turn,
        Err(e) => return Err(e.into()),
    };

    tx.commit()?;

    let metadata = serde_json::json!({"overflow": turn.overflow});
    Ok(Json(ChatResponse {
        text: turn.text,
        session_id: turn.session_id,
        updated_draft_data: turn.updated_draft_data,
        tool_calls: turn
            .tool_calls
            .into_iter()
            .map(|c| ToolCallView {
                name: c.name,
                input: c.input,
                output: c.output,
                is_error: c.is_error,
            })
            .collect(),
        metadata,
    }))
}
