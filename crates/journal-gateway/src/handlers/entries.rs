use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::HeaderMap;
use axum::Json;

use journal_core::JournalError;
use journal_store::types::JournalEntry;

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::authenticate;

/// `GET /journal-entries`.
pub async fn list_entries_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<Vec<JournalEntry>>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let entries = state.store.get_journal_entries(&tx, &user_id)?;
    tx.commit()?;
    Ok(Json(entries))
}

/// `GET /journal-entries/{id}`.
///
/// An entry owned by another user is indistinguishable from a nonexistent
/// one (404, not 403) — the store query itself is scoped by `user_id`.
pub async fn get_entry_handler(
    State(state): State<Arc<AppState>>,
    Path(entry_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<JournalEntry>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let entry = state
        .store
        .get_journal_entry(&tx, &user_id, &entry_id)?
        .ok_or_else(|| JournalError::NotFound(format!("journal entry {entry_id}")))?;
    tx.commit()?;
    Ok(Json(entry))
}
