use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;

use journal_store::types::{PreferencesPatch, UserPreferences};

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::authenticate;

/// `GET /user/preferences`.
pub async fn get_preferences_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserPreferences>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let prefs = state.store.get_or_create_preferences(&tx, &user_id)?;
    tx.commit()?;
    Ok(Json(prefs))
}

/// `POST /user/preferences` — partial update, list fields replace, glossary merges.
pub async fn update_preferences_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(patch): Json<PreferencesPatch>,
) -> Result<Json<UserPreferences>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let prefs = state.store.upsert_preferences(&tx, &user_id, &patch)?;
    tx.commit()?;
    Ok(Json(prefs))
}
