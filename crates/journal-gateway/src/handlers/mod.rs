pub mod auth;
pub mod chat;
pub mod entries;
pub mod health;
pub mod preferences;
pub mod sessions;
pub mod tasks;
pub mod templates;

use axum::http::HeaderMap;

use journal_core::JournalError;
use journal_store::Tx;

use crate::app::AppState;
use crate::error::ApiError;

/// Extracts the bearer token from `Authorization: Bearer <token>`. Every
/// route except `/auth/register`, `/auth/login`, and `/health` requires it.
pub(crate) fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

/// Resolves the bearer token in `headers` to the owning user id, or
/// `Unauthorized` if missing/invalid/expired.
pub(crate) fn authenticate(state: &AppState, tx: &Tx<'_>, headers: &HeaderMap) -> Result<String, ApiError> {
    let token = extract_bearer(headers).ok_or(JournalError::Unauthorized)?;
    let auth = journal_auth::AuthService::new(&state.store, &state.config.auth);
    Ok(auth.require_user(tx, token)?)
}
