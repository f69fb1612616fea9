use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::{Deserialize, Serialize};

use journal_core::JournalError;

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::authenticate;

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub username: String,
    #[serde(default)]
    pub email: Option<String>,
    pub password: String,
}

#[derive(Serialize)]
pub struct RegisterResponse {
    pub user_id: String,
    pub username: String,
}

/// `POST /auth/register`.
pub async fn register_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<RegisterRequest>,
) -> Result<Json<RegisterResponse>, ApiError> {
    if req.username.trim().is_empty() {
        return Err(JournalError::Validation("username is required".into()).into());
    }

    let tx = state.store.begin()?;
    let auth = journal_auth::AuthService::new(&state.store, &state.config.auth);
    let user = auth.register(&tx, &req.username, req.email.as_deref(), &req.password)?;
    tx.commit()?;

    Ok(Json(RegisterResponse {
        user_id: user.id,
        username: user.username,
    }))
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

#[derive(Serialize)]
pub struct LoginResponse {
    pub access_token: String,
    pub token_type: String,
    pub expires_in: i64,
    pub user_id: String,
    pub username: String,
}

/// `POST /auth/login`.
pub async fn login_handler(
    State(state): State<Arc<AppState>>,
    Json(req): Json<LoginRequest>,
) -> Result<Json<LoginResponse>, ApiError> {
    let tx = state.store.begin()?;
    let auth = journal_auth::AuthService::new(&state.store, &state.config.auth);
    let (user, issued) = auth.login(&tx, &req.username, &req.password)?;
    tx.commit()?;

    Ok(Json(LoginResponse {
        access_token: issued.token,
        token_type: "bearer".to_string(),
        expires_in: issued.expires_in,
        user_id: user.id,
        username: user.username,
    }))
}

#[derive(Serialize)]
pub struct MeResponse {
    pub user_id: String,
    pub username: String,
    pub email: Option<String>,
    pub is_verified: bool,
    pub created_at: String,
}

/// `GET /auth/me`.
pub async fn me_handler(State(state): State<Arc<AppState>>, headers: HeaderMap) -> Result<Json<MeResponse>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let user = state
        .store
        .get_user_by_id(&tx, &user_id)?
        .ok_or_else(|| JournalError::NotFound(format!("user {user_id}")))?;
    tx.commit()?;

    Ok(Json(MeResponse {
        user_id: user.id,
        username: user.username,
        email: user.email,
        is_verified: user.is_verified,
        created_at: user.created_at,
    }))
}
