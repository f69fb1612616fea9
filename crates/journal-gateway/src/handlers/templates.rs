use std::sync::Arc;

use axum::extract::State;
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use journal_core::ids::now;
use journal_store::types::{TemplateSection, UserTemplate};

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::authenticate;

/// `GET /user/template` — the user's active template if set, else the
/// process-wide default catalogue wrapped in an inactive placeholder
/// (there is no row to return until the user sets one explicitly).
pub async fn get_template_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Result<Json<UserTemplate>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let template = match state.store.get_active_template(&tx, &user_id)? {
        Some(t) => t,
        None => {
            let sections = state.templates.effective_sections(&state.store, &tx, &user_id)?;
            let ts = now();
            UserTemplate {
                id: "default".to_string(),
                user_id: user_id.clone(),
                name: "default".to_string(),
                sections,
                is_active: false,
                created_at: ts.clone(),
                updated_at: ts,
            }
        }
    };
    tx.commit()?;
    Ok(Json(template))
}

#[derive(Deserialize)]
pub struct UpdateTemplateRequest {
    pub name: String,
    pub sections: Vec<TemplateSection>,
}

/// `POST /user/template` — replaces the user's active template.
pub async fn update_template_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<UpdateTemplateRequest>,
) -> Result<Json<journal_store::types::UserTemplate>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let template = state
        .store
        .set_active_template(&tx, &user_id, &req.name, &req.sections)?;
    tx.commit()?;
    Ok(Json(template))
}
