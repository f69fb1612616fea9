use std::sync::Arc;

use axum::http::HeaderValue;
use axum::routing::{get, post, put};
use axum::Router;
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use journal_agent::AgentRuntime;
use journal_core::JournalConfig;
use journal_store::Store;
use journal_tasks::TaskManager;
use journal_templates::TemplateProvider;

use crate::handlers;

/// Central shared state for the HTTP edge.
pub struct AppState {
    pub store: Store,
    pub config: JournalConfig,
    pub templates: TemplateProvider,
    pub tasks: TaskManager,
    pub agent: AgentRuntime,
    /// Per-session advisory lock, keyed `session:{session_id}`, kept here
    /// rather than in `journal-store` since it's a process-local
    /// concurrency primitive, not persisted state. Same keyed-lock-table
    /// shape as `journal_tasks::TaskManager`.
    session_locks: DashMap<String, Arc<Mutex<()>>>,
}

impl AppState {
    pub fn new(store: Store, config: JournalConfig, agent: AgentRuntime) -> Self {
        Self {
            store,
            config,
            templates: TemplateProvider::new(),
            tasks: TaskManager::new(),
            agent,
            session_locks: DashMap::new(),
        }
    }

    pub async fn lock_session(&self, session_id: &str) -> OwnedMutexGuard<()> {
        let key = format!("session:{session_id}");
        let lock = self
            .session_locks
            .entry(key)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        lock.lock_owned().await
    }
}

fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.iter().any(|o| o == "*") {
        return CorsLayer::permissive();
    }
    let values: Vec<HeaderValue> = origins.iter().filter_map(|o| o.parse().ok()).collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(values))
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Assembles the full Axum router.
pub fn build_router(state: Arc<AppState>) -> Router {
    let cors = cors_layer(&state.config.server.cors_origins);
    Router::new()
        .route("/health", get(handlers::health::health_handler))
        .route("/auth/register", post(handlers::auth::register_handler))
        .route("/auth/login", post(handlers::auth::login_handler))
        .route("/auth/me", get(handlers::auth::me_handler))
        .route(
            "/sessions",
            get(handlers::sessions::list_sessions_handler).post(handlers::sessions::create_session_handler),
        )
        .route("/agent/chat/{session_id}", post(handlers::chat::chat_handler))
        .route(
            "/user/preferences",
            get(handlers::preferences::get_preferences_handler).post(handlers::preferences::update_preferences_handler),
        )
        .route(
            "/user/template",
            get(handlers::templates::get_template_handler).post(handlers::templates::update_template_handler),
        )
        .route("/journal-entries", get(handlers::entries::list_entries_handler))
        .route("/journal-entries/{id}", get(handlers::entries::get_entry_handler))
        .route(
            "/tasks",
            get(handlers::tasks::list_tasks_handler).post(handlers::tasks::create_task_handler),
        )
        .route("/tasks/reorder", post(handlers::tasks::reorder_tasks_handler))
        .route(
            "/tasks/{id}",
            put(handlers::tasks::update_task_handler).delete(handlers::tasks::delete_task_handler),
        )
        .route("/tasks/{id}/complete", post(handlers::tasks::complete_task_handler))
        .layer(cors)
        .with_state(state)
        .layer(tower_http::trace::TraceLayer::new_for_http())
}
