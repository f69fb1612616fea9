use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::http::HeaderMap;
use axum::Json;
use serde::Deserialize;

use journal_store::types::{Task, TaskOrder, TaskPatch};

use crate::app::AppState;
use crate::error::ApiError;
use crate::handlers::authenticate;

#[derive(Deserialize)]
pub struct ListTasksQuery {
    #[serde(default)]
    pub include_completed: bool,
}

/// `GET /tasks?include_completed=<bool>`.
pub async fn list_tasks_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListTasksQuery>,
    headers: HeaderMap,
) -> Result<Json<Vec<Task>>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let tasks = state
        .tasks
        .list_tasks(&state.store, &tx, &user_id, query.include_completed)
        .await?;
    tx.commit()?;
    Ok(Json(tasks))
}

#[derive(Deserialize)]
pub struct CreateTaskRequest {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub priority: Option<i64>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub source_session_id: Option<String>,
}

/// `POST /tasks`.
pub async fn create_task_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<CreateTaskRequest>,
) -> Result<Json<Task>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let task = state
        .tasks
        .create_task(
            &state.store,
            &tx,
            &user_id,
            &req.title,
            req.description.as_deref(),
            req.priority,
            req.due_date.as_deref(),
            req.source_session_id.as_deref(),
        )
        .await?;
    tx.commit()?;
    Ok(Json(task))
}

/// `PUT /tasks/{id}`.
pub async fn update_task_handler(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
    Json(patch): Json<TaskPatch>,
) -> Result<Json<Task>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let task = state.tasks.update_task(&state.store, &tx, &user_id, &task_id, &patch).await?;
    tx.commit()?;
    Ok(Json(task))
}

/// `POST /tasks/{id}/complete`.
pub async fn complete_task_handler(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<Task>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    let task = state.tasks.complete_task(&state.store, &tx, &user_id, &task_id).await?;
    tx.commit()?;
    Ok(Json(task))
}

/// `DELETE /tasks/{id}`.
pub async fn delete_task_handler(
    State(state): State<Arc<AppState>>,
    Path(task_id): Path<String>,
    headers: HeaderMap,
) -> Result<Json<serde_json::Value>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    state.tasks.delete_task(&state.store, &tx, &user_id, &task_id).await?;
    tx.commit()?;
    Ok(Json(serde_json::json!({"message": "task deleted"})))
}

#[derive(Deserialize)]
pub struct ReorderTasksRequest {
    pub task_orders: Vec<TaskOrder>,
}

/// `POST /tasks/reorder`.
pub async fn reorder_tasks_handler(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Json(req): Json<ReorderTasksRequest>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let tx = state.store.begin()?;
    let user_id = authenticate(&state, &tx, &headers)?;
    state
        .tasks
        .reorder_tasks(&state.store, &tx, &user_id, &req.task_orders)
        .await?;
    tx.commit()?;
    Ok(Json(serde_json::json!({"message": "tasks reordered"})))
}
