//! Task CRUD endpoints.

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{get, patch},
    Router,
};
use serde::Serialize;

use crate::automation;
use crate::document::{Board, Task};
use crate::store::{NewTask, StoreError, TaskPatch};

use super::routes::AppState;

pub fn routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/", get(list_tasks).post(create_task))
        .route("/:id", patch(update_task).delete(delete_task))
}

/// The whole board as the UI consumes it.
#[derive(Debug, Serialize)]
pub struct BoardResponse {
    pub statuses: Vec<String>,
    pub severities: Vec<String>,
    pub tasks: Vec<Task>,
}

impl From<Board> for BoardResponse {
    fn from(board: Board) -> Self {
        Self {
            statuses: board.config.statuses,
            severities: board.config.severities,
            tasks: board.tasks,
        }
    }
}

fn store_error(err: StoreError) -> (StatusCode, String) {
    let status = match &err {
        StoreError::Validation(_) => StatusCode::BAD_REQUEST,
        StoreError::TaskNotFound(_) | StoreError::DocumentMissing(_) => StatusCode::NOT_FOUND,
        StoreError::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, err.to_string())
}

/// GET /api/tasks
async fn list_tasks(
    State(state): State<Arc<AppState>>,
) -> Result<Json<BoardResponse>, (StatusCode, String)> {
    let board = state.store.read().await.map_err(store_error)?;
    Ok(Json(board.into()))
}

/// POST /api/tasks
async fn create_task(
    State(state): State<Arc<AppState>>,
    Json(req): Json<NewTask>,
) -> Result<(StatusCode, Json<Task>), (StatusCode, String)> {
    let task = state.store.create(req).await.map_err(store_error)?;
    Ok((StatusCode::CREATED, Json(task)))
}

/// PATCH /api/tasks/{id}
///
/// Applies a partial update, then evaluates the automation trigger on the
/// before/after snapshots. Automation failures never fail the request, and
/// the worker is never awaited here.
async fn update_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
    Json(req): Json<TaskPatch>,
) -> Result<Json<Task>, (StatusCode, String)> {
    let outcome = state.store.update(id, req).await.map_err(store_error)?;

    let settings = state.settings.get().await;
    automation::maybe_launch(&settings, &state.config.data_dir, &outcome).await;

    Ok(Json(outcome.after))
}

/// DELETE /api/tasks/{id}
async fn delete_task(
    State(state): State<Arc<AppState>>,
    Path(id): Path<u64>,
) -> Result<StatusCode, (StatusCode, String)> {
    state.store.delete(id).await.map_err(store_error)?;
    Ok(StatusCode::NO_CONTENT)
}
