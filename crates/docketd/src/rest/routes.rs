use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use docket_core::tasks::{NewTask, Task, TaskPatch, TaskRepository as _};
use serde_json::{json, Value};

use super::{error::ApiError, Repo};

pub async fn health(State(repo): State<Repo>) -> Result<Json<Value>, ApiError> {
    let tasks = repo.list().await?;
    Ok(Json(json!({
        "status": "ok",
        "version": env!("CARGO_PKG_VERSION"),
        "tasks": tasks.len(),
    })))
}

pub async fn list_tasks(State(repo): State<Repo>) -> Result<Json<Vec<Task>>, ApiError> {
    Ok(Json(repo.list().await?))
}

pub async fn create_task(
    State(repo): State<Repo>,
    payload: Result<Json<NewTask>, JsonRejection>,
) -> Result<(StatusCode, Json<Task>), ApiError> {
    let Json(draft) = payload.map_err(|err| ApiError::bad_request(err.body_text()))?;
    let task = repo.create(draft).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn get_task(
    State(repo): State<Repo>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<Json<Task>, ApiError> {
    Ok(Json(repo.get(task_id(id)?).await?))
}

pub async fn update_task(
    State(repo): State<Repo>,
    id: Result<Path<u64>, PathRejection>,
    payload: Result<Json<TaskPatch>, JsonRejection>,
) -> Result<Json<Task>, ApiError> {
    let id = task_id(id)?;
    let Json(patch) = payload.map_err(|err| ApiError::bad_request(err.body_text()))?;
    Ok(Json(repo.update(id, patch).await?))
}

pub async fn delete_task(
    State(repo): State<Repo>,
    id: Result<Path<u64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    repo.delete(task_id(id)?).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// A non-numeric id segment answers 404 rather than axum's default 400: the
/// route only exists for integer ids.
fn task_id(id: Result<Path<u64>, PathRejection>) -> Result<u64, ApiError> {
    match id {
        Ok(Path(id)) => Ok(id),
        Err(_) => Err(ApiError::not_found("Task not found.")),
    }
}
