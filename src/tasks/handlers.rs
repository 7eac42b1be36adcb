use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::models::{TaskListQuery, TaskRequest, TaskScope, TaskStatus};
use super::services::TasksService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, SharedState};

/// GET /tasks?scope=all|mine|shared&status=open|done|all
pub async fn list_tasks(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Query(query): Query<TaskListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let scope = TaskScope::parse(query.scope.as_deref())?;
    let status = TaskStatus::parse(query.status.as_deref())?;

    let state = state_lock.read().await.clone();
    let tasks = TasksService::new(state.db)
        .list_tasks(&user.id, scope, status)
        .await?;

    Ok(Json(tasks))
}

/// POST /tasks
pub async fn create_task(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Json(request): Json<TaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let task = TasksService::new(state.db).create_task(&user.id, &request).await?;

    Ok((StatusCode::CREATED, Json(task)))
}

/// PUT /tasks/:id - Owner only
pub async fn update_task(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Path(task_id): Path<String>,
    Json(request): Json<TaskRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let task = TasksService::new(state.db)
        .update_task(&user.id, &task_id, &request)
        .await?;

    Ok(Json(task))
}

/// DELETE /tasks/:id - Owner only
pub async fn delete_task(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    TasksService::new(state.db).delete_task(&user.id, &task_id).await?;

    Ok(Json(json!({ "success": true })))
}

/// POST /tasks/:id/toggle
pub async fn toggle_task(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Path(task_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let task = TasksService::new(state.db).toggle_task(&user.id, &task_id).await?;

    Ok(Json(task))
}
