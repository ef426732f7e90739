/// Task endpoints
///
/// Reads are public; writes require a bearer token and are stamped with the
/// caller's user ID.
///
/// - `GET /tasks` - Search (`query`, `status`, `sortBy`, `sortDir`, `page`, `pageSize`)
/// - `GET /tasks/:id` - Fetch one task
/// - `POST /tasks` - Create (auth)
/// - `PUT /tasks/:id` - Replace (auth)
/// - `DELETE /tasks/:id` - Delete (auth)

use crate::{app::AppState, error::ApiResult};
use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        Path, Query, State,
    },
    http::StatusCode,
    Extension, Json,
};
use taskdesk_shared::{
    auth::middleware::AuthContext,
    models::task::{TaskDetails, TaskFilter, TaskInput},
};
use uuid::Uuid;

/// Search tasks
///
/// An empty result is `200 []`.
pub async fn list_tasks(
    State(state): State<AppState>,
    filter: Result<Query<TaskFilter>, QueryRejection>,
) -> ApiResult<Json<Vec<TaskDetails>>> {
    let Query(filter) = filter?;
    Ok(Json(state.task_service.search(filter).await?))
}

pub async fn get_task(
    State(state): State<AppState>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<Json<TaskDetails>> {
    let Path(id) = id?;
    Ok(Json(state.task_service.get_by_id(id).await?))
}

/// Create a task
///
/// # Request
///
/// ```json
/// {
///   "title": "Buy milk",
///   "description": "2%",
///   "dueDate": "2025-03-01T00:00:00Z",
///   "status": "Pending",
///   "remarks": "urgent"
/// }
/// ```
///
/// # Errors
///
/// - `400 Bad Request`: Validation failed
/// - `401 Unauthorized`: Missing or invalid token
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    payload: Result<Json<TaskInput>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<TaskDetails>)> {
    let Json(input) = payload?;
    let task = state.task_service.create(input, auth.user_id).await?;
    Ok((StatusCode::CREATED, Json(task)))
}

pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
    payload: Result<Json<TaskInput>, JsonRejection>,
) -> ApiResult<Json<TaskDetails>> {
    let Path(id) = id?;
    let Json(input) = payload?;
    Ok(Json(state.task_service.update(id, input, auth.user_id).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    id: Result<Path<Uuid>, PathRejection>,
) -> ApiResult<StatusCode> {
    let Path(id) = id?;
    state.task_service.delete(id, auth.user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
