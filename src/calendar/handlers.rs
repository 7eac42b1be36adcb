use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::models::{EventRangeQuery, EventRequest};
use super::services::CalendarService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, SharedState};

/// GET /calendar/events?start=&end= - Own events overlapping the range
pub async fn list_events(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Query(range): Query<EventRangeQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let service = CalendarService::new(state.db);

    let events = service
        .list_events(&user.id, range.start.as_deref(), range.end.as_deref())
        .await?;

    Ok(Json(events))
}

/// POST /calendar/events
pub async fn create_event(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Json(request): Json<EventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let service = CalendarService::new(state.db);

    let event = service.create_event(&user.id, &request).await?;

    Ok((StatusCode::CREATED, Json(event)))
}

/// GET /calendar/events/:id
pub async fn get_event(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let service = CalendarService::new(state.db);

    Ok(Json(service.get_event(&user.id, &event_id).await?))
}

/// PUT /calendar/events/:id
pub async fn update_event(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Path(event_id): Path<String>,
    Json(request): Json<EventRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let service = CalendarService::new(state.db);

    Ok(Json(service.update_event(&user.id, &event_id, &request).await?))
}

/// DELETE /calendar/events/:id
pub async fn delete_event(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Path(event_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let service = CalendarService::new(state.db);

    service.delete_event(&user.id, &event_id).await?;

    Ok(Json(json!({ "success": true })))
}
