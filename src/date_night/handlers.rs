use axum::{
    extract::{Extension, Path, Query},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::models::{CategoryRequest, CompleteRequest, IdeaQuery, IdeaRequest};
use super::services::DateNightService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, SharedState};

/// GET /date-night/stats
pub async fn stats(
    Extension(state_lock): Extension<SharedState>,
    _user: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    Ok(Json(DateNightService::new(state.db).stats().await?))
}

/// GET /date-night/categories
pub async fn list_categories(
    Extension(state_lock): Extension<SharedState>,
    _user: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    Ok(Json(DateNightService::new(state.db).list_categories().await?))
}

/// POST /date-night/categories
pub async fn create_category(
    Extension(state_lock): Extension<SharedState>,
    _user: AuthedUser,
    Json(request): Json<CategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let category = DateNightService::new(state.db).create_category(&request).await?;

    Ok((StatusCode::CREATED, Json(category)))
}

/// GET /date-night/ideas?category_id=
pub async fn list_ideas(
    Extension(state_lock): Extension<SharedState>,
    _user: AuthedUser,
    Query(query): Query<IdeaQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let ideas = DateNightService::new(state.db)
        .list_ideas(query.category_id.as_deref())
        .await?;

    Ok(Json(ideas))
}

/// POST /date-night/ideas
pub async fn create_idea(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Json(request): Json<IdeaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let idea = DateNightService::new(state.db).create_idea(&user.id, &request).await?;

    Ok((StatusCode::CREATED, Json(idea)))
}

/// PUT /date-night/ideas/:id
pub async fn update_idea(
    Extension(state_lock): Extension<SharedState>,
    _user: AuthedUser,
    Path(idea_id): Path<String>,
    Json(request): Json<IdeaRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let idea = DateNightService::new(state.db).update_idea(&idea_id, &request).await?;

    Ok(Json(idea))
}

/// DELETE /date-night/ideas/:id
pub async fn delete_idea(
    Extension(state_lock): Extension<SharedState>,
    _user: AuthedUser,
    Path(idea_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    DateNightService::new(state.db).delete_idea(&idea_id).await?;

    Ok(Json(json!({ "success": true })))
}

/// POST /date-night/ideas/:id/complete
pub async fn complete_idea(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Path(idea_id): Path<String>,
    Json(request): Json<CompleteRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let result = DateNightService::new(state.db)
        .complete_idea(&user.id, &idea_id, &request)
        .await?;

    Ok((StatusCode::CREATED, Json(result)))
}

/// GET /date-night/random?category_id=
pub async fn random_idea(
    Extension(state_lock): Extension<SharedState>,
    _user: AuthedUser,
    Query(query): Query<IdeaQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let idea = DateNightService::new(state.db)
        .random_idea(query.category_id.as_deref())
        .await?;

    Ok(Json(idea))
}

/// GET /date-night/history
pub async fn history(
    Extension(state_lock): Extension<SharedState>,
    _user: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    Ok(Json(DateNightService::new(state.db).history().await?))
}
