use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;

use super::models::ShoppingItemRequest;
use super::services::ShoppingService;
use crate::auth::AuthedUser;
use crate::common::{ApiError, SharedState};

/// GET /shopping
pub async fn list_items(
    Extension(state_lock): Extension<SharedState>,
    _user: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    Ok(Json(ShoppingService::new(state.db).list_items().await?))
}

/// POST /shopping
pub async fn add_item(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Json(request): Json<ShoppingItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let item = ShoppingService::new(state.db).add_item(&user.id, &request).await?;

    Ok((StatusCode::CREATED, Json(item)))
}

/// PUT /shopping/:id
pub async fn update_item(
    Extension(state_lock): Extension<SharedState>,
    _user: AuthedUser,
    Path(item_id): Path<String>,
    Json(request): Json<ShoppingItemRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let item = ShoppingService::new(state.db).update_item(&item_id, &request).await?;

    Ok(Json(item))
}

/// POST /shopping/:id/toggle
pub async fn toggle_item(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let item = ShoppingService::new(state.db).toggle_item(&user.id, &item_id).await?;

    Ok(Json(item))
}

/// DELETE /shopping/:id
pub async fn delete_item(
    Extension(state_lock): Extension<SharedState>,
    _user: AuthedUser,
    Path(item_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    ShoppingService::new(state.db).delete_item(&item_id).await?;

    Ok(Json(json!({ "success": true })))
}

/// POST /shopping/clear-purchased
pub async fn clear_purchased(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let removed = ShoppingService::new(state.db).clear_purchased(&user.id).await?;

    Ok(Json(json!({ "success": true, "removed": removed })))
}
