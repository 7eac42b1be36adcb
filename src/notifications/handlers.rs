use axum::{extract::Extension, response::IntoResponse, Json};
use serde_json::json;
use tracing::warn;

use super::models::{SubscribeRequest, UnsubscribeRequest, VapidKeyResponse};
use crate::auth::AuthedUser;
use crate::common::{ApiError, SharedState, Validator};

/// GET /notifications/vapid-public-key
pub async fn vapid_public_key(
    Extension(state_lock): Extension<SharedState>,
) -> Json<VapidKeyResponse> {
    let state = state_lock.read().await.clone();
    Json(VapidKeyResponse {
        public_key: state.notifications.vapid_public_key().map(str::to_string),
    })
}

/// POST /notifications/subscribe
pub async fn subscribe(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Json(request): Json<SubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate(&request).into_result()?;

    let state = state_lock.read().await.clone();
    state.notifications.subscribe(&user.id, &request).await?;

    Ok(Json(json!({ "success": true })))
}

/// POST /notifications/unsubscribe
pub async fn unsubscribe(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Json(request): Json<UnsubscribeRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let removed = state
        .notifications
        .unsubscribe(&user.id, &request.endpoint)
        .await?;

    Ok(Json(json!({ "success": true, "removed": removed })))
}

/// POST /notifications/test - Sends a test notification to the caller
pub async fn send_test(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let report = state
        .notifications
        .notify(
            &user.id,
            "Test notification",
            "Push notifications are working.",
            Some("/dashboard"),
        )
        .await?;

    if report.delivered == 0 {
        warn!(user_id = %user.id, "Test notification reached no device");
    }

    Ok(Json(json!({
        "success": true,
        "delivered": report.delivered,
        "failed": report.failed,
    })))
}

/// GET /notifications/pending - Unread notifications for the service worker
pub async fn pending(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    Ok(Json(state.notifications.pending(&user.id).await?))
}
