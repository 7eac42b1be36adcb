use axum::{
    extract::{Extension, Path},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::json;
use tracing::{info, warn};

use super::models::{
    AcceptRequest, DeclineRequest, ScheduleSlot, SendResponse, SendScheduleRequest,
};
use super::services::ScheduleService;
use crate::auth::AuthedUser;
use crate::common::{
    helpers::display_time, safe_email_log, ApiError, AppState, SharedState, Validator,
};
use crate::services::email::{schedule_accepted_email, schedule_request_email, RenderedEmail, SlotLine};

fn slot_line(slot: &ScheduleSlot) -> SlotLine {
    SlotLine {
        start: display_time(&slot.start_time),
        end: display_time(&slot.end_time),
    }
}

/// Emails `user_id`; any failure is logged and reported as not sent
async fn email_user(state: &AppState, user_id: &str, email: &RenderedEmail) -> bool {
    let user = match state.auth_service.find_user(user_id).await {
        Ok(Some(user)) => user,
        Ok(None) => return false,
        Err(e) => {
            warn!(user_id = %user_id, error = %e, "Could not load email recipient");
            return false;
        }
    };

    match state.email_service.send(&user.email, email).await {
        Ok(sent) => sent,
        Err(e) => {
            warn!(to = %safe_email_log(&user.email), error = %e, "Schedule email failed");
            false
        }
    }
}

async fn push_user(state: &AppState, user_id: &str, title: &str, body: &str) {
    if let Err(e) = state
        .notifications
        .notify(user_id, title, body, Some("/dashboard#schedule"))
        .await
    {
        warn!(user_id = %user_id, error = %e, "Schedule push failed");
    }
}

/// GET /schedule - Incoming and outgoing requests
pub async fn overview(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let overview = ScheduleService::new(state.db).overview(&user.id).await?;

    Ok(Json(overview))
}

/// GET /schedule/users - People a request can be sent to
pub async fn users(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let users = ScheduleService::new(state.db.clone())
        .list_other_users(&user.id)
        .await?;

    Ok(Json(users))
}

/// POST /schedule/send
pub async fn send(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Json(request): Json<SendScheduleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    request.validate(&request).into_result()?;

    let state = state_lock.read().await.clone();
    let created = ScheduleService::new(state.db.clone())
        .create_request(&user.id, &request)
        .await?;

    let sender_name = user.user.display_name();
    let slots: Vec<SlotLine> = created.slots.iter().map(slot_line).collect();
    let email = schedule_request_email(
        &sender_name,
        &created.request.title,
        created.request.message.as_deref(),
        &slots,
        &state.config.app_url,
    );

    let email_sent = email_user(&state, &created.request.recipient_id, &email).await;
    if !email_sent {
        warn!(request_id = %created.request.id, "Schedule request saved but not emailed");
    }

    push_user(
        &state,
        &created.request.recipient_id,
        "New schedule request",
        &format!("{} wants to schedule {}", sender_name, created.request.title),
    )
    .await;

    Ok((
        StatusCode::CREATED,
        Json(SendResponse {
            success: true,
            request: created,
            email_sent,
        }),
    ))
}

/// POST /schedule/:id/accept - Recipient picks one of the proposed slots
pub async fn accept(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Path(request_id): Path<String>,
    Json(body): Json<AcceptRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    let (accepted, slot) = ScheduleService::new(state.db.clone())
        .accept(&user.id, &request_id, &body.slot_id)
        .await?;

    let recipient_name = user.user.display_name();
    let email = schedule_accepted_email(
        &recipient_name,
        &accepted.request.title,
        &slot_line(&slot),
        &state.config.app_url,
    );
    let email_sent = email_user(&state, &accepted.request.sender_id, &email).await;

    push_user(
        &state,
        &accepted.request.sender_id,
        "Schedule request accepted",
        &format!(
            "{} accepted {} for {}",
            recipient_name,
            accepted.request.title,
            display_time(&slot.start_time)
        ),
    )
    .await;

    info!(request_id = %request_id, email_sent = email_sent, "Acceptance delivered");

    Ok(Json(json!({
        "success": true,
        "request": accepted,
        "email_sent": email_sent,
    })))
}

/// POST /schedule/:id/decline
pub async fn decline(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Path(request_id): Path<String>,
    body: Option<Json<DeclineRequest>>,
) -> Result<impl IntoResponse, ApiError> {
    let body = body.map(|Json(b)| b).unwrap_or_default();

    let state = state_lock.read().await.clone();
    let declined = ScheduleService::new(state.db.clone())
        .decline(&user.id, &request_id, body.message.as_deref())
        .await?;

    push_user(
        &state,
        &declined.request.sender_id,
        "Schedule request declined",
        &format!("{} declined {}", user.user.display_name(), declined.request.title),
    )
    .await;

    Ok(Json(json!({ "success": true, "request": declined })))
}

/// DELETE /schedule/:id - Sender only
pub async fn delete(
    Extension(state_lock): Extension<SharedState>,
    user: AuthedUser,
    Path(request_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();
    ScheduleService::new(state.db).delete(&user.id, &request_id).await?;

    Ok(Json(json!({ "success": true })))
}
