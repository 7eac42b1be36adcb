use axum::{
    body::Bytes,
    extract::Extension,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect, Response},
    Json,
};
use chrono::Utc;
use serde_json::{json, Value};
use tracing::{debug, warn};

use super::views::{self, DashboardView};
use crate::auth::AuthedUser;
use crate::calendar::CalendarService;
use crate::common::{
    helpers::wants_json,
    i18n::{is_supported, translate, DEFAULT_LOCALE},
    ApiError, SharedState,
};
use crate::security_middleware::CspNonce;
use crate::services::audit::RequestMeta;
use crate::session::Session;
use crate::tasks::{
    models::{TaskScope, TaskStatus},
    TasksService,
};

const MAX_CSP_DETAIL_CHARS: usize = 1000;

async fn session_locale(session: &Session) -> String {
    session
        .locale()
        .await
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string())
}

/// GET / - Landing page for signed-out visitors
pub async fn landing(session: Session) -> impl IntoResponse {
    let locale = session_locale(&session).await;
    let flash = session.take_flash().await;
    views::landing_page(&locale, flash.as_deref())
}

/// GET /dashboard - Today's events and open tasks
pub async fn dashboard(
    Extension(state_lock): Extension<SharedState>,
    Extension(nonce): Extension<CspNonce>,
    user: AuthedUser,
    session: Session,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    let today = Utc::now().format("%Y-%m-%d").to_string();
    let day_start = format!("{}T00:00:00Z", today);
    let day_end = format!("{}T23:59:59Z", today);

    let events = CalendarService::new(state.db.clone())
        .list_events(&user.id, Some(&day_start), Some(&day_end))
        .await?;
    let tasks = TasksService::new(state.db)
        .list_tasks(&user.id, TaskScope::All, TaskStatus::Open)
        .await?;

    let locale = session_locale(&session).await;
    let csrf_token = session.csrf_token().await;
    let flash = session.take_flash().await;
    let user_name = user.user.display_name();

    Ok(views::dashboard_page(&DashboardView {
        locale: &locale,
        user_name: &user_name,
        csrf_token: &csrf_token,
        nonce: &nonce.0,
        flash: flash.as_deref(),
        events: &events,
        tasks: &tasks,
    }))
}

/// `locale` from a JSON or urlencoded body
fn locale_from_body(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    let is_json = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.starts_with("application/json"))
        .unwrap_or(false);

    if is_json {
        serde_json::from_slice::<Value>(body)
            .ok()?
            .get("locale")?
            .as_str()
            .map(str::to_string)
    } else {
        url::form_urlencoded::parse(body)
            .find(|(key, _)| key == "locale")
            .map(|(_, value)| value.into_owned())
    }
}

/// POST /locale/switch
pub async fn switch_locale(
    session: Session,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let locale = locale_from_body(&headers, &body)
        .map(|l| l.trim().to_ascii_lowercase())
        .filter(|l| is_supported(l))
        .ok_or_else(|| ApiError::BadRequest("Unsupported locale".to_string()))?;

    session.set_locale(&locale).await;
    debug!(locale = %locale, "Locale switched");

    if wants_json(&headers) {
        return Ok(Json(json!({ "success": true, "locale": locale })).into_response());
    }

    // Back to the same-origin page the form was posted from
    let back = headers
        .get(header::REFERER)
        .and_then(|v| v.to_str().ok())
        .and_then(|r| url::Url::parse(r).ok())
        .map(|u| u.path().to_string())
        .filter(|p| p.starts_with('/') && !p.starts_with("//"))
        .unwrap_or_else(|| "/".to_string());

    Ok(Redirect::to(&back).into_response())
}

/// GET /manifest.json
pub async fn manifest() -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/manifest+json")],
        views::MANIFEST_JSON,
    )
}

/// GET /service-worker.js
pub async fn service_worker() -> impl IntoResponse {
    (
        [
            (header::CONTENT_TYPE, "application/javascript"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        views::SERVICE_WORKER_JS,
    )
}

/// GET /health
pub async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// GET /health/db
pub async fn health_db(
    Extension(state_lock): Extension<SharedState>,
) -> Result<impl IntoResponse, ApiError> {
    let state = state_lock.read().await.clone();

    sqlx::query("SELECT 1")
        .execute(&state.db)
        .await
        .map_err(|e| {
            warn!(error = %e, "Database health check failed");
            ApiError::ServiceUnavailable("Database unavailable".to_string())
        })?;

    Ok(Json(json!({ "status": "ok", "database": "ok" })))
}

/// Short summary of a browser CSP report for the audit log
fn summarize_csp_report(body: &[u8]) -> String {
    let Ok(value) = serde_json::from_slice::<Value>(body) else {
        return "unparseable report".to_string();
    };
    let report = value.get("csp-report").unwrap_or(&value);
    let field = |name: &str| report.get(name).and_then(Value::as_str).unwrap_or("-");

    let summary = format!(
        "directive={} blocked={} document={}",
        field("violated-directive"),
        field("blocked-uri"),
        field("document-uri"),
    );
    summary.chars().take(MAX_CSP_DETAIL_CHARS).collect()
}

/// POST /csp-report - Browsers post policy violations here
pub async fn csp_report(
    Extension(state_lock): Extension<SharedState>,
    meta: RequestMeta,
    body: Bytes,
) -> StatusCode {
    let state = state_lock.read().await.clone();
    let detail = summarize_csp_report(&body);

    warn!(report = %detail, "CSP violation reported");
    state
        .audit
        .record("security.csp_violation", None, &detail, &meta)
        .await;

    StatusCode::NO_CONTENT
}

/// Fallback for unmatched routes
pub async fn not_found(session: Option<Session>, headers: HeaderMap) -> Response {
    if wants_json(&headers) {
        return ApiError::NotFound("Not found".to_string()).into_response();
    }

    let locale = match session {
        Some(session) => session_locale(&session).await,
        None => DEFAULT_LOCALE.to_string(),
    };
    (
        StatusCode::NOT_FOUND,
        views::error_page(&locale, translate(&locale, "error.not_found")),
    )
        .into_response()
}
