// src/csrf_middleware.rs
//! CSRF protection for state-changing requests
//!
//! The token is read from the `X-CSRF-Token` header, or from a `csrf_token`
//! field in a JSON or urlencoded form body, and compared in constant time
//! with the session's token.

use axum::{
    body::{to_bytes, Body},
    extract::{Extension, Request},
    http::{header::CONTENT_TYPE, HeaderMap, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use tracing::warn;

use crate::common::{
    helpers::{constant_time_eq, wants_json},
    i18n::{translate, DEFAULT_LOCALE},
    ApiError, SharedState,
};
use crate::services::audit::RequestMeta;
use crate::session::Session;
use crate::site::views::error_page;

pub const CSRF_HEADER: &str = "x-csrf-token";
pub const CSRF_FIELD: &str = "csrf_token";

const MAX_BODY_BYTES: usize = 1024 * 1024;

fn is_state_changing(method: &Method) -> bool {
    matches!(
        *method,
        Method::POST | Method::PUT | Method::PATCH | Method::DELETE
    )
}

fn token_from_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(CSRF_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// Reads `csrf_token` from a JSON object or urlencoded form body
pub fn token_from_body(headers: &HeaderMap, body: &[u8]) -> Option<String> {
    let content_type = headers
        .get(CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();

    if content_type.starts_with("application/json") {
        let value: serde_json::Value = serde_json::from_slice(body).ok()?;
        return value
            .get(CSRF_FIELD)
            .and_then(|v| v.as_str())
            .map(str::to_string);
    }

    if content_type.starts_with("application/x-www-form-urlencoded") {
        return url::form_urlencoded::parse(body)
            .find(|(key, _)| key == CSRF_FIELD)
            .map(|(_, value)| value.into_owned());
    }

    None
}

fn rejection(headers: &HeaderMap, locale: &str) -> Response {
    let message = translate(locale, "error.csrf");
    if wants_json(headers) {
        ApiError::Forbidden(message.to_string()).into_response()
    } else {
        (StatusCode::FORBIDDEN, error_page(locale, message)).into_response()
    }
}

pub async fn csrf_middleware(
    Extension(state_lock): Extension<SharedState>,
    request: Request,
    next: Next,
) -> Response {
    if !is_state_changing(request.method()) {
        return next.run(request).await;
    }

    let Some(session) = request.extensions().get::<Session>().cloned() else {
        return ApiError::InternalServer("session layer missing".to_string()).into_response();
    };

    // Buffer the body only when the header is absent, then hand it on intact
    let (presented, request) = match token_from_header(request.headers()) {
        Some(token) => (Some(token), request),
        None => {
            let (parts, body) = request.into_parts();
            let bytes = match to_bytes(body, MAX_BODY_BYTES).await {
                Ok(bytes) => bytes,
                Err(_) => {
                    return ApiError::BadRequest("Request body too large".to_string())
                        .into_response()
                }
            };
            let token = token_from_body(&parts.headers, &bytes);
            (token, Request::from_parts(parts, Body::from(bytes)))
        }
    };

    let expected = session.csrf_token().await;
    let valid = presented
        .as_deref()
        .map_or(false, |token| constant_time_eq(token, &expected));

    if valid {
        return next.run(request).await;
    }

    let (parts, _body) = request.into_parts();
    let user_id = session.user_id().await;
    warn!(
        method = %parts.method,
        path = %parts.uri.path(),
        token_present = presented.is_some(),
        "CSRF validation failed"
    );

    let state = state_lock.read().await.clone();
    state
        .audit
        .record(
            "security.csrf_failure",
            user_id.as_deref(),
            &format!("CSRF check failed for {} {}", parts.method, parts.uri.path()),
            &RequestMeta::from_parts(&parts),
        )
        .await;

    let locale = session
        .locale()
        .await
        .unwrap_or_else(|| DEFAULT_LOCALE.to_string());
    rejection(&parts.headers, &locale)
}
