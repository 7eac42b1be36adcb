// src/logging_middleware.rs
//! Middleware for logging request and response bodies in debug mode

use axum::body::to_bytes;
use axum::{body::Body, extract::Request, http::StatusCode, middleware::Next, response::Response};
use tracing::{debug, Level};

use crate::common::helpers::redact_emails;

const MAX_LOGGED_BODY: usize = 4 * 1024 * 1024;

/// Pretty-prints JSON bodies; emails are masked either way
fn render_body(bytes: &[u8]) -> Option<String> {
    let body_str = std::str::from_utf8(bytes).ok()?;
    let rendered = match serde_json::from_str::<serde_json::Value>(body_str) {
        Ok(json) => serde_json::to_string_pretty(&json).unwrap_or_else(|_| body_str.to_string()),
        Err(_) => body_str.to_string(),
    };
    Some(redact_emails(&rendered))
}

/// Logs request and response bodies. Only buffers when debug logging is on.
pub async fn log_request_response(request: Request, next: Next) -> Result<Response, StatusCode> {
    if !tracing::enabled!(Level::DEBUG) {
        return Ok(next.run(request).await);
    }

    let (parts, body) = request.into_parts();

    let bytes = to_bytes(body, MAX_LOGGED_BODY)
        .await
        .map_err(|_| StatusCode::PAYLOAD_TOO_LARGE)?;

    if let Some(request_body) = render_body(&bytes).filter(|b| !b.is_empty()) {
        debug!(
            method = %parts.method,
            uri = %parts.uri,
            request_body = %request_body,
            "📥 Request"
        );
    }

    let response = next.run(Request::from_parts(parts, Body::from(bytes))).await;

    let (parts, body) = response.into_parts();

    // Only JSON responses are logged
    let is_json = parts
        .headers
        .get(axum::http::header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .map_or(false, |ct| ct.starts_with("application/json"));

    if !is_json {
        return Ok(Response::from_parts(parts, body));
    }

    let bytes = to_bytes(body, MAX_LOGGED_BODY)
        .await
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)?;

    if let Some(response_body) = render_body(&bytes).filter(|b| !b.is_empty()) {
        debug!(
            status = %parts.status,
            response_body = %response_body,
            "📤 Response"
        );
    }

    Ok(Response::from_parts(parts, Body::from(bytes)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_body_masks_emails() {
        let rendered = render_body(br#"{"email":"alex@example.com"}"#).unwrap();
        assert!(!rendered.contains("alex@example.com"));
        assert!(rendered.contains("a***@example.com"));
    }

    #[test]
    fn test_render_body_rejects_binary() {
        assert!(render_body(&[0xff, 0xfe, 0x00]).is_none());
    }
}
