//! Route-level access middleware: `auth_middleware` for signed-in pages and
//! APIs, `guest_middleware` for pages only anonymous visitors should see

use axum::{
    extract::Request,
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use crate::common::{helpers::wants_json, ApiError};
use crate::session::Session;

fn request_session(request: &Request) -> Result<Session, Response> {
    request
        .extensions()
        .get::<Session>()
        .cloned()
        .ok_or_else(|| {
            ApiError::InternalServer("session layer missing".to_string()).into_response()
        })
}

/// No signed-in user: 401 JSON for API clients, redirect to `/` otherwise
pub async fn auth_middleware(request: Request, next: Next) -> Response {
    let session = match request_session(&request) {
        Ok(session) => session,
        Err(response) => return response,
    };

    if session.is_authenticated().await {
        return next.run(request).await;
    }

    debug!(path = %request.uri().path(), "Unauthenticated request rejected");

    if wants_json(request.headers()) {
        ApiError::Unauthorized("Authentication required".to_string()).into_response()
    } else {
        Redirect::to("/").into_response()
    }
}

/// Signed-in users are sent to the dashboard
pub async fn guest_middleware(request: Request, next: Next) -> Response {
    let session = match request_session(&request) {
        Ok(session) => session,
        Err(response) => return response,
    };

    if session.is_authenticated().await {
        return Redirect::to("/dashboard").into_response();
    }

    next.run(request).await
}
