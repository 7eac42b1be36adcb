// src/router.rs
use axum::{
    extract::Extension,
    middleware,
    response::{IntoResponse, Response},
    Router,
};
use std::any::Any;
use tower_http::{catch_panic::CatchPanicLayer, trace::TraceLayer};
use tracing::error;

use crate::common::{ApiError, SharedState};
use crate::{
    auth, calendar, date_night, logging_middleware, notifications, rate_limit_middleware,
    schedule, security_middleware, session, shopping, site, tasks,
};

fn handle_panic(err: Box<dyn Any + Send + 'static>) -> Response {
    let detail = err
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| err.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = %detail, "Handler panicked");

    ApiError::InternalServer(detail.to_string()).into_response()
}

/// Every feature router plus the global layers.
///
/// Layers run outside-in: panic catcher, tracing, app state, security
/// headers, session, client address, debug body logging; then each route's
/// own middleware.
pub fn build_router(shared: SharedState) -> Router {
    Router::new()
        // ====================================================================
        // PAGES, ASSETS AND HEALTH
        // ====================================================================
        .merge(site::site_routes())
        // ====================================================================
        // AUTHENTICATION ROUTES
        // ====================================================================
        .merge(auth::auth_routes())
        // ====================================================================
        // HOUSEHOLD FEATURES
        // ====================================================================
        .merge(calendar::calendar_routes())
        .merge(tasks::tasks_routes())
        .merge(schedule::schedule_routes())
        .merge(notifications::notifications_routes())
        .merge(date_night::date_night_routes())
        .merge(shopping::shopping_routes())
        .fallback(site::not_found)
        // ====================================================================
        // MIDDLEWARE AND LAYERS
        // ====================================================================
        .layer(middleware::from_fn(logging_middleware::log_request_response))
        .layer(middleware::from_fn(rate_limit_middleware::client_ip_middleware))
        .layer(middleware::from_fn(session::session_middleware))
        .layer(middleware::from_fn(
            security_middleware::security_headers_middleware,
        ))
        .layer(Extension(shared))
        .layer(TraceLayer::new_for_http())
        .layer(CatchPanicLayer::custom(handle_panic))
}
