use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::auth::{auth_middleware, guest_middleware};
use crate::csrf_middleware::csrf_middleware;
use crate::rate_limit_middleware::rate_limit_middleware;

/// Pages, browser assets and health checks
pub fn site_routes() -> Router {
    let landing = Router::new()
        .route("/", get(handlers::landing))
        .route_layer(from_fn(guest_middleware));

    let dashboard = Router::new()
        .route("/dashboard", get(handlers::dashboard))
        .route_layer(from_fn(auth_middleware));

    let locale = Router::new()
        .route("/locale/switch", post(handlers::switch_locale))
        .route_layer(from_fn(csrf_middleware));

    let csp = Router::new()
        .route("/csp-report", post(handlers::csp_report))
        .route_layer(from_fn(rate_limit_middleware));

    let public = Router::new()
        .route("/manifest.json", get(handlers::manifest))
        .route("/service-worker.js", get(handlers::service_worker))
        .route("/health", get(handlers::health))
        .route("/health/db", get(handlers::health_db));

    landing
        .merge(dashboard)
        .merge(locale)
        .merge(csp)
        .merge(public)
}
