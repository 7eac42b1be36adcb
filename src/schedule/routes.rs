use axum::{
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};

use super::handlers;
use crate::auth::auth_middleware;
use crate::csrf_middleware::csrf_middleware;
use crate::rate_limit_middleware::rate_limit_middleware;

/// Creates the schedule router
pub fn schedule_routes() -> Router {
    // Sending triggers outbound email, so it is also rate limited
    let send = Router::new()
        .route("/schedule/send", post(handlers::send))
        .route_layer(from_fn(csrf_middleware))
        .route_layer(from_fn(auth_middleware))
        .route_layer(from_fn(rate_limit_middleware));

    let respond = Router::new()
        .route("/schedule", get(handlers::overview))
        .route("/schedule/users", get(handlers::users))
        .route("/schedule/:id/accept", post(handlers::accept))
        .route("/schedule/:id/decline", post(handlers::decline))
        .route("/schedule/:id", delete(handlers::delete))
        .route_layer(from_fn(csrf_middleware))
        .route_layer(from_fn(auth_middleware));

    send.merge(respond)
}
