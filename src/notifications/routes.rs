use axum::{
    middleware::from_fn,
    routing::{get, post},
    Router,
};

use super::handlers;
use crate::auth::auth_middleware;
use crate::csrf_middleware::csrf_middleware;

/// Creates the notifications router
pub fn notifications_routes() -> Router {
    Router::new()
        .route("/notifications/vapid-public-key", get(handlers::vapid_public_key))
        .route("/notifications/subscribe", post(handlers::subscribe))
        .route("/notifications/unsubscribe", post(handlers::unsubscribe))
        .route("/notifications/test", post(handlers::send_test))
        .route("/notifications/pending", get(handlers::pending))
        .route_layer(from_fn(csrf_middleware))
        .route_layer(from_fn(auth_middleware))
}
