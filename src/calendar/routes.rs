use axum::{middleware::from_fn, routing::get, Router};

use super::handlers;
use crate::auth::auth_middleware;
use crate::csrf_middleware::csrf_middleware;

/// Creates the calendar router. Every route requires a signed-in user;
/// mutating requests also need a CSRF token.
pub fn calendar_routes() -> Router {
    Router::new()
        .route(
            "/calendar/events",
            get(handlers::list_events).post(handlers::create_event),
        )
        .route(
            "/calendar/events/:id",
            get(handlers::get_event)
                .put(handlers::update_event)
                .delete(handlers::delete_event),
        )
        .route_layer(from_fn(csrf_middleware))
        .route_layer(from_fn(auth_middleware))
}
