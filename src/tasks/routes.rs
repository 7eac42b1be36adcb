use axum::{
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};

use super::handlers;
use crate::auth::auth_middleware;
use crate::csrf_middleware::csrf_middleware;

/// Creates the tasks router
pub fn tasks_routes() -> Router {
    Router::new()
        .route("/tasks", get(handlers::list_tasks).post(handlers::create_task))
        .route(
            "/tasks/:id",
            put(handlers::update_task).delete(handlers::delete_task),
        )
        .route("/tasks/:id/toggle", post(handlers::toggle_task))
        .route_layer(from_fn(csrf_middleware))
        .route_layer(from_fn(auth_middleware))
}
