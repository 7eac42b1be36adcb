use axum::{
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};

use super::handlers;
use crate::auth::auth_middleware;
use crate::csrf_middleware::csrf_middleware;

/// Creates the date night router
pub fn date_night_routes() -> Router {
    Router::new()
        .route("/date-night/stats", get(handlers::stats))
        .route(
            "/date-night/categories",
            get(handlers::list_categories).post(handlers::create_category),
        )
        .route(
            "/date-night/ideas",
            get(handlers::list_ideas).post(handlers::create_idea),
        )
        .route(
            "/date-night/ideas/:id",
            put(handlers::update_idea).delete(handlers::delete_idea),
        )
        .route("/date-night/ideas/:id/complete", post(handlers::complete_idea))
        .route("/date-night/random", get(handlers::random_idea))
        .route("/date-night/history", get(handlers::history))
        .route_layer(from_fn(csrf_middleware))
        .route_layer(from_fn(auth_middleware))
}
