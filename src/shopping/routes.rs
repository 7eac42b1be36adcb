use axum::{
    middleware::from_fn,
    routing::{get, post, put},
    Router,
};

use super::handlers;
use crate::auth::auth_middleware;
use crate::csrf_middleware::csrf_middleware;

/// Creates the shopping list router
pub fn shopping_routes() -> Router {
    Router::new()
        .route("/shopping", get(handlers::list_items).post(handlers::add_item))
        .route("/shopping/clear-purchased", post(handlers::clear_purchased))
        .route(
            "/shopping/:id",
            put(handlers::update_item).delete(handlers::delete_item),
        )
        .route("/shopping/:id/toggle", post(handlers::toggle_item))
        .route_layer(from_fn(csrf_middleware))
        .route_layer(from_fn(auth_middleware))
}
