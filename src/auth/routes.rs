//! Authentication routes

use axum::{
    middleware::from_fn,
    routing::{delete, get, post},
    Router,
};

use super::handlers;
use super::middleware::{auth_middleware, guest_middleware};
use crate::csrf_middleware::csrf_middleware;
use crate::rate_limit_middleware::rate_limit_middleware;

/// Creates and returns the authentication router
///
/// # Routes
/// - `GET /auth/login` - Start Google OAuth (guests only, rate limited)
/// - `GET /auth/callback` - OAuth redirect target (rate limited)
/// - `POST /auth/logout` - Sign out
/// - `DELETE /auth/account` - Delete the account and everything it owns
/// - `GET /auth/me` - Current user and CSRF token
pub fn auth_routes() -> Router {
    // The last layer added runs first
    let login = Router::new()
        .route("/auth/login", get(handlers::login))
        .route_layer(from_fn(guest_middleware))
        .route_layer(from_fn(rate_limit_middleware));

    let callback = Router::new()
        .route("/auth/callback", get(handlers::callback))
        .route_layer(from_fn(rate_limit_middleware));

    let signed_in = Router::new()
        .route("/auth/logout", post(handlers::logout))
        .route("/auth/account", delete(handlers::delete_account))
        .route("/auth/me", get(handlers::me))
        .route_layer(from_fn(csrf_middleware))
        .route_layer(from_fn(auth_middleware));

    login.merge(callback).merge(signed_in)
}
