//! # Auth Module
//!
//! Google sign-in for the household:
//! - OAuth authorization code flow with PKCE and single-use state
//! - ID token verification and the email allowlist
//! - Encrypted provider token storage, logout and account deletion
//! - `auth_middleware` / `guest_middleware` and the `AuthedUser` extractor

pub mod extractors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod provider;
pub mod routes;
pub mod service;

#[cfg(test)]
mod tests;

pub use extractors::AuthedUser;
pub use middleware::{auth_middleware, guest_middleware};
pub use models::User;
pub use provider::{GoogleEndpoints, GoogleOAuthClient, IdentityProvider};
pub use routes::auth_routes;
pub use service::{AuthError, AuthService};
