// src/session/mod.rs
//! Server-side sessions stored in SQLite and keyed by an HttpOnly cookie

pub mod handle;
pub mod middleware;
pub mod models;
pub mod store;

#[cfg(test)]
mod tests;

pub use handle::{Session, SessionOutcome};
pub use middleware::session_middleware;
pub use models::{Expiring, SessionData, OAUTH_VALUE_TTL_SECONDS};
pub use store::{SessionError, SessionStore};
