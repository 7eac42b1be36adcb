//! # Site Module
//!
//! Server-rendered pages (landing, dashboard), locale switching, PWA assets,
//! health checks, the CSP report sink and the 404 fallback.

pub mod handlers;
pub mod routes;
pub mod views;


pub use handlers::not_found;
pub use routes::site_routes;
