//! # Notifications Module
//!
//! Stored notifications plus payload-less Web Push. The push only wakes the
//! service worker, which then fetches `/notifications/pending`.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;


pub use routes::notifications_routes;
pub use services::{NotificationService, PushError, VapidConfig};
