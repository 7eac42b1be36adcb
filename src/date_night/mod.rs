//! # Date Night Module
//!
//! A shared jar of date ideas grouped by category. Completing an idea earns
//! points; points roll up into levels and a monthly streak.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod scoring;
pub mod services;
pub mod validators;

#[cfg(test)]
mod tests;

pub use routes::date_night_routes;
pub use services::DateNightService;
