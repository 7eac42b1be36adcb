//! # Shopping Module
//!
//! One shared shopping list for the household.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;

#[cfg(test)]
mod tests;

pub use routes::shopping_routes;
pub use services::ShoppingService;
