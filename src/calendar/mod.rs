//! # Calendar Module
//!
//! Personal calendar events. Every event belongs to one user and is only
//! visible to that user.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;


pub use models::{CalendarEvent, NewEvent};
pub use routes::calendar_routes;
pub use services::{insert_event, CalendarService};
