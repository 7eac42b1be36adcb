//! # Schedule Module
//!
//! One user proposes up to five time slots to another; the recipient picks
//! one (which lands in both calendars) or declines. The recipient is told by
//! email and push, and so is the sender once a slot is accepted.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;

#[cfg(test)]
mod tests;

pub use routes::schedule_routes;
pub use services::ScheduleService;
