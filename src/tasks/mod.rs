//! # Tasks Module
//!
//! Household to-dos. Private tasks are visible to their owner only; shared
//! tasks are visible to, and can be ticked off by, everyone.

pub mod handlers;
pub mod models;
pub mod routes;
pub mod services;
pub mod validators;


pub use models::Task;
pub use routes::tasks_routes;
pub use services::TasksService;
