use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::ApiError;

pub const PRIORITIES: [&str; 3] = ["low", "medium", "high"];

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Task {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>, // YYYY-MM-DD
    pub priority: String,         // low | medium | high
    pub is_shared: bool,
    pub completed: bool,
    pub completed_at: Option<String>,
    #[serde(skip_serializing)]
    pub reminder_sent_on: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Body of `POST /tasks` and `PUT /tasks/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct TaskRequest {
    pub title: String,
    pub description: Option<String>,
    pub due_date: Option<String>,
    pub priority: Option<String>,
    #[serde(default)]
    pub is_shared: bool,
}

#[derive(Debug, Deserialize)]
pub struct TaskListQuery {
    pub scope: Option<String>,
    pub status: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskScope {
    All,
    Mine,
    Shared,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TaskStatus {
    Open,
    Done,
    All,
}

impl TaskScope {
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        match raw.unwrap_or("all") {
            "all" => Ok(Self::All),
            "mine" => Ok(Self::Mine),
            "shared" => Ok(Self::Shared),
            other => Err(ApiError::BadRequest(format!("Unknown scope '{}'", other))),
        }
    }
}

impl TaskStatus {
    pub fn parse(raw: Option<&str>) -> Result<Self, ApiError> {
        match raw.unwrap_or("open") {
            "open" => Ok(Self::Open),
            "done" => Ok(Self::Done),
            "all" => Ok(Self::All),
            other => Err(ApiError::BadRequest(format!("Unknown status '{}'", other))),
        }
    }
}
