use serde::{Deserialize, Serialize};
use sqlx::FromRow;

pub const MIN_COST_LEVEL: i64 = 1;
pub const MAX_COST_LEVEL: i64 = 3;
pub const MIN_RATING: i64 = 1;
pub const MAX_RATING: i64 = 5;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DateCategory {
    pub id: String,
    pub name: String,
    pub icon: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct DateIdea {
    pub id: String,
    pub category_id: String,
    pub title: String,
    pub description: Option<String>,
    pub cost_level: i64, // 1 = cheap .. 3 = splurge
    pub created_by: String,
    pub times_completed: i64,
    pub created_at: String,
    pub updated_at: String,
    pub category_name: Option<String>,
}

/// One finished date, joined with its idea and category for the history view
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CompletedDate {
    pub id: String,
    pub idea_id: String,
    pub category_id: String,
    pub completed_on: String, // YYYY-MM-DD
    pub rating: i64,
    pub notes: Option<String>,
    pub points: i64,
    pub created_by: String,
    pub created_at: String,
    pub idea_title: Option<String>,
    pub category_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryRequest {
    pub name: String,
    pub icon: Option<String>,
}

/// Body of `POST /date-night/ideas` and `PUT /date-night/ideas/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct IdeaRequest {
    pub category_id: String,
    pub title: String,
    pub description: Option<String>,
    pub cost_level: Option<i64>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CompleteRequest {
    pub rating: i64,
    pub notes: Option<String>,
    /// Defaults to today (UTC)
    pub completed_on: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct IdeaQuery {
    pub category_id: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DateStats {
    pub total_points: i64,
    pub level: i64,
    pub points_to_next_level: i64,
    pub total_dates: i64,
    pub current_streak: i64,
    pub favorite_category: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct CompletionResponse {
    pub completed: CompletedDate,
    pub points_earned: i64,
    pub first_in_category: bool,
    pub stats: DateStats,
}
