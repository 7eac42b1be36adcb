use serde::{Deserialize, Serialize};
use sqlx::FromRow;

use crate::common::helpers::normalize_timestamp;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct CalendarEvent {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: String, // RFC 3339 UTC
    pub end_time: String,
    pub all_day: bool,
    pub color: Option<String>, // #RRGGBB
    pub reminder_sent: bool,
    pub created_at: String,
    pub updated_at: String,
}

/// Body of `POST /calendar/events` and `PUT /calendar/events/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct EventRequest {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: String,
    pub end_time: String,
    #[serde(default)]
    pub all_day: bool,
    pub color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventRangeQuery {
    pub start: Option<String>,
    pub end: Option<String>,
}

/// Validated event fields with timestamps normalised to UTC
#[derive(Debug, Clone)]
pub struct NewEvent {
    pub title: String,
    pub description: Option<String>,
    pub location: Option<String>,
    pub start_time: String,
    pub end_time: String,
    pub all_day: bool,
    pub color: Option<String>,
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

impl NewEvent {
    /// `None` if either timestamp does not parse; run the validator first
    pub fn from_request(request: &EventRequest) -> Option<Self> {
        Some(Self {
            title: request.title.trim().to_string(),
            description: non_blank(&request.description),
            location: non_blank(&request.location),
            start_time: normalize_timestamp(&request.start_time)?,
            end_time: normalize_timestamp(&request.end_time)?,
            all_day: request.all_day,
            color: non_blank(&request.color).map(|c| c.to_ascii_lowercase()),
        })
    }
}
