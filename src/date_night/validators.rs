use chrono::NaiveDate;

use super::models::{
    CategoryRequest, CompleteRequest, IdeaRequest, MAX_COST_LEVEL, MAX_RATING, MIN_COST_LEVEL,
    MIN_RATING,
};
use crate::common::{ValidationResult, Validator};

impl Validator<CategoryRequest> for CategoryRequest {
    fn validate(&self, data: &CategoryRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.require_text("name", &data.name, 100);
        result.limit_text("icon", data.icon.as_deref(), 16);
        result
    }
}

impl Validator<IdeaRequest> for IdeaRequest {
    fn validate(&self, data: &IdeaRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.category_id.trim().is_empty() {
            result.add_error("category_id", "is required");
        }
        result.require_text("title", &data.title, 255);
        result.limit_text("description", data.description.as_deref(), 2000);

        if let Some(cost) = data.cost_level {
            if !(MIN_COST_LEVEL..=MAX_COST_LEVEL).contains(&cost) {
                result.add_error(
                    "cost_level",
                    &format!("must be between {} and {}", MIN_COST_LEVEL, MAX_COST_LEVEL),
                );
            }
        }

        result
    }
}

impl Validator<CompleteRequest> for CompleteRequest {
    fn validate(&self, data: &CompleteRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if !(MIN_RATING..=MAX_RATING).contains(&data.rating) {
            result.add_error(
                "rating",
                &format!("must be between {} and {}", MIN_RATING, MAX_RATING),
            );
        }
        result.limit_text("notes", data.notes.as_deref(), 2000);

        if let Some(date) = data.completed_on.as_deref() {
            if NaiveDate::parse_from_str(date.trim(), "%Y-%m-%d").is_err() {
                result.add_error("completed_on", "must be a YYYY-MM-DD date");
            }
        }

        result
    }
}
