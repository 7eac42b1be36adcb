use chrono::NaiveDate;

use super::models::{TaskRequest, PRIORITIES};
use crate::common::{ValidationResult, Validator};

impl Validator<TaskRequest> for TaskRequest {
    fn validate(&self, data: &TaskRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.require_text("title", &data.title, 255);
        result.limit_text("description", data.description.as_deref(), 5000);

        if let Some(priority) = &data.priority {
            if !PRIORITIES.contains(&priority.as_str()) {
                result.add_error("priority", "must be one of low, medium, high");
            }
        }

        if let Some(due) = data.due_date.as_deref().map(str::trim).filter(|d| !d.is_empty()) {
            if NaiveDate::parse_from_str(due, "%Y-%m-%d").is_err() {
                result.add_error("due_date", "must be a date in YYYY-MM-DD format");
            }
        }

        result
    }
}
