use chrono::DateTime;

use super::models::{SendScheduleRequest, MAX_SLOTS};
use crate::common::{ValidationResult, Validator};

impl Validator<SendScheduleRequest> for SendScheduleRequest {
    fn validate(&self, data: &SendScheduleRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        if data.recipient_id.trim().is_empty() {
            result.add_error("recipient_id", "is required");
        }
        result.require_text("title", &data.title, 255);
        result.limit_text("message", data.message.as_deref(), 2000);

        if data.slots.is_empty() || data.slots.len() > MAX_SLOTS {
            result.add_error("slots", &format!("between 1 and {} time slots are required", MAX_SLOTS));
        }

        for (index, slot) in data.slots.iter().enumerate() {
            let start = DateTime::parse_from_rfc3339(slot.start_time.trim());
            let end = DateTime::parse_from_rfc3339(slot.end_time.trim());
            match (start, end) {
                (Ok(start), Ok(end)) if end > start => {}
                (Ok(_), Ok(_)) => {
                    result.add_error(&format!("slots[{}]", index), "end_time must be after start_time")
                }
                _ => result.add_error(&format!("slots[{}]", index), "times must be RFC 3339 timestamps"),
            }
        }

        result
    }
}
