use chrono::DateTime;

use super::models::EventRequest;
use crate::common::{ValidationResult, Validator};

/// `#RRGGBB`
pub fn is_hex_color(value: &str) -> bool {
    value.len() == 7
        && value.starts_with('#')
        && value[1..].chars().all(|c| c.is_ascii_hexdigit())
}

impl Validator<EventRequest> for EventRequest {
    fn validate(&self, data: &EventRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        result.require_text("title", &data.title, 255);
        result.limit_text("description", data.description.as_deref(), 5000);
        result.limit_text("location", data.location.as_deref(), 255);

        let start = DateTime::parse_from_rfc3339(data.start_time.trim());
        let end = DateTime::parse_from_rfc3339(data.end_time.trim());

        if start.is_err() {
            result.add_error("start_time", "must be an RFC 3339 timestamp");
        }
        if end.is_err() {
            result.add_error("end_time", "must be an RFC 3339 timestamp");
        }
        if let (Ok(start), Ok(end)) = (start, end) {
            if end < start {
                result.add_error("end_time", "must not be before start_time");
            }
        }

        if let Some(color) = data.color.as_deref().map(str::trim).filter(|c| !c.is_empty()) {
            if !is_hex_color(color) {
                result.add_error("color", "must be a #RRGGBB hex color");
            }
        }

        result
    }
}
