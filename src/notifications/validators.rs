use super::models::SubscribeRequest;
use crate::common::{ValidationResult, Validator};

impl Validator<SubscribeRequest> for SubscribeRequest {
    fn validate(&self, data: &SubscribeRequest) -> ValidationResult {
        let mut result = ValidationResult::new();

        match url::Url::parse(&data.endpoint) {
            Ok(url) if url.scheme() == "https" || url.scheme() == "http" => {}
            _ => result.add_error("endpoint", "must be an absolute http(s) URL"),
        }
        result.limit_text("endpoint", Some(&data.endpoint), 2048);
        result.require_text("keys.p256dh", &data.keys.p256dh, 255);
        result.require_text("keys.auth", &data.keys.auth, 255);

        result
    }
}
