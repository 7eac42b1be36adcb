use super::models::ShoppingItemRequest;
use crate::common::{ValidationResult, Validator};

impl Validator<ShoppingItemRequest> for ShoppingItemRequest {
    fn validate(&self, data: &ShoppingItemRequest) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.require_text("name", &data.name, 255);
        result.limit_text("quantity", data.quantity.as_deref(), 50);
        result.limit_text("category", data.category.as_deref(), 100);
        result
    }
}
