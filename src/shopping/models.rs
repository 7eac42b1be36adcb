use serde::{Deserialize, Serialize};
use sqlx::FromRow;

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct ShoppingItem {
    pub id: String,
    pub name: String,
    pub quantity: Option<String>,
    pub category: Option<String>,
    pub is_purchased: bool,
    pub added_by: String,
    pub purchased_by: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// Body of `POST /shopping` and `PUT /shopping/:id`
#[derive(Debug, Clone, Deserialize)]
pub struct ShoppingItemRequest {
    pub name: String,
    pub quantity: Option<String>,
    pub category: Option<String>,
}
