use sqlx::SqlitePool;
use tracing::info;

use super::models::{ShoppingItem, ShoppingItemRequest};
use crate::common::{generate_shopping_item_id, helpers::now_rfc3339, ApiError, Validator};

const ITEM_COLUMNS: &str =
    "id, name, quantity, category, is_purchased, added_by, purchased_by, created_at, updated_at";

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub struct ShoppingService {
    db: SqlitePool,
}

impl ShoppingService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Still-needed items first, grouped by category
    pub async fn list_items(&self) -> Result<Vec<ShoppingItem>, ApiError> {
        sqlx::query_as::<_, ShoppingItem>(&format!(
            r#"
            SELECT {ITEM_COLUMNS}
            FROM shopping_items
            ORDER BY is_purchased ASC, category IS NULL, category ASC, created_at ASC
            "#
        ))
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn get_item(&self, item_id: &str) -> Result<ShoppingItem, ApiError> {
        sqlx::query_as::<_, ShoppingItem>(&format!(
            "SELECT {ITEM_COLUMNS} FROM shopping_items WHERE id = ?"
        ))
        .bind(item_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Shopping item not found".to_string()))
    }

    pub async fn add_item(
        &self,
        user_id: &str,
        request: &ShoppingItemRequest,
    ) -> Result<ShoppingItem, ApiError> {
        request.validate(request).into_result()?;

        let id = generate_shopping_item_id();
        let now = now_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO shopping_items (
                id, name, quantity, category, is_purchased, added_by, purchased_by, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, 0, ?, NULL, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(request.name.trim())
        .bind(clean(&request.quantity))
        .bind(clean(&request.category))
        .bind(user_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        info!(item_id = %id, user_id = %user_id, "Shopping item added");
        self.get_item(&id).await
    }

    pub async fn update_item(
        &self,
        item_id: &str,
        request: &ShoppingItemRequest,
    ) -> Result<ShoppingItem, ApiError> {
        self.get_item(item_id).await?;
        request.validate(request).into_result()?;

        sqlx::query(
            "UPDATE shopping_items SET name = ?, quantity = ?, category = ?, updated_at = ? WHERE id = ?",
        )
        .bind(request.name.trim())
        .bind(clean(&request.quantity))
        .bind(clean(&request.category))
        .bind(now_rfc3339())
        .bind(item_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        self.get_item(item_id).await
    }

    /// Flips the purchased flag and records who bought it
    pub async fn toggle_item(&self, user_id: &str, item_id: &str) -> Result<ShoppingItem, ApiError> {
        let item = self.get_item(item_id).await?;
        let purchased = !item.is_purchased;
        let purchased_by = purchased.then_some(user_id);

        sqlx::query(
            "UPDATE shopping_items SET is_purchased = ?, purchased_by = ?, updated_at = ? WHERE id = ?",
        )
        .bind(purchased)
        .bind(purchased_by)
        .bind(now_rfc3339())
        .bind(item_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        self.get_item(item_id).await
    }

    pub async fn delete_item(&self, item_id: &str) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM shopping_items WHERE id = ?")
            .bind(item_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Shopping item not found".to_string()));
        }
        Ok(())
    }

    /// Removes every purchased item; returns how many went
    pub async fn clear_purchased(&self, user_id: &str) -> Result<u64, ApiError> {
        let mut tx = self.db.begin().await.map_err(ApiError::DatabaseError)?;

        let result = sqlx::query("DELETE FROM shopping_items WHERE is_purchased = 1")
            .execute(&mut *tx)
            .await
            .map_err(ApiError::DatabaseError)?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;

        info!(user_id = %user_id, removed = result.rows_affected(), "Cleared purchased items");
        Ok(result.rows_affected())
    }
}
