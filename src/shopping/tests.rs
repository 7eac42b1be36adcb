//! Tests for shopping module

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::common::migrations::test_support::{insert_user, test_pool};
    use crate::common::{ApiError, Validator};
    use models::ShoppingItemRequest;

    fn item(name: &str, category: Option<&str>) -> ShoppingItemRequest {
        ShoppingItemRequest {
            name: name.to_string(),
            quantity: None,
            category: category.map(str::to_string),
        }
    }

    #[test]
    fn test_item_validation() {
        let blank = item("   ", None);
        assert_eq!(blank.validate(&blank).errors[0].field, "name");

        let mut long = item("Milk", None);
        long.quantity = Some("x".repeat(51));
        assert_eq!(long.validate(&long).errors[0].field, "quantity");
    }

    #[tokio::test]
    async fn test_toggle_records_buyer() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_SHOP0001", "alex@example.com", "Alex").await;
        let sam = insert_user(&pool, "U_SHOP0002", "sam@example.com", "Sam").await;
        let service = ShoppingService::new(pool);

        let milk = service.add_item(&alex, &item("Milk", Some("Dairy"))).await.unwrap();
        assert!(!milk.is_purchased);

        let bought = service.toggle_item(&sam, &milk.id).await.unwrap();
        assert!(bought.is_purchased);
        assert_eq!(bought.purchased_by.as_deref(), Some(sam.as_str()));

        let back = service.toggle_item(&alex, &milk.id).await.unwrap();
        assert!(!back.is_purchased);
        assert!(back.purchased_by.is_none());
    }

    #[tokio::test]
    async fn test_list_order_and_clear_purchased() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_SHOP0001", "alex@example.com", "Alex").await;
        let service = ShoppingService::new(pool);

        let bread = service.add_item(&alex, &item("Bread", Some("Bakery"))).await.unwrap();
        service.add_item(&alex, &item("Apples", Some("Produce"))).await.unwrap();
        service.add_item(&alex, &item("Batteries", None)).await.unwrap();
        service.toggle_item(&alex, &bread.id).await.unwrap();

        let names: Vec<String> = service
            .list_items()
            .await
            .unwrap()
            .into_iter()
            .map(|i| i.name)
            .collect();
        assert_eq!(names, vec!["Apples", "Batteries", "Bread"]);

        assert_eq!(service.clear_purchased(&alex).await.unwrap(), 1);
        assert_eq!(service.list_items().await.unwrap().len(), 2);
        assert!(matches!(service.get_item(&bread.id).await, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_update_and_delete_missing_item() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_SHOP0001", "alex@example.com", "Alex").await;
        let service = ShoppingService::new(pool);

        let eggs = service.add_item(&alex, &item("Eggs", None)).await.unwrap();
        let mut change = item("Eggs", Some("Dairy"));
        change.quantity = Some(" 12 ".to_string());
        let updated = service.update_item(&eggs.id, &change).await.unwrap();
        assert_eq!(updated.quantity.as_deref(), Some("12"));
        assert_eq!(updated.category.as_deref(), Some("Dairy"));

        assert!(matches!(
            service.update_item("I_MISSING", &change).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(service.delete_item("I_MISSING").await, Err(ApiError::NotFound(_))));
    }
}
