//! Tests for date night module

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::common::migrations::test_support::{insert_user, test_pool};
    use crate::common::{ApiError, Validator};
    use models::{CategoryRequest, CompleteRequest, IdeaRequest};

    fn idea(category_id: &str, title: &str) -> IdeaRequest {
        IdeaRequest {
            category_id: category_id.to_string(),
            title: title.to_string(),
            description: None,
            cost_level: Some(2),
        }
    }

    fn rating(stars: i64) -> CompleteRequest {
        CompleteRequest {
            rating: stars,
            notes: None,
            completed_on: None,
        }
    }

    async fn category_id(service: &DateNightService, name: &str) -> String {
        service
            .list_categories()
            .await
            .unwrap()
            .into_iter()
            .find(|c| c.name == name)
            .unwrap()
            .id
    }

    #[test]
    fn test_idea_and_completion_validation() {
        let mut req = idea("C_1", "Picnic");
        assert!(req.validate(&req).is_valid);
        req.cost_level = Some(4);
        assert_eq!(req.validate(&req).errors[0].field, "cost_level");

        let mut done = rating(6);
        done.completed_on = Some("yesterday".to_string());
        let fields: Vec<String> = done.validate(&done).errors.into_iter().map(|e| e.field).collect();
        assert_eq!(fields, vec!["rating", "completed_on"]);
    }

    #[tokio::test]
    async fn test_seeded_categories_and_duplicates() {
        let service = DateNightService::new(test_pool().await);
        assert_eq!(service.list_categories().await.unwrap().len(), 5);

        let duplicate = CategoryRequest {
            name: "dinner OUT".to_string(),
            icon: None,
        };
        assert!(matches!(
            service.create_category(&duplicate).await,
            Err(ApiError::BadRequest(_))
        ));

        let new = CategoryRequest {
            name: "Road trip".to_string(),
            icon: Some("🚗".to_string()),
        };
        assert_eq!(service.create_category(&new).await.unwrap().name, "Road trip");
    }

    #[tokio::test]
    async fn test_idea_needs_known_category() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_DATE0001", "alex@example.com", "Alex").await;
        let service = DateNightService::new(pool);

        assert!(matches!(
            service.create_idea(&alex, &idea("C_MISSING", "Picnic")).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_completion_points_and_stats() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_DATE0001", "alex@example.com", "Alex").await;
        let service = DateNightService::new(pool);
        let dinner = category_id(&service, "Dinner out").await;

        let tapas = service.create_idea(&alex, &idea(&dinner, "Tapas")).await.unwrap();
        let ramen = service.create_idea(&alex, &idea(&dinner, "Ramen")).await.unwrap();

        let first = service.complete_idea(&alex, &tapas.id, &rating(4)).await.unwrap();
        assert!(first.first_in_category);
        assert_eq!(first.points_earned, 23);

        let second = service.complete_idea(&alex, &ramen.id, &rating(3)).await.unwrap();
        assert!(!second.first_in_category);
        assert_eq!(second.points_earned, 16);

        let stats = second.stats;
        assert_eq!(stats.total_points, 39);
        assert_eq!(stats.level, 1);
        assert_eq!(stats.points_to_next_level, 61);
        assert_eq!(stats.total_dates, 2);
        assert_eq!(stats.current_streak, 1);
        assert_eq!(stats.favorite_category.as_deref(), Some("Dinner out"));

        assert_eq!(service.get_idea(&tapas.id).await.unwrap().times_completed, 1);

        let history = service.history().await.unwrap();
        assert_eq!(history.len(), 2);
        assert!(history.iter().all(|h| h.category_name.as_deref() == Some("Dinner out")));
    }

    #[tokio::test]
    async fn test_random_prefers_untried_ideas() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_DATE0001", "alex@example.com", "Alex").await;
        let service = DateNightService::new(pool);
        let home = category_id(&service, "At home").await;

        assert!(matches!(service.random_idea(None).await, Err(ApiError::NotFound(_))));

        let tried = service.create_idea(&alex, &idea(&home, "Movie night")).await.unwrap();
        let fresh = service.create_idea(&alex, &idea(&home, "Cook together")).await.unwrap();
        service.complete_idea(&alex, &tried.id, &rating(5)).await.unwrap();

        for _ in 0..5 {
            assert_eq!(service.random_idea(Some(&home)).await.unwrap().id, fresh.id);
        }
    }

    #[tokio::test]
    async fn test_deleted_idea_keeps_history_points() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_DATE0001", "alex@example.com", "Alex").await;
        let service = DateNightService::new(pool);
        let active = category_id(&service, "Active").await;

        let hike = service.create_idea(&alex, &idea(&active, "Hike")).await.unwrap();
        service.complete_idea(&alex, &hike.id, &rating(2)).await.unwrap();
        service.delete_idea(&hike.id).await.unwrap();

        assert!(matches!(service.delete_idea(&hike.id).await, Err(ApiError::NotFound(_))));

        let history = service.history().await.unwrap();
        assert_eq!(history.len(), 1);
        assert!(history[0].idea_title.is_none());
        assert_eq!(service.stats().await.unwrap().total_points, 19);
    }
}
