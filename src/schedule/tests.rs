//! Tests for schedule module

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::calendar::CalendarService;
    use crate::common::migrations::test_support::{insert_user, test_pool};
    use crate::common::{ApiError, Validator};
    use models::{SendScheduleRequest, SlotInput, STATUS_ACCEPTED, STATUS_DECLINED};

    fn slot(start: &str, end: &str) -> SlotInput {
        SlotInput {
            start_time: start.to_string(),
            end_time: end.to_string(),
        }
    }

    fn request(recipient: &str) -> SendScheduleRequest {
        SendScheduleRequest {
            recipient_id: recipient.to_string(),
            title: "Plan the holidays".to_string(),
            message: Some("Coffee and calendars".to_string()),
            slots: vec![
                slot("2024-06-01T18:00:00+02:00", "2024-06-01T19:00:00+02:00"),
                slot("2024-06-02T10:00:00Z", "2024-06-02T11:00:00Z"),
            ],
        }
    }

    #[test]
    fn test_slot_validation() {
        let ok = request("U_SCHED0002");
        assert!(ok.validate(&ok).is_valid);

        let mut backwards = request("U_SCHED0002");
        backwards.slots = vec![slot("2024-06-01T19:00:00Z", "2024-06-01T18:00:00Z")];
        let result = backwards.validate(&backwards);
        assert_eq!(result.errors[0].field, "slots[0]");

        let mut too_many = request("U_SCHED0002");
        too_many.slots = (0..6)
            .map(|h| slot(&format!("2024-06-01T0{}:00:00Z", h), &format!("2024-06-01T0{}:30:00Z", h)))
            .collect();
        assert!(!too_many.validate(&too_many).is_valid);

        let mut none = request("U_SCHED0002");
        none.slots.clear();
        assert!(!none.validate(&none).is_valid);
    }

    #[tokio::test]
    async fn test_cannot_schedule_with_yourself_or_nobody() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_SCHED0001", "alex@example.com", "Alex").await;
        let service = ScheduleService::new(pool);

        assert!(matches!(
            service.create_request(&alex, &request(&alex)).await,
            Err(ApiError::BadRequest(_))
        ));
        assert!(matches!(
            service.create_request(&alex, &request("U_NOBODY")).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_create_normalizes_slots_and_shows_in_both_views() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_SCHED0001", "alex@example.com", "Alex").await;
        let sam = insert_user(&pool, "U_SCHED0002", "sam@example.com", "Sam").await;
        let service = ScheduleService::new(pool);

        let created = service.create_request(&alex, &request(&sam)).await.unwrap();
        assert_eq!(created.slots.len(), 2);
        assert_eq!(created.slots[0].start_time, "2024-06-01T16:00:00Z");
        assert_eq!(created.request.sender_name.as_deref(), Some("Alex"));
        assert_eq!(created.request.recipient_name.as_deref(), Some("Sam"));

        let sams = service.overview(&sam).await.unwrap();
        assert_eq!(sams.incoming.len(), 1);
        assert!(sams.outgoing.is_empty());

        let alexs = service.overview(&alex).await.unwrap();
        assert_eq!(alexs.outgoing.len(), 1);

        let others = service.list_other_users(&alex).await.unwrap();
        let ids: Vec<&str> = others.iter().map(|u| u.id.as_str()).collect();
        assert_eq!(ids, vec![sam.as_str()]);
    }

    #[tokio::test]
    async fn test_accept_adds_event_to_both_calendars() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_SCHED0001", "alex@example.com", "Alex").await;
        let sam = insert_user(&pool, "U_SCHED0002", "sam@example.com", "Sam").await;
        let service = ScheduleService::new(pool.clone());

        let created = service.create_request(&alex, &request(&sam)).await.unwrap();
        let chosen = created.slots[1].id.clone();

        assert!(matches!(
            service.accept(&alex, &created.request.id, &chosen).await,
            Err(ApiError::Forbidden(_))
        ));
        assert!(matches!(
            service.accept(&sam, &created.request.id, "SLOT_OTHER").await,
            Err(ApiError::BadRequest(_))
        ));

        let (accepted, slot) = service.accept(&sam, &created.request.id, &chosen).await.unwrap();
        assert_eq!(accepted.request.status, STATUS_ACCEPTED);
        assert_eq!(accepted.request.selected_slot_id.as_deref(), Some(chosen.as_str()));
        assert_eq!(slot.start_time, "2024-06-02T10:00:00Z");

        let calendar = CalendarService::new(pool);
        for user in [&alex, &sam] {
            let events = calendar.list_events(user, None, None).await.unwrap();
            assert_eq!(events.len(), 1);
            assert_eq!(events[0].title, "Plan the holidays");
            assert_eq!(events[0].start_time, "2024-06-02T10:00:00Z");
        }

        assert!(matches!(
            service.decline(&sam, &created.request.id, None).await,
            Err(ApiError::BadRequest(_))
        ));
    }

    #[tokio::test]
    async fn test_decline_keeps_response_message() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_SCHED0001", "alex@example.com", "Alex").await;
        let sam = insert_user(&pool, "U_SCHED0002", "sam@example.com", "Sam").await;
        let service = ScheduleService::new(pool);

        let created = service.create_request(&alex, &request(&sam)).await.unwrap();
        let declined = service
            .decline(&sam, &created.request.id, Some("  Busy that weekend "))
            .await
            .unwrap();

        assert_eq!(declined.request.status, STATUS_DECLINED);
        assert_eq!(declined.request.response_message.as_deref(), Some("Busy that weekend"));
    }

    #[tokio::test]
    async fn test_decline_after_accept_is_refused() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_SCHED0001", "alex@example.com", "Alex").await;
        let sam = insert_user(&pool, "U_SCHED0002", "sam@example.com", "Sam").await;
        let service = ScheduleService::new(pool);

        let created = service.create_request(&alex, &request(&sam)).await.unwrap();
        let chosen = created.slots[0].id.clone();
        service.accept(&sam, &created.request.id, &chosen).await.unwrap();

        // A decline that passed its pending check before the accept landed
        assert!(matches!(
            service.mark_declined(&created.request.id, Some("Too late")).await,
            Err(ApiError::BadRequest(_))
        ));

        let current = service.get_for_participant(&sam, &created.request.id).await.unwrap();
        assert_eq!(current.request.status, STATUS_ACCEPTED);
        assert!(current.request.response_message.is_none());
    }

    #[tokio::test]
    async fn test_only_sender_deletes() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_SCHED0001", "alex@example.com", "Alex").await;
        let sam = insert_user(&pool, "U_SCHED0002", "sam@example.com", "Sam").await;
        let kim = insert_user(&pool, "U_SCHED0003", "kim@example.com", "Kim").await;
        let service = ScheduleService::new(pool.clone());

        let created = service.create_request(&alex, &request(&sam)).await.unwrap();

        assert!(matches!(
            service.delete(&kim, &created.request.id).await,
            Err(ApiError::NotFound(_))
        ));
        assert!(matches!(
            service.delete(&sam, &created.request.id).await,
            Err(ApiError::Forbidden(_))
        ));

        service.delete(&alex, &created.request.id).await.unwrap();

        let (slots,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM schedule_request_slots")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(slots, 0);
        assert!(service.overview(&sam).await.unwrap().incoming.is_empty());
    }
}
