use sqlx::SqlitePool;
use tracing::info;

use super::models::{
    ScheduleOverview, ScheduleRequest, ScheduleRequestWithSlots, ScheduleSlot,
    SendScheduleRequest, UserOption, STATUS_ACCEPTED, STATUS_DECLINED, STATUS_PENDING,
};
use crate::calendar::{insert_event, NewEvent};
use crate::common::{
    generate_schedule_request_id, generate_schedule_slot_id,
    helpers::{normalize_timestamp, now_rfc3339},
    ApiError, Validator,
};

const REQUEST_SELECT: &str = r#"
    SELECT r.id, r.sender_id, r.recipient_id, r.title, r.message, r.status,
           r.selected_slot_id, r.response_message, r.created_at, r.updated_at,
           s.name AS sender_name, u.name AS recipient_name
    FROM schedule_requests r
    LEFT JOIN users s ON s.id = r.sender_id
    LEFT JOIN users u ON u.id = r.recipient_id
"#;

pub struct ScheduleService {
    db: SqlitePool,
}

impl ScheduleService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ============================================================================
    // Queries
    // ============================================================================

    pub async fn overview(&self, user_id: &str) -> Result<ScheduleOverview, ApiError> {
        let incoming = self
            .requests_where("r.recipient_id = ?", user_id)
            .await?;
        let outgoing = self.requests_where("r.sender_id = ?", user_id).await?;

        Ok(ScheduleOverview { incoming, outgoing })
    }

    async fn requests_where(
        &self,
        clause: &str,
        user_id: &str,
    ) -> Result<Vec<ScheduleRequestWithSlots>, ApiError> {
        let requests = sqlx::query_as::<_, ScheduleRequest>(&format!(
            "{REQUEST_SELECT} WHERE {clause} ORDER BY r.created_at DESC"
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        let mut result = Vec::with_capacity(requests.len());
        for request in requests {
            let slots = self.slots_for(&request.id).await?;
            result.push(ScheduleRequestWithSlots { request, slots });
        }
        Ok(result)
    }

    async fn slots_for(&self, request_id: &str) -> Result<Vec<ScheduleSlot>, ApiError> {
        sqlx::query_as::<_, ScheduleSlot>(
            "SELECT id, request_id, start_time, end_time FROM schedule_request_slots WHERE request_id = ? ORDER BY start_time",
        )
        .bind(request_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// A request the user sent or received; anything else is reported as missing
    pub async fn get_for_participant(
        &self,
        user_id: &str,
        request_id: &str,
    ) -> Result<ScheduleRequestWithSlots, ApiError> {
        let request = sqlx::query_as::<_, ScheduleRequest>(&format!(
            "{REQUEST_SELECT} WHERE r.id = ? AND (r.sender_id = ? OR r.recipient_id = ?)"
        ))
        .bind(request_id)
        .bind(user_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Schedule request not found".to_string()))?;

        let slots = self.slots_for(&request.id).await?;
        Ok(ScheduleRequestWithSlots { request, slots })
    }

    /// Everyone except the caller
    pub async fn list_other_users(&self, user_id: &str) -> Result<Vec<UserOption>, ApiError> {
        sqlx::query_as::<_, UserOption>(
            "SELECT id, name, email FROM users WHERE id <> ? ORDER BY COALESCE(name, email)",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    // ============================================================================
    // Mutations
    // ============================================================================

    pub async fn create_request(
        &self,
        sender_id: &str,
        request: &SendScheduleRequest,
    ) -> Result<ScheduleRequestWithSlots, ApiError> {
        request.validate(request).into_result()?;

        let recipient_id = request.recipient_id.trim();
        if recipient_id == sender_id {
            return Err(ApiError::BadRequest(
                "You cannot send a schedule request to yourself".to_string(),
            ));
        }

        let (exists,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users WHERE id = ?")
            .bind(recipient_id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;
        if exists == 0 {
            return Err(ApiError::BadRequest("Recipient not found".to_string()));
        }

        let request_id = generate_schedule_request_id();
        let now = now_rfc3339();
        let message = request
            .message
            .as_deref()
            .map(str::trim)
            .filter(|m| !m.is_empty());

        let mut tx = self.db.begin().await.map_err(ApiError::DatabaseError)?;

        sqlx::query(
            r#"
            INSERT INTO schedule_requests (
                id, sender_id, recipient_id, title, message, status, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&request_id)
        .bind(sender_id)
        .bind(recipient_id)
        .bind(request.title.trim())
        .bind(message)
        .bind(STATUS_PENDING)
        .bind(&now)
        .bind(&now)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::DatabaseError)?;

        for slot in &request.slots {
            let (Some(start), Some(end)) = (
                normalize_timestamp(&slot.start_time),
                normalize_timestamp(&slot.end_time),
            ) else {
                return Err(ApiError::ValidationError("slots: invalid timestamp".to_string()));
            };

            sqlx::query(
                "INSERT INTO schedule_request_slots (id, request_id, start_time, end_time) VALUES (?, ?, ?, ?)",
            )
            .bind(generate_schedule_slot_id())
            .bind(&request_id)
            .bind(start)
            .bind(end)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::DatabaseError)?;
        }

        tx.commit().await.map_err(ApiError::DatabaseError)?;

        info!(
            request_id = %request_id,
            sender_id = %sender_id,
            recipient_id = %recipient_id,
            slots = request.slots.len(),
            "Schedule request created"
        );

        self.get_for_participant(sender_id, &request_id).await
    }

    async fn pending_for_recipient(
        &self,
        recipient_id: &str,
        request_id: &str,
    ) -> Result<ScheduleRequestWithSlots, ApiError> {
        let request = self.get_for_participant(recipient_id, request_id).await?;

        if request.request.recipient_id != recipient_id {
            return Err(ApiError::Forbidden(
                "Only the recipient can respond to this request".to_string(),
            ));
        }
        if request.request.status != STATUS_PENDING {
            return Err(ApiError::BadRequest(format!(
                "Request is already {}",
                request.request.status
            )));
        }

        Ok(request)
    }

    /// Marks the request accepted and puts the chosen slot in both calendars.
    /// Returns the updated request and the chosen slot.
    pub async fn accept(
        &self,
        recipient_id: &str,
        request_id: &str,
        slot_id: &str,
    ) -> Result<(ScheduleRequestWithSlots, ScheduleSlot), ApiError> {
        let pending = self.pending_for_recipient(recipient_id, request_id).await?;

        let slot = pending
            .slots
            .iter()
            .find(|s| s.id == slot_id)
            .cloned()
            .ok_or_else(|| ApiError::BadRequest("Slot does not belong to this request".to_string()))?;

        let event = NewEvent {
            title: pending.request.title.clone(),
            description: pending.request.message.clone(),
            location: None,
            start_time: slot.start_time.clone(),
            end_time: slot.end_time.clone(),
            all_day: false,
            color: None,
        };

        let mut tx = self.db.begin().await.map_err(ApiError::DatabaseError)?;

        // Status guard so a concurrent accept/decline cannot both win
        let updated = sqlx::query(
            r#"
            UPDATE schedule_requests
            SET status = ?, selected_slot_id = ?, updated_at = ?
            WHERE id = ? AND status = ?
            "#,
        )
        .bind(STATUS_ACCEPTED)
        .bind(&slot.id)
        .bind(now_rfc3339())
        .bind(request_id)
        .bind(STATUS_PENDING)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::DatabaseError)?;

        if updated.rows_affected() == 0 {
            return Err(ApiError::BadRequest("Request is no longer pending".to_string()));
        }

        for user_id in [&pending.request.sender_id, &pending.request.recipient_id] {
            insert_event(&mut *tx, user_id, &event)
                .await
                .map_err(ApiError::DatabaseError)?;
        }

        tx.commit().await.map_err(ApiError::DatabaseError)?;

        info!(request_id = %request_id, slot_id = %slot.id, "Schedule request accepted");

        let request = self.get_for_participant(recipient_id, request_id).await?;
        Ok((request, slot))
    }

    pub async fn decline(
        &self,
        recipient_id: &str,
        request_id: &str,
        message: Option<&str>,
    ) -> Result<ScheduleRequestWithSlots, ApiError> {
        self.pending_for_recipient(recipient_id, request_id).await?;

        let message = message.map(str::trim).filter(|m| !m.is_empty());
        if message.map_or(false, |m| m.chars().count() > 2000) {
            return Err(ApiError::ValidationError(
                "message: must not exceed 2000 characters".to_string(),
            ));
        }

        self.mark_declined(request_id, message).await?;

        info!(request_id = %request_id, "Schedule request declined");
        self.get_for_participant(recipient_id, request_id).await
    }

    /// Guarded status change; fails once the request has left `pending`
    pub(super) async fn mark_declined(
        &self,
        request_id: &str,
        message: Option<&str>,
    ) -> Result<(), ApiError> {
        let updated = sqlx::query(
            "UPDATE schedule_requests SET status = ?, response_message = ?, updated_at = ? WHERE id = ? AND status = ?",
        )
        .bind(STATUS_DECLINED)
        .bind(message)
        .bind(now_rfc3339())
        .bind(request_id)
        .bind(STATUS_PENDING)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        if updated.rows_affected() == 0 {
            return Err(ApiError::BadRequest("Request is no longer pending".to_string()));
        }
        Ok(())
    }

    /// Sender only; slots and request go in one transaction
    pub async fn delete(&self, sender_id: &str, request_id: &str) -> Result<(), ApiError> {
        let request = self.get_for_participant(sender_id, request_id).await?;
        if request.request.sender_id != sender_id {
            return Err(ApiError::Forbidden(
                "Only the sender can delete this request".to_string(),
            ));
        }

        let mut tx = self.db.begin().await.map_err(ApiError::DatabaseError)?;

        sqlx::query("DELETE FROM schedule_request_slots WHERE request_id = ?")
            .bind(request_id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::DatabaseError)?;

        sqlx::query("DELETE FROM schedule_requests WHERE id = ?")
            .bind(request_id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::DatabaseError)?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;

        info!(request_id = %request_id, sender_id = %sender_id, "Schedule request deleted");
        Ok(())
    }
}
