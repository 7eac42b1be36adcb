use sqlx::{SqliteConnection, SqlitePool};
use tracing::info;

use super::models::{CalendarEvent, EventRequest, NewEvent};
use crate::common::{
    generate_event_id,
    helpers::{normalize_timestamp, now_rfc3339},
    ApiError, Validator,
};

const EVENT_COLUMNS: &str = "id, user_id, title, description, location, start_time, end_time, \
                             all_day, color, reminder_sent, created_at, updated_at";

/// Inserts an event row on an existing connection or transaction and
/// returns its id
pub async fn insert_event(
    conn: &mut SqliteConnection,
    user_id: &str,
    event: &NewEvent,
) -> Result<String, sqlx::Error> {
    let id = generate_event_id();
    let now = now_rfc3339();

    sqlx::query(
        r#"
        INSERT INTO calendar_events (
            id, user_id, title, description, location, start_time, end_time,
            all_day, color, reminder_sent, created_at, updated_at
        )
        VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, 0, ?, ?)
        "#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(&event.title)
    .bind(&event.description)
    .bind(&event.location)
    .bind(&event.start_time)
    .bind(&event.end_time)
    .bind(event.all_day)
    .bind(&event.color)
    .bind(&now)
    .bind(&now)
    .execute(&mut *conn)
    .await?;

    Ok(id)
}

fn validated(request: &EventRequest) -> Result<NewEvent, ApiError> {
    request.validate(request).into_result()?;
    NewEvent::from_request(request)
        .ok_or_else(|| ApiError::ValidationError("start_time: invalid timestamp".to_string()))
}

fn bound(value: Option<&str>, field: &str) -> Result<Option<String>, ApiError> {
    match value.map(str::trim).filter(|v| !v.is_empty()) {
        Some(raw) => normalize_timestamp(raw)
            .map(Some)
            .ok_or_else(|| ApiError::BadRequest(format!("{} must be an RFC 3339 timestamp", field))),
        None => Ok(None),
    }
}

pub struct CalendarService {
    db: SqlitePool,
}

impl CalendarService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ============================================================================
    // Queries
    // ============================================================================

    /// Events of `user_id` overlapping `[start, end]`; open bounds are unbounded
    pub async fn list_events(
        &self,
        user_id: &str,
        start: Option<&str>,
        end: Option<&str>,
    ) -> Result<Vec<CalendarEvent>, ApiError> {
        let start = bound(start, "start")?;
        let end = bound(end, "end")?;

        sqlx::query_as::<_, CalendarEvent>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM calendar_events
            WHERE user_id = ?
              AND (? IS NULL OR end_time >= ?)
              AND (? IS NULL OR start_time <= ?)
            ORDER BY start_time ASC
            "#
        ))
        .bind(user_id)
        .bind(&start)
        .bind(&start)
        .bind(&end)
        .bind(&end)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Another user's event is reported as missing
    pub async fn get_event(&self, user_id: &str, event_id: &str) -> Result<CalendarEvent, ApiError> {
        sqlx::query_as::<_, CalendarEvent>(&format!(
            "SELECT {EVENT_COLUMNS} FROM calendar_events WHERE id = ? AND user_id = ?"
        ))
        .bind(event_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Event not found".to_string()))
    }

    // ============================================================================
    // Mutations
    // ============================================================================

    pub async fn create_event(&self, user_id: &str, request: &EventRequest) -> Result<CalendarEvent, ApiError> {
        let event = validated(request)?;

        let mut conn = self.db.acquire().await.map_err(ApiError::DatabaseError)?;
        let id = insert_event(&mut conn, user_id, &event)
            .await
            .map_err(ApiError::DatabaseError)?;
        drop(conn);

        info!(event_id = %id, user_id = %user_id, "Calendar event created");
        self.get_event(user_id, &id).await
    }

    /// Full replacement. Moving the start time re-arms the reminder.
    pub async fn update_event(
        &self,
        user_id: &str,
        event_id: &str,
        request: &EventRequest,
    ) -> Result<CalendarEvent, ApiError> {
        let existing = self.get_event(user_id, event_id).await?;
        let event = validated(request)?;
        let reminder_sent = existing.reminder_sent && existing.start_time == event.start_time;

        sqlx::query(
            r#"
            UPDATE calendar_events
            SET title = ?, description = ?, location = ?, start_time = ?, end_time = ?,
                all_day = ?, color = ?, reminder_sent = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(&event.title)
        .bind(&event.description)
        .bind(&event.location)
        .bind(&event.start_time)
        .bind(&event.end_time)
        .bind(event.all_day)
        .bind(&event.color)
        .bind(reminder_sent)
        .bind(now_rfc3339())
        .bind(event_id)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        self.get_event(user_id, event_id).await
    }

    pub async fn delete_event(&self, user_id: &str, event_id: &str) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM calendar_events WHERE id = ? AND user_id = ?")
            .bind(event_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Event not found".to_string()));
        }

        info!(event_id = %event_id, user_id = %user_id, "Calendar event deleted");
        Ok(())
    }

    // ============================================================================
    // Reminders
    // ============================================================================

    /// Events starting in `[from, until]` that have not been reminded yet
    pub async fn due_for_reminder(&self, from: &str, until: &str) -> Result<Vec<CalendarEvent>, sqlx::Error> {
        sqlx::query_as::<_, CalendarEvent>(&format!(
            r#"
            SELECT {EVENT_COLUMNS}
            FROM calendar_events
            WHERE reminder_sent = 0 AND start_time >= ? AND start_time <= ?
            ORDER BY start_time ASC
            "#
        ))
        .bind(from)
        .bind(until)
        .fetch_all(&self.db)
        .await
    }

    pub async fn mark_reminder_sent(&self, event_id: &str) -> Result<(), sqlx::Error> {
        sqlx::query("UPDATE calendar_events SET reminder_sent = 1 WHERE id = ?")
            .bind(event_id)
            .execute(&self.db)
            .await?;
        Ok(())
    }
}
