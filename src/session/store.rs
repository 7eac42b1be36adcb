// src/session/store.rs
//! SQLite persistence for sessions

use sqlx::SqlitePool;
use thiserror::Error;
use tracing::{debug, warn};

use super::models::SessionData;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("Session storage error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Session data could not be serialized: {0}")]
    Serialization(#[from] serde_json::Error),
}

#[derive(Debug, Clone)]
pub struct SessionStore {
    db: SqlitePool,
    lifetime_seconds: i64,
}

impl SessionStore {
    pub fn new(db: SqlitePool, lifetime_seconds: i64) -> Self {
        Self {
            db,
            lifetime_seconds,
        }
    }

    /// Loads a live session. Expired rows are deleted and unreadable rows
    /// are treated as missing.
    pub async fn load(&self, id: &str, now: i64) -> Result<Option<SessionData>, SessionError> {
        let row: Option<(String, i64)> =
            sqlx::query_as("SELECT data, expires_at FROM sessions WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.db)
                .await?;

        let Some((data, expires_at)) = row else {
            return Ok(None);
        };

        if expires_at <= now {
            debug!("Session expired, removing");
            self.delete(id).await?;
            return Ok(None);
        }

        match serde_json::from_str(&data) {
            Ok(data) => Ok(Some(data)),
            Err(e) => {
                warn!(error = %e, "Discarding unreadable session");
                self.delete(id).await?;
                Ok(None)
            }
        }
    }

    /// Inserts or updates a session. The absolute expiry is fixed when the
    /// row is first written.
    pub async fn save(&self, id: &str, data: &SessionData, now: i64) -> Result<(), SessionError> {
        let json = serde_json::to_string(data)?;

        sqlx::query(
            r#"
            INSERT INTO sessions (id, data, expires_at, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(id) DO UPDATE SET
                data = excluded.data,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(id)
        .bind(json)
        .bind(now + self.lifetime_seconds)
        .bind(now)
        .execute(&self.db)
        .await?;

        Ok(())
    }

    pub async fn delete(&self, id: &str) -> Result<(), SessionError> {
        sqlx::query("DELETE FROM sessions WHERE id = ?")
            .bind(id)
            .execute(&self.db)
            .await?;
        Ok(())
    }

    /// Removes every session owned by `user_id`
    pub async fn delete_for_user(&self, user_id: &str) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE json_extract(data, '$.user_id') = ?")
            .bind(user_id)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }

    pub async fn purge_expired(&self, now: i64) -> Result<u64, SessionError> {
        let result = sqlx::query("DELETE FROM sessions WHERE expires_at <= ?")
            .bind(now)
            .execute(&self.db)
            .await?;
        Ok(result.rows_affected())
    }
}
