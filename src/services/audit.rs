// src/services/audit.rs
//! Append-only security audit log

use async_trait::async_trait;
use axum::{
    extract::FromRequestParts,
    http::{header::USER_AGENT, request::Parts},
};
use serde::Serialize;
use sqlx::{FromRow, SqlitePool};
use std::convert::Infallible;
use tracing::{info, warn};

use crate::common::helpers::{now_rfc3339, redact_emails};
use crate::common::id_generator::generate_audit_id;
use crate::rate_limit_middleware::client_ip;

/// Client details recorded with audit entries
#[derive(Debug, Clone, Default)]
pub struct RequestMeta {
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

impl RequestMeta {
    pub fn from_parts(parts: &Parts) -> Self {
        Self {
            ip: client_ip(&parts.extensions),
            user_agent: parts
                .headers
                .get(USER_AGENT)
                .and_then(|v| v.to_str().ok())
                .map(|s| s.chars().take(255).collect()),
        }
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for RequestMeta
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(RequestMeta::from_parts(parts))
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AuditRecord {
    pub id: String,
    pub user_id: Option<String>,
    pub event_type: String,
    pub detail: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub created_at: String,
}

#[derive(Debug, Clone)]
pub struct AuditLog {
    db: SqlitePool,
}

impl AuditLog {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    /// Records an event. Emails in `detail` are masked before storage.
    /// Write failures are logged and swallowed.
    pub async fn record(
        &self,
        event_type: &str,
        user_id: Option<&str>,
        detail: &str,
        meta: &RequestMeta,
    ) {
        let detail = redact_emails(detail);

        let result = sqlx::query(
            r#"
            INSERT INTO audit_logs (id, user_id, event_type, detail, ip_address, user_agent, created_at)
            VALUES (?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(generate_audit_id())
        .bind(user_id)
        .bind(event_type)
        .bind(&detail)
        .bind(meta.ip.as_deref())
        .bind(meta.user_agent.as_deref())
        .bind(now_rfc3339())
        .execute(&self.db)
        .await;

        match result {
            Ok(_) => info!(
                event_type = %event_type,
                user_id = ?user_id,
                ip = ?meta.ip,
                "Audit event recorded"
            ),
            Err(e) => warn!(
                error = %e,
                event_type = %event_type,
                "Failed to write audit log entry"
            ),
        }
    }

    pub async fn recent(&self, event_type: &str, limit: i64) -> Result<Vec<AuditRecord>, sqlx::Error> {
        sqlx::query_as::<_, AuditRecord>(
            r#"
            SELECT id, user_id, event_type, detail, ip_address, user_agent, created_at
            FROM audit_logs
            WHERE event_type = ?
            ORDER BY created_at DESC, rowid DESC
            LIMIT ?
            "#,
        )
        .bind(event_type)
        .bind(limit)
        .fetch_all(&self.db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::migrations::test_support::test_pool;

    #[tokio::test]
    async fn test_record_redacts_emails() {
        let audit = AuditLog::new(test_pool().await);
        let meta = RequestMeta {
            ip: Some("203.0.113.9".into()),
            user_agent: Some("test-agent".into()),
        };

        audit
            .record("security.access_denied", None, "Denied login for alice@example.com", &meta)
            .await;

        let entries = audit.recent("security.access_denied", 10).await.unwrap();
        assert_eq!(entries.len(), 1);
        let detail = entries[0].detail.clone().unwrap();
        assert!(!detail.contains("alice@example.com"));
        assert!(detail.contains("a***@example.com"));
        assert_eq!(entries[0].ip_address.as_deref(), Some("203.0.113.9"));
    }
}
