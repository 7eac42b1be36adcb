// src/notifications/services.rs
//! Notification storage and Web Push delivery with VAPID (RFC 8292)

use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use reqwest::{Client, StatusCode};
use serde::Serialize;
use sqlx::SqlitePool;
use std::env;
use std::fmt;
use thiserror::Error;
use tracing::{debug, info, warn};

use super::models::{DeliveryReport, Notification, PushSubscription, SubscribeRequest};
use crate::common::{
    generate_notification_id, generate_subscription_id, helpers::now_rfc3339, ApiError,
};

const PUSH_TTL_SECONDS: u32 = 24 * 3600;
const VAPID_TOKEN_LIFETIME_SECONDS: i64 = 12 * 3600;

#[derive(Debug, Error)]
pub enum PushError {
    #[error("invalid VAPID configuration: {0}")]
    Config(String),

    #[error("failed to sign VAPID token: {0}")]
    Jwt(#[from] jsonwebtoken::errors::Error),

    #[error("invalid push endpoint: {0}")]
    InvalidEndpoint(String),

    #[error("push request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl From<PushError> for ApiError {
    fn from(err: PushError) -> Self {
        match err {
            PushError::Database(e) => ApiError::DatabaseError(e),
            PushError::InvalidEndpoint(msg) => ApiError::BadRequest(msg),
            other => ApiError::InternalServer(other.to_string()),
        }
    }
}

#[derive(Clone)]
pub struct VapidConfig {
    /// Uncompressed P-256 public key, base64url without padding
    pub public_key: String,
    /// PKCS#8 PEM; `\n` escapes are accepted so it fits in one env line
    pub private_key_pem: String,
    /// `mailto:` or `https:` contact
    pub subject: String,
}

impl fmt::Debug for VapidConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VapidConfig")
            .field("public_key", &self.public_key)
            .field("private_key_pem", &"[REDACTED]")
            .field("subject", &self.subject)
            .finish()
    }
}

impl VapidConfig {
    /// `None` unless both keys are set
    pub fn from_env() -> Option<Self> {
        let public_key = env::var("VAPID_PUBLIC_KEY").ok().filter(|v| !v.trim().is_empty())?;
        let private_key_pem = env::var("VAPID_PRIVATE_KEY_PEM")
            .ok()
            .filter(|v| !v.trim().is_empty())?
            .replace("\\n", "\n");
        let subject =
            env::var("VAPID_SUBJECT").unwrap_or_else(|_| "mailto:admin@localhost".to_string());

        Some(Self {
            public_key: public_key.trim().to_string(),
            private_key_pem,
            subject,
        })
    }
}

#[derive(Debug, Serialize)]
struct VapidClaims<'a> {
    aud: String,
    exp: i64,
    sub: &'a str,
}

struct VapidSigner {
    public_key: String,
    subject: String,
    key: EncodingKey,
}

impl VapidSigner {
    fn new(config: VapidConfig) -> Result<Self, PushError> {
        let key = EncodingKey::from_ec_pem(config.private_key_pem.as_bytes())
            .map_err(|e| PushError::Config(e.to_string()))?;
        Ok(Self {
            public_key: config.public_key,
            subject: config.subject,
            key,
        })
    }

    /// `Authorization` header value for one push endpoint
    fn authorization(&self, endpoint: &str) -> Result<String, PushError> {
        let url = url::Url::parse(endpoint)
            .map_err(|e| PushError::InvalidEndpoint(format!("{}: {}", endpoint, e)))?;
        let claims = VapidClaims {
            aud: url.origin().ascii_serialization(),
            exp: Utc::now().timestamp() + VAPID_TOKEN_LIFETIME_SECONDS,
            sub: &self.subject,
        };
        let token = encode(&Header::new(Algorithm::ES256), &claims, &self.key)?;
        Ok(format!("vapid t={}, k={}", token, self.public_key))
    }
}

pub struct NotificationService {
    db: SqlitePool,
    http: Client,
    vapid: Option<VapidSigner>,
}

impl NotificationService {
    pub fn new(db: SqlitePool, http: Client, vapid: Option<VapidConfig>) -> Result<Self, PushError> {
        let vapid = match vapid {
            Some(config) => {
                info!("Web push enabled");
                Some(VapidSigner::new(config)?)
            }
            None => {
                info!("VAPID keys not configured; notifications are stored only");
                None
            }
        };

        Ok(Self { db, http, vapid })
    }

    pub fn vapid_public_key(&self) -> Option<&str> {
        self.vapid.as_ref().map(|v| v.public_key.as_str())
    }

    // ============================================================================
    // Subscriptions
    // ============================================================================

    /// Upsert keyed by endpoint; a browser that changes hands moves to the new user
    pub async fn subscribe(&self, user_id: &str, request: &SubscribeRequest) -> Result<(), ApiError> {
        sqlx::query(
            r#"
            INSERT INTO push_subscriptions (id, user_id, endpoint, p256dh, auth, created_at)
            VALUES (?, ?, ?, ?, ?, ?)
            ON CONFLICT(endpoint) DO UPDATE SET
                user_id = excluded.user_id,
                p256dh = excluded.p256dh,
                auth = excluded.auth
            "#,
        )
        .bind(generate_subscription_id())
        .bind(user_id)
        .bind(&request.endpoint)
        .bind(&request.keys.p256dh)
        .bind(&request.keys.auth)
        .bind(now_rfc3339())
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        info!(user_id = %user_id, "Push subscription saved");
        Ok(())
    }

    pub async fn unsubscribe(&self, user_id: &str, endpoint: &str) -> Result<bool, ApiError> {
        let result = sqlx::query("DELETE FROM push_subscriptions WHERE user_id = ? AND endpoint = ?")
            .bind(user_id)
            .bind(endpoint)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        Ok(result.rows_affected() > 0)
    }

    pub async fn subscriptions_for(&self, user_id: &str) -> Result<Vec<PushSubscription>, sqlx::Error> {
        sqlx::query_as::<_, PushSubscription>(
            "SELECT id, user_id, endpoint, p256dh, auth, created_at FROM push_subscriptions WHERE user_id = ?",
        )
        .bind(user_id)
        .fetch_all(&self.db)
        .await
    }

    // ============================================================================
    // Delivery
    // ============================================================================

    /// Stores the notification, then pings every subscription of the user.
    /// Only the store can fail; delivery problems are logged and counted.
    pub async fn notify(
        &self,
        user_id: &str,
        title: &str,
        body: &str,
        url: Option<&str>,
    ) -> Result<DeliveryReport, PushError> {
        sqlx::query(
            "INSERT INTO notifications (id, user_id, title, body, url, read_at, created_at) VALUES (?, ?, ?, ?, ?, NULL, ?)",
        )
        .bind(generate_notification_id())
        .bind(user_id)
        .bind(title)
        .bind(body)
        .bind(url)
        .bind(now_rfc3339())
        .execute(&self.db)
        .await?;

        let Some(signer) = &self.vapid else {
            debug!(user_id = %user_id, "Push disabled, notification stored only");
            return Ok(DeliveryReport::default());
        };

        let mut report = DeliveryReport::default();

        for subscription in self.subscriptions_for(user_id).await? {
            match self.push(signer, &subscription.endpoint).await {
                Ok(status) if status.is_success() => report.delivered += 1,
                Ok(status) if status == StatusCode::NOT_FOUND || status == StatusCode::GONE => {
                    info!(subscription_id = %subscription.id, "Push subscription expired, removing");
                    sqlx::query("DELETE FROM push_subscriptions WHERE id = ?")
                        .bind(&subscription.id)
                        .execute(&self.db)
                        .await?;
                    report.removed += 1;
                }
                Ok(status) => {
                    warn!(subscription_id = %subscription.id, status = %status, "Push service rejected message");
                    report.failed += 1;
                }
                Err(e) => {
                    warn!(subscription_id = %subscription.id, error = %e, "Push delivery failed");
                    report.failed += 1;
                }
            }
        }

        debug!(
            user_id = %user_id,
            delivered = report.delivered,
            failed = report.failed,
            removed = report.removed,
            "Push fan-out finished"
        );
        Ok(report)
    }

    async fn push(&self, signer: &VapidSigner, endpoint: &str) -> Result<StatusCode, PushError> {
        let response = self
            .http
            .post(endpoint)
            .header("Authorization", signer.authorization(endpoint)?)
            .header("TTL", PUSH_TTL_SECONDS.to_string())
            .header("Urgency", "normal")
            .body(Vec::<u8>::new())
            .send()
            .await?;

        Ok(response.status())
    }

    /// Unread notifications, oldest first; they are marked read on the way out
    pub async fn pending(&self, user_id: &str) -> Result<Vec<Notification>, ApiError> {
        let mut tx = self.db.begin().await.map_err(ApiError::DatabaseError)?;

        let notifications = sqlx::query_as::<_, Notification>(
            r#"
            SELECT id, user_id, title, body, url, read_at, created_at
            FROM notifications
            WHERE user_id = ? AND read_at IS NULL
            ORDER BY created_at ASC, rowid ASC
            "#,
        )
        .bind(user_id)
        .fetch_all(&mut *tx)
        .await
        .map_err(ApiError::DatabaseError)?;

        sqlx::query("UPDATE notifications SET read_at = ? WHERE user_id = ? AND read_at IS NULL")
            .bind(now_rfc3339())
            .bind(user_id)
            .execute(&mut *tx)
            .await
            .map_err(ApiError::DatabaseError)?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;
        Ok(notifications)
    }
}
