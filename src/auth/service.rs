//! Login flow: OAuth authorization code + PKCE, ID token checks, allowlist,
//! user upsert and encrypted token persistence

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};
use chrono::Utc;
use rand::RngCore;
use sha2::{Digest, Sha256};
use sqlx::SqlitePool;
use std::sync::Arc;
use thiserror::Error;
use tracing::{info, warn};

use super::models::{ExchangedTokens, IdTokenClaims, User};
use super::provider::{IdentityProvider, ProviderError, GOOGLE_ISSUERS};
use crate::common::{
    generate_user_id,
    helpers::{constant_time_eq, now_rfc3339, random_hex},
    safe_email_log, ApiError,
};
use crate::services::audit::{AuditLog, RequestMeta};
use crate::services::user_tokens::{StoredTokens, TokenStoreError, UserTokenStore};
use crate::session::{Session, SessionStore};

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Invalid or expired OAuth state")]
    InvalidState,

    #[error("PKCE verifier missing or expired")]
    MissingVerifier,

    #[error("Token exchange failed: {0}")]
    TokenExchange(String),

    #[error("ID token rejected: {0}")]
    InvalidIdToken(String),

    #[error("Email address is not authorized")]
    NotAuthorized,

    #[error(transparent)]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    TokenStore(#[from] TokenStoreError),
}

impl From<AuthError> for ApiError {
    fn from(err: AuthError) -> Self {
        match err {
            AuthError::NotAuthorized => ApiError::Forbidden(err.to_string()),
            AuthError::Database(e) => ApiError::DatabaseError(e),
            AuthError::TokenStore(e) => ApiError::InternalServer(e.to_string()),
            other => ApiError::BadRequest(other.to_string()),
        }
    }
}

/// PKCE S256 challenge for a verifier
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

fn new_code_verifier() -> String {
    let mut bytes = [0u8; 64];
    rand::thread_rng().fill_bytes(&mut bytes);
    URL_SAFE_NO_PAD.encode(bytes)
}

pub struct AuthService {
    db: SqlitePool,
    provider: Arc<dyn IdentityProvider>,
    token_store: Arc<UserTokenStore>,
    sessions: SessionStore,
    audit: AuditLog,
    client_id: String,
    allowlist: Vec<String>,
}

impl AuthService {
    pub fn new(
        db: SqlitePool,
        provider: Arc<dyn IdentityProvider>,
        token_store: Arc<UserTokenStore>,
        sessions: SessionStore,
        audit: AuditLog,
        client_id: String,
        allowlist: Vec<String>,
    ) -> Self {
        if allowlist.is_empty() {
            warn!("EMAIL_ALLOWLIST is empty; every login will be denied");
        }
        Self {
            db,
            provider,
            token_store,
            sessions,
            audit,
            client_id,
            allowlist,
        }
    }

    /// Stores fresh state + verifier in the session and returns the
    /// provider's authorization URL
    pub async fn initiate_login(&self, session: &Session, meta: &RequestMeta) -> String {
        let verifier = new_code_verifier();
        let state = random_hex(32);
        let challenge = code_challenge(&verifier);

        session
            .begin_oauth(state.clone(), verifier, Utc::now().timestamp())
            .await;

        self.audit
            .record("auth.login_initiated", None, "OAuth login started", meta)
            .await;

        self.provider.authorization_url(&state, &challenge)
    }

    pub async fn validate_state(&self, session: &Session, presented: &str, meta: &RequestMeta) -> bool {
        self.validate_state_at(session, presented, Utc::now().timestamp(), meta)
            .await
    }

    /// The stored state is consumed by every attempt, valid or not
    pub async fn validate_state_at(
        &self,
        session: &Session,
        presented: &str,
        now: i64,
        meta: &RequestMeta,
    ) -> bool {
        let Some(stored) = session.take_oauth_state().await else {
            warn!("OAuth callback without a stored state");
            return false;
        };

        if !stored.is_valid_at(now) {
            warn!("OAuth state expired");
            return false;
        }

        if !constant_time_eq(&stored.value, presented) {
            self.audit
                .record("security.state_mismatch", None, "OAuth state mismatch", meta)
                .await;
            return false;
        }

        true
    }

    /// Trades the authorization code for tokens using the stored PKCE
    /// verifier, which is consumed here
    pub async fn exchange_code_for_tokens(
        &self,
        session: &Session,
        code: &str,
    ) -> Result<ExchangedTokens, AuthError> {
        let verifier = session
            .take_pkce_verifier()
            .await
            .filter(|v| v.is_valid_at(Utc::now().timestamp()))
            .ok_or(AuthError::MissingVerifier)?;

        let response = self
            .provider
            .exchange_code(code, &verifier.value)
            .await
            .map_err(|e| AuthError::TokenExchange(e.to_string()))?;

        let access_token = response
            .access_token
            .ok_or_else(|| AuthError::TokenExchange("response has no access_token".into()))?;
        let id_token = response
            .id_token
            .ok_or_else(|| AuthError::TokenExchange("response has no id_token".into()))?;

        Ok(ExchangedTokens {
            access_token,
            refresh_token: response.refresh_token,
            expires_in: response.expires_in,
            id_token,
        })
    }

    pub async fn verify_id_token(&self, id_token: &str, meta: &RequestMeta) -> Result<IdTokenClaims, AuthError> {
        match self.check_id_token(id_token).await {
            Ok(claims) => Ok(claims),
            Err(reason) => {
                warn!(reason = %reason, "ID token rejected");
                self.audit
                    .record(
                        "security.id_token_invalid",
                        None,
                        &format!("ID token rejected: {}", reason),
                        meta,
                    )
                    .await;
                Err(AuthError::InvalidIdToken(reason))
            }
        }
    }

    /// Signature check by the provider, then audience/issuer/expiry again
    async fn check_id_token(&self, id_token: &str) -> Result<IdTokenClaims, String> {
        let claims = self
            .provider
            .verify_id_token_signature(id_token)
            .await
            .map_err(|e: ProviderError| e.to_string())?;

        if claims.aud != self.client_id {
            return Err("audience mismatch".to_string());
        }
        if !GOOGLE_ISSUERS.contains(&claims.iss.as_str()) {
            return Err(format!("unexpected issuer {}", claims.iss));
        }
        if claims.exp <= Utc::now().timestamp() {
            return Err("token expired".to_string());
        }
        if claims.email.as_deref().map_or(true, |e| e.trim().is_empty()) {
            return Err("token has no email".to_string());
        }

        Ok(claims)
    }

    /// Case-insensitive allowlist check; an empty list denies everyone
    pub async fn is_email_allowed(&self, email: &str, meta: &RequestMeta) -> bool {
        let normalized = email.trim().to_lowercase();
        let allowed = !normalized.is_empty() && self.allowlist.iter().any(|e| *e == normalized);

        if !allowed {
            self.audit
                .record(
                    "security.access_denied",
                    None,
                    &format!("Login denied for {}", normalized),
                    meta,
                )
                .await;
        }

        allowed
    }

    /// Runs every login gate in order. Nothing is written to the session
    /// unless all of them pass.
    pub async fn handle_callback(
        &self,
        session: &Session,
        code: &str,
        state: &str,
        meta: &RequestMeta,
    ) -> Result<User, AuthError> {
        if !self.validate_state(session, state, meta).await {
            return Err(AuthError::InvalidState);
        }

        let tokens = self.exchange_code_for_tokens(session, code).await?;
        let claims = self.verify_id_token(&tokens.id_token, meta).await?;

        let email = claims.email.clone().unwrap_or_default();
        if !self.is_email_allowed(&email, meta).await {
            return Err(AuthError::NotAuthorized);
        }

        let user = self.upsert_user(&claims).await?;

        self.token_store
            .save(
                &user.id,
                &StoredTokens {
                    access_token: tokens.access_token,
                    refresh_token: tokens.refresh_token,
                    expires_at: tokens.expires_in.map(|s| Utc::now().timestamp() + s),
                },
            )
            .await?;

        session.login(&user.id).await;

        self.audit
            .record(
                "auth.login_success",
                Some(&user.id),
                &format!("Login for {}", user.email),
                meta,
            )
            .await;

        info!(user_id = %user.id, email = %safe_email_log(&user.email), "User logged in");

        Ok(user)
    }

    /// Inserts on first login, refreshes profile fields afterwards
    async fn upsert_user(&self, claims: &IdTokenClaims) -> Result<User, sqlx::Error> {
        let now = now_rfc3339();
        let email = claims.email.clone().unwrap_or_default().trim().to_lowercase();

        sqlx::query(
            r#"
            INSERT INTO users (id, google_user_id, email, name, picture, created_at, updated_at, last_login_at)
            VALUES (?, ?, ?, ?, ?, ?, ?, ?)
            ON CONFLICT(google_user_id) DO UPDATE SET
                email = excluded.email,
                name = excluded.name,
                picture = excluded.picture,
                updated_at = excluded.updated_at,
                last_login_at = excluded.last_login_at
            "#,
        )
        .bind(generate_user_id())
        .bind(&claims.sub)
        .bind(&email)
        .bind(&claims.name)
        .bind(&claims.picture)
        .bind(&now)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await?;

        sqlx::query_as::<_, User>("SELECT * FROM users WHERE google_user_id = ?")
            .bind(&claims.sub)
            .fetch_one(&self.db)
            .await
    }

    /// Best effort: failures are logged and otherwise ignored
    async fn revoke_stored_token(&self, user_id: &str) {
        match self.token_store.load(user_id).await {
            Ok(Some(tokens)) => {
                let token = tokens.refresh_token.as_deref().unwrap_or(&tokens.access_token);
                if let Err(e) = self.provider.revoke_token(token).await {
                    warn!(user_id = %user_id, error = %e, "Token revocation failed");
                }
            }
            Ok(None) => {}
            Err(e) => warn!(user_id = %user_id, error = %e, "Could not load tokens for revocation"),
        }
    }

    pub async fn logout(&self, session: &Session, user_id: &str, meta: &RequestMeta) -> Result<(), AuthError> {
        self.audit
            .record("auth.logout", Some(user_id), "User logged out", meta)
            .await;

        self.revoke_stored_token(user_id).await;
        self.token_store.delete(user_id).await?;
        session.destroy().await;

        info!(user_id = %user_id, "User logged out");
        Ok(())
    }

    /// Removes the user and everything they own in one transaction
    pub async fn delete_account(&self, session: &Session, user_id: &str, meta: &RequestMeta) -> Result<(), AuthError> {
        self.revoke_stored_token(user_id).await;

        let mut tx = self.db.begin().await?;

        let owned_rows = [
            "DELETE FROM schedule_request_slots WHERE request_id IN \
             (SELECT id FROM schedule_requests WHERE sender_id = ? OR recipient_id = ?)",
            "DELETE FROM schedule_requests WHERE sender_id = ? OR recipient_id = ?",
        ];
        for statement in owned_rows {
            sqlx::query(statement)
                .bind(user_id)
                .bind(user_id)
                .execute(&mut *tx)
                .await?;
        }

        let single_owner = [
            "DELETE FROM calendar_events WHERE user_id = ?",
            "DELETE FROM tasks WHERE user_id = ?",
            "DELETE FROM push_subscriptions WHERE user_id = ?",
            "DELETE FROM notifications WHERE user_id = ?",
            "DELETE FROM user_tokens WHERE user_id = ?",
            "DELETE FROM users WHERE id = ?",
        ];
        for statement in single_owner {
            sqlx::query(statement).bind(user_id).execute(&mut *tx).await?;
        }

        tx.commit().await?;

        if let Err(e) = self.sessions.delete_for_user(user_id).await {
            warn!(user_id = %user_id, error = %e, "Failed to remove other sessions");
        }
        session.destroy().await;

        self.audit
            .record("auth.account_deleted", Some(user_id), "Account deleted", meta)
            .await;

        info!(user_id = %user_id, "Account deleted");
        Ok(())
    }

    pub async fn find_user(&self, user_id: &str) -> Result<Option<User>, sqlx::Error> {
        sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = ?")
            .bind(user_id)
            .fetch_optional(&self.db)
            .await
    }
}
