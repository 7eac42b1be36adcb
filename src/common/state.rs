// Application state shared across all modules

use reqwest::Client;
use sqlx::SqlitePool;
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::auth::{AuthService, IdentityProvider};
use crate::common::config::AppConfig;
use crate::common::dev_mode::DevModeConfig;
use crate::notifications::NotificationService;
use crate::services::{
    AuditLog, EmailService, EncryptionError, RateLimitService, TokenCipher, UserTokenStore,
};
use crate::session::SessionStore;

pub type SharedState = Arc<RwLock<AppState>>;

/// Outbound integrations, injected so tests can swap them
pub struct Integrations {
    pub http: Client,
    pub identity_provider: Arc<dyn IdentityProvider>,
    pub email: EmailService,
    pub notifications: NotificationService,
    pub rate_limit: RateLimitService,
}

/// Application state containing database pool, services, and configuration
#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub http: Client,
    pub config: AppConfig,
    pub dev_mode: DevModeConfig,
    pub sessions: SessionStore,
    pub audit: AuditLog,
    pub token_store: Arc<UserTokenStore>,
    pub auth_service: Arc<AuthService>,
    pub rate_limit_service: Arc<RateLimitService>,
    pub email_service: Arc<EmailService>,
    pub notifications: Arc<NotificationService>,
}

impl AppState {
    /// Fails only when the configured encryption secrets are unusable
    pub fn new(
        db: SqlitePool,
        config: AppConfig,
        dev_mode: DevModeConfig,
        integrations: Integrations,
    ) -> Result<Self, EncryptionError> {
        let cipher = Arc::new(TokenCipher::new(
            &config.app_secret_curr,
            config.app_secret_prev.as_deref(),
        )?);

        let sessions = SessionStore::new(db.clone(), config.session_lifetime_seconds);
        let audit = AuditLog::new(db.clone());
        let token_store = Arc::new(UserTokenStore::new(db.clone(), cipher));

        let auth_service = Arc::new(AuthService::new(
            db.clone(),
            integrations.identity_provider,
            token_store.clone(),
            sessions.clone(),
            audit.clone(),
            config.google.client_id.clone(),
            config.email_allowlist.clone(),
        ));

        Ok(Self {
            db,
            http: integrations.http,
            config,
            dev_mode,
            sessions,
            audit,
            token_store,
            auth_service,
            rate_limit_service: Arc::new(integrations.rate_limit),
            email_service: Arc::new(integrations.email),
            notifications: Arc::new(integrations.notifications),
        })
    }

    pub fn shared(self) -> SharedState {
        Arc::new(RwLock::new(self))
    }
}
