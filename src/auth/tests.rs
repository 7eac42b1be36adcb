//! Tests for auth module
//!
//! These tests drive the login flow against a scripted identity provider:
//! - OAuth state is single use and expires
//! - Allowlist checks
//! - Callback success and denial, including audit entries
//! - Every token and ID token gate leaves the session anonymous

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::common::migrations::test_support::{insert_user, test_pool};
    use crate::services::audit::{AuditLog, RequestMeta};
    use crate::services::encryption::TokenCipher;
    use crate::services::user_tokens::UserTokenStore;
    use crate::session::{Session, SessionData, SessionStore};
    use async_trait::async_trait;
    use chrono::Utc;
    use models::{IdTokenClaims, ProviderTokenResponse};
    use provider::ProviderError;
    use sqlx::SqlitePool;
    use std::sync::{Arc, Mutex};

    const CLIENT_ID: &str = "household-client.apps.googleusercontent.com";
    const SECRET: &str = "00112233445566778899aabbccddeeff00112233445566778899aabbccddeeff";

    /// Scripted provider: returns whatever tokens and claims the test sets
    struct FakeProvider {
        tokens: ProviderTokenResponse,
        claims: IdTokenClaims,
        revoked: Mutex<Vec<String>>,
    }

    impl FakeProvider {
        fn for_email(email: &str) -> Self {
            Self {
                tokens: ProviderTokenResponse {
                    access_token: Some("ya29.access".to_string()),
                    refresh_token: Some("1//refresh".to_string()),
                    expires_in: Some(3599),
                    id_token: Some("header.payload.signature".to_string()),
                    ..Default::default()
                },
                claims: IdTokenClaims {
                    sub: "google-sub-1".to_string(),
                    aud: CLIENT_ID.to_string(),
                    iss: "https://accounts.google.com".to_string(),
                    exp: Utc::now().timestamp() + 3600,
                    email: Some(email.to_string()),
                    email_verified: Some(true),
                    name: Some("Alex Doe".to_string()),
                    picture: None,
                },
                revoked: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl IdentityProvider for FakeProvider {
        fn authorization_url(&self, state: &str, code_challenge: &str) -> String {
            format!(
                "https://accounts.example.test/auth?state={}&code_challenge={}",
                state, code_challenge
            )
        }

        async fn exchange_code(
            &self,
            _code: &str,
            _code_verifier: &str,
        ) -> Result<ProviderTokenResponse, ProviderError> {
            Ok(self.tokens.clone())
        }

        async fn verify_id_token_signature(
            &self,
            _id_token: &str,
        ) -> Result<IdTokenClaims, ProviderError> {
            Ok(self.claims.clone())
        }

        async fn revoke_token(&self, token: &str) -> Result<(), ProviderError> {
            self.revoked.lock().unwrap().push(token.to_string());
            Ok(())
        }
    }

    fn build_service(pool: &SqlitePool, provider: Arc<FakeProvider>, allowlist: &[&str]) -> AuthService {
        let cipher = Arc::new(TokenCipher::new(SECRET, None).unwrap());
        AuthService::new(
            pool.clone(),
            provider,
            Arc::new(UserTokenStore::new(pool.clone(), cipher)),
            SessionStore::new(pool.clone(), 3600),
            AuditLog::new(pool.clone()),
            CLIENT_ID.to_string(),
            allowlist.iter().map(|s| s.to_string()).collect(),
        )
    }

    async fn audit_count(pool: &SqlitePool, event_type: &str) -> usize {
        AuditLog::new(pool.clone())
            .recent(event_type, 100)
            .await
            .unwrap()
            .len()
    }

    fn state_from_url(url: &str) -> String {
        let parsed = url::Url::parse(url).unwrap();
        parsed
            .query_pairs()
            .find(|(k, _)| k == "state")
            .map(|(_, v)| v.into_owned())
            .unwrap()
    }

    // ============================================================================
    // PKCE
    // ============================================================================

    #[test]
    fn test_code_challenge_is_s256_base64url() {
        let challenge =
            service::code_challenge("household-verifier-0123456789-abcdefghijklmnopqrstuvwxyz");
        assert_eq!(challenge, "PQcWbZcebOCKjSmP2gG3mt-XY3JSDimdgwDC8ObZCCc");
    }

    #[tokio::test]
    async fn test_initiate_login_stores_state_and_verifier() {
        let pool = test_pool().await;
        let service = build_service(&pool, Arc::new(FakeProvider::for_email("a@x.com")), &["a@x.com"]);
        let session = Session::fresh();

        let url = service.initiate_login(&session, &RequestMeta::default()).await;

        let data = session.snapshot().await;
        let stored_state = data.oauth_state.expect("state stored");
        let verifier = data.pkce_verifier.expect("verifier stored");
        assert_eq!(stored_state.value, state_from_url(&url));
        assert!(url.contains(&service::code_challenge(&verifier.value)));
        assert_eq!(audit_count(&pool, "auth.login_initiated").await, 1);
    }

    // ============================================================================
    // State Validation
    // ============================================================================

    #[tokio::test]
    async fn test_state_is_accepted_exactly_once() {
        let pool = test_pool().await;
        let service = build_service(&pool, Arc::new(FakeProvider::for_email("a@x.com")), &[]);
        let session = Session::existing("sid".to_string(), SessionData::new());
        let meta = RequestMeta::default();

        session
            .begin_oauth("s".repeat(64), "v".repeat(86), 1_000)
            .await;

        assert!(service.validate_state_at(&session, &"s".repeat(64), 1_010, &meta).await);
        assert!(!service.validate_state_at(&session, &"s".repeat(64), 1_011, &meta).await);
    }

    #[tokio::test]
    async fn test_state_expires_after_ten_minutes() {
        let pool = test_pool().await;
        let service = build_service(&pool, Arc::new(FakeProvider::for_email("a@x.com")), &[]);
        let meta = RequestMeta::default();

        let session = Session::existing("sid".to_string(), SessionData::new());
        session.begin_oauth("abc".to_string(), "v".to_string(), 1_000).await;
        assert!(service.validate_state_at(&session, "abc", 1_599, &meta).await);

        let session = Session::existing("sid".to_string(), SessionData::new());
        session.begin_oauth("abc".to_string(), "v".to_string(), 1_000).await;
        assert!(!service.validate_state_at(&session, "abc", 1_600, &meta).await);
    }

    #[tokio::test]
    async fn test_tampered_state_is_rejected_and_audited() {
        let pool = test_pool().await;
        let service = build_service(&pool, Arc::new(FakeProvider::for_email("a@x.com")), &[]);
        let session = Session::existing("sid".to_string(), SessionData::new());
        let now = Utc::now().timestamp();

        session.begin_oauth("a0b1c2d3".to_string(), "v".to_string(), now).await;
        let flipped = "a0b1c2d2";

        assert!(!service.validate_state_at(&session, flipped, now, &RequestMeta::default()).await);
        assert_eq!(audit_count(&pool, "security.state_mismatch").await, 1);
        // The stored value is gone even after a failed attempt
        assert!(session.snapshot().await.oauth_state.is_none());
    }

    // ============================================================================
    // Allowlist
    // ============================================================================

    #[tokio::test]
    async fn test_allowlist_is_case_insensitive() {
        let pool = test_pool().await;
        let service = build_service(
            &pool,
            Arc::new(FakeProvider::for_email("a@x.com")),
            &["alex@example.com", "sam@example.com"],
        );
        let meta = RequestMeta::default();

        assert!(service.is_email_allowed("Alex@Example.com", &meta).await);
        assert!(service.is_email_allowed(" sam@example.com ", &meta).await);
        assert!(!service.is_email_allowed("mallory@example.com", &meta).await);
        assert_eq!(audit_count(&pool, "security.access_denied").await, 1);
    }

    #[tokio::test]
    async fn test_empty_allowlist_denies_everyone() {
        let pool = test_pool().await;
        let service = build_service(&pool, Arc::new(FakeProvider::for_email("a@x.com")), &[]);

        assert!(!service.is_email_allowed("alex@example.com", &RequestMeta::default()).await);
    }

    // ============================================================================
    // Callback
    // ============================================================================

    #[tokio::test]
    async fn test_callback_logs_in_allowed_user() {
        let pool = test_pool().await;
        let provider = Arc::new(FakeProvider::for_email("Alex@Example.com"));
        let service = build_service(&pool, provider, &["alex@example.com"]);
        let session = Session::existing("sid".to_string(), SessionData::new());
        let meta = RequestMeta::default();

        let url = service.initiate_login(&session, &meta).await;
        let state = state_from_url(&url);

        let user = service
            .handle_callback(&session, "auth-code", &state, &meta)
            .await
            .unwrap();

        assert_eq!(user.email, "alex@example.com");
        assert_eq!(user.google_user_id, "google-sub-1");
        assert_eq!(session.user_id().await.as_deref(), Some(user.id.as_str()));
        assert_eq!(audit_count(&pool, "auth.login_success").await, 1);

        let (encrypted,): (String,) =
            sqlx::query_as("SELECT encrypted_tokens FROM user_tokens WHERE user_id = ?")
                .bind(&user.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert!(!encrypted.contains("ya29.access"));
    }

    #[tokio::test]
    async fn test_second_login_reuses_user_row() {
        let pool = test_pool().await;
        let provider = Arc::new(FakeProvider::for_email("alex@example.com"));
        let service = build_service(&pool, provider, &["alex@example.com"]);
        let meta = RequestMeta::default();

        let mut ids = Vec::new();
        for _ in 0..2 {
            let session = Session::existing("sid".to_string(), SessionData::new());
            let state = state_from_url(&service.initiate_login(&session, &meta).await);
            ids.push(service.handle_callback(&session, "code", &state, &meta).await.unwrap().id);
        }

        assert_eq!(ids[0], ids[1]);
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_callback_denies_email_outside_allowlist() {
        let pool = test_pool().await;
        let provider = Arc::new(FakeProvider::for_email("mallory@example.com"));
        let service = build_service(&pool, provider, &["alex@example.com"]);
        let session = Session::existing("sid".to_string(), SessionData::new());
        let meta = RequestMeta::default();

        let state = state_from_url(&service.initiate_login(&session, &meta).await);
        let result = service.handle_callback(&session, "code", &state, &meta).await;

        assert!(matches!(result, Err(AuthError::NotAuthorized)));
        assert!(session.user_id().await.is_none());
        assert_eq!(audit_count(&pool, "security.access_denied").await, 1);

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_callback_rejects_wrong_audience() {
        let pool = test_pool().await;
        let mut fake = FakeProvider::for_email("alex@example.com");
        fake.claims.aud = "someone-else".to_string();
        let service = build_service(&pool, Arc::new(fake), &["alex@example.com"]);
        let session = Session::existing("sid".to_string(), SessionData::new());
        let meta = RequestMeta::default();

        let state = state_from_url(&service.initiate_login(&session, &meta).await);
        let result = service.handle_callback(&session, "code", &state, &meta).await;

        assert!(matches!(result, Err(AuthError::InvalidIdToken(_))));
        assert_eq!(audit_count(&pool, "security.id_token_invalid").await, 1);
        assert!(session.user_id().await.is_none());
    }

    /// Runs a full callback against `fake` and checks nobody got signed in
    async fn rejected_callback(fake: FakeProvider) -> (SqlitePool, AuthError) {
        let pool = test_pool().await;
        let service = build_service(&pool, Arc::new(fake), &["alex@example.com"]);
        let session = Session::existing("sid".to_string(), SessionData::new());
        let meta = RequestMeta::default();

        let state = state_from_url(&service.initiate_login(&session, &meta).await);
        let err = service
            .handle_callback(&session, "code", &state, &meta)
            .await
            .unwrap_err();

        assert!(session.user_id().await.is_none());
        let (users,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(users, 0);
        assert_eq!(audit_count(&pool, "auth.login_success").await, 0);

        (pool, err)
    }

    #[tokio::test]
    async fn test_callback_rejects_response_without_access_token() {
        let mut fake = FakeProvider::for_email("alex@example.com");
        fake.tokens.access_token = None;

        let (_pool, err) = rejected_callback(fake).await;
        match err {
            AuthError::TokenExchange(reason) => assert!(reason.contains("access_token")),
            other => panic!("expected TokenExchange, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_callback_rejects_response_without_id_token() {
        let mut fake = FakeProvider::for_email("alex@example.com");
        fake.tokens.id_token = None;

        let (_pool, err) = rejected_callback(fake).await;
        match err {
            AuthError::TokenExchange(reason) => assert!(reason.contains("id_token")),
            other => panic!("expected TokenExchange, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_callback_rejects_unexpected_issuer() {
        let mut fake = FakeProvider::for_email("alex@example.com");
        fake.claims.iss = "https://evil.example".to_string();

        let (pool, err) = rejected_callback(fake).await;
        match err {
            AuthError::InvalidIdToken(reason) => assert!(reason.contains("unexpected issuer")),
            other => panic!("expected InvalidIdToken, got {:?}", other),
        }
        assert_eq!(audit_count(&pool, "security.id_token_invalid").await, 1);
    }

    #[tokio::test]
    async fn test_callback_rejects_expired_id_token() {
        let mut fake = FakeProvider::for_email("alex@example.com");
        fake.claims.exp = Utc::now().timestamp() - 1;

        let (pool, err) = rejected_callback(fake).await;
        match err {
            AuthError::InvalidIdToken(reason) => assert_eq!(reason, "token expired"),
            other => panic!("expected InvalidIdToken, got {:?}", other),
        }
        assert_eq!(audit_count(&pool, "security.id_token_invalid").await, 1);
    }

    #[tokio::test]
    async fn test_callback_without_verifier_is_refused() {
        let pool = test_pool().await;
        let service = build_service(
            &pool,
            Arc::new(FakeProvider::for_email("alex@example.com")),
            &["alex@example.com"],
        );
        let session = Session::existing("sid".to_string(), SessionData::new());
        let meta = RequestMeta::default();

        let state = state_from_url(&service.initiate_login(&session, &meta).await);
        session.take_pkce_verifier().await;

        let result = service.handle_callback(&session, "code", &state, &meta).await;

        assert!(matches!(result, Err(AuthError::MissingVerifier)));
        assert!(session.user_id().await.is_none());
    }

    #[tokio::test]
    async fn test_expired_verifier_is_refused() {
        let pool = test_pool().await;
        let service = build_service(
            &pool,
            Arc::new(FakeProvider::for_email("alex@example.com")),
            &["alex@example.com"],
        );
        let session = Session::existing("sid".to_string(), SessionData::new());
        let issued = Utc::now().timestamp() - 601;
        session.begin_oauth("s".repeat(64), "v".repeat(86), issued).await;

        let result = service.exchange_code_for_tokens(&session, "code").await;

        assert!(matches!(result, Err(AuthError::MissingVerifier)));
        assert!(session.snapshot().await.pkce_verifier.is_none());
        assert!(session.user_id().await.is_none());
    }

    #[tokio::test]
    async fn test_callback_with_unknown_state_never_reaches_provider() {
        let pool = test_pool().await;
        let service = build_service(&pool, Arc::new(FakeProvider::for_email("a@x.com")), &["a@x.com"]);
        let session = Session::existing("sid".to_string(), SessionData::new());

        let result = service
            .handle_callback(&session, "code", "forged", &RequestMeta::default())
            .await;

        assert!(matches!(result, Err(AuthError::InvalidState)));
    }

    // ============================================================================
    // Logout / Account Deletion
    // ============================================================================

    #[tokio::test]
    async fn test_logout_revokes_and_forgets_tokens() {
        let pool = test_pool().await;
        let provider = Arc::new(FakeProvider::for_email("alex@example.com"));
        let service = build_service(&pool, provider.clone(), &["alex@example.com"]);
        let session = Session::existing("sid".to_string(), SessionData::new());
        let meta = RequestMeta::default();

        let state = state_from_url(&service.initiate_login(&session, &meta).await);
        let user = service.handle_callback(&session, "code", &state, &meta).await.unwrap();

        service.logout(&session, &user.id, &meta).await.unwrap();

        assert_eq!(provider.revoked.lock().unwrap().as_slice(), ["1//refresh"]);
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM user_tokens")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
        assert_eq!(audit_count(&pool, "auth.logout").await, 1);
    }

    #[tokio::test]
    async fn test_delete_account_removes_owned_rows() {
        let pool = test_pool().await;
        let service = build_service(&pool, Arc::new(FakeProvider::for_email("a@x.com")), &[]);
        let user_id = insert_user(&pool, "U_DELETE01", "gone@example.com", "Gone").await;

        sqlx::query(
            "INSERT INTO tasks (id, user_id, title, priority, is_shared, completed, created_at, updated_at)
             VALUES ('T_1', ?, 'Water plants', 'low', 0, 0, datetime('now'), datetime('now'))",
        )
        .bind(&user_id)
        .execute(&pool)
        .await
        .unwrap();

        let session = Session::existing("sid".to_string(), SessionData::new());
        service
            .delete_account(&session, &user_id, &RequestMeta::default())
            .await
            .unwrap();

        assert!(service.find_user(&user_id).await.unwrap().is_none());
        let (tasks,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM tasks")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(tasks, 0);
        assert_eq!(audit_count(&pool, "auth.account_deleted").await, 1);
    }
}
