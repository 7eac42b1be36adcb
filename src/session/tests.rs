//! Tests for the session module

#[cfg(test)]
mod tests {
    use super::super::*;
    use crate::common::migrations::test_support::test_pool;

    // ============================================================================
    // Handle Tests
    // ============================================================================

    #[tokio::test]
    async fn test_fresh_session_untouched_is_not_persisted() {
        let session = Session::fresh();
        assert!(matches!(session.finish().await, SessionOutcome::Unchanged));
    }

    #[tokio::test]
    async fn test_handing_out_csrf_token_persists_fresh_session() {
        let session = Session::fresh();
        let token = session.csrf_token().await;
        assert_eq!(token.len(), 64);

        match session.finish().await {
            SessionOutcome::Persist { data, replaced_id, .. } => {
                assert_eq!(data.csrf_token, token);
                assert!(replaced_id.is_none());
            }
            other => panic!("expected Persist, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_login_rotates_session_id_once() {
        let session = Session::existing("old-id".to_string(), SessionData::new());
        let anonymous_token = session.csrf_token().await;
        session.login("U_ABCDEF12").await;

        let new_id = match session.finish().await {
            SessionOutcome::Persist {
                id,
                data,
                replaced_id,
            } => {
                assert_ne!(id, "old-id");
                assert_eq!(replaced_id.as_deref(), Some("old-id"));
                assert_eq!(data.user_id.as_deref(), Some("U_ABCDEF12"));
                assert!(!data.regenerate);
                assert_ne!(data.csrf_token, anonymous_token);
                assert_eq!(data.csrf_token.len(), 64);
                id
            }
            other => panic!("expected Persist, got {:?}", other),
        };

        assert_eq!(session.id().await, new_id);
        assert_ne!(session.csrf_token().await, anonymous_token);
        assert!(matches!(session.finish().await, SessionOutcome::Unchanged));
    }

    #[tokio::test]
    async fn test_oauth_values_are_single_use() {
        let session = Session::fresh();
        session
            .begin_oauth("state".into(), "verifier".into(), 1_000)
            .await;

        let state = session.take_oauth_state().await.unwrap();
        assert_eq!(state.value, "state");
        assert_eq!(state.expires_at, 1_000 + OAUTH_VALUE_TTL_SECONDS);
        assert!(state.is_valid_at(1_599));
        assert!(!state.is_valid_at(1_600));
        assert!(session.take_oauth_state().await.is_none());

        assert!(session.take_pkce_verifier().await.is_some());
        assert!(session.take_pkce_verifier().await.is_none());
    }

    #[tokio::test]
    async fn test_destroy_clears_data() {
        let session = Session::existing("sid".to_string(), SessionData::new());
        session.login("U_ABCDEF12").await;
        session.destroy().await;

        assert!(!session.is_authenticated().await);
        match session.finish().await {
            SessionOutcome::Destroy { id } => assert_eq!(id.as_deref(), Some("sid")),
            other => panic!("expected Destroy, got {:?}", other),
        }
    }

    // ============================================================================
    // Store Tests
    // ============================================================================

    #[tokio::test]
    async fn test_store_round_trip_and_expiry() {
        let store = SessionStore::new(test_pool().await, 100);
        let mut data = SessionData::new();
        data.user_id = Some("U_STORE001".into());

        store.save("sid-1", &data, 1_000).await.unwrap();

        let loaded = store.load("sid-1", 1_050).await.unwrap().unwrap();
        assert_eq!(loaded.user_id.as_deref(), Some("U_STORE001"));
        assert_eq!(loaded.csrf_token, data.csrf_token);

        // Updating keeps the original absolute expiry
        store.save("sid-1", &loaded, 1_090).await.unwrap();
        assert!(store.load("sid-1", 1_100).await.unwrap().is_none());
        assert!(store.load("sid-1", 1_000).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_delete_for_user() {
        let store = SessionStore::new(test_pool().await, 100);
        let mut data = SessionData::new();
        data.user_id = Some("U_GONE0001".into());
        store.save("a", &data, 0).await.unwrap();
        store.save("b", &data, 0).await.unwrap();
        store.save("c", &SessionData::new(), 0).await.unwrap();

        assert_eq!(store.delete_for_user("U_GONE0001").await.unwrap(), 2);
        assert!(store.load("c", 1).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_expired_keeps_live_sessions() {
        let store = SessionStore::new(test_pool().await, 100);
        store.save("stale-1", &SessionData::new(), 0).await.unwrap();
        store.save("stale-2", &SessionData::new(), 50).await.unwrap();
        store.save("live", &SessionData::new(), 200).await.unwrap();

        assert_eq!(store.purge_expired(250).await.unwrap(), 2);
        assert!(store.load("live", 250).await.unwrap().is_some());
        assert_eq!(store.purge_expired(250).await.unwrap(), 0);
    }
}
