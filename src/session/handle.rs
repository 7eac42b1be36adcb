// src/session/handle.rs
//! Per-request session handle
//!
//! `session_middleware` inserts a `Session` into the request extensions;
//! handlers and middleware mutate it and the middleware persists the result
//! once the response is ready.

use async_trait::async_trait;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::sync::Arc;
use tokio::sync::Mutex;

use super::models::{Expiring, SessionData, OAUTH_VALUE_TTL_SECONDS};
use crate::common::{helpers::random_hex, ApiError};

#[derive(Debug)]
struct SessionInner {
    id: String,
    data: SessionData,
    is_new: bool,
    dirty: bool,
    destroyed: bool,
}

/// What the middleware has to do with the session after the handler ran
#[derive(Debug)]
pub enum SessionOutcome {
    Unchanged,
    Persist {
        id: String,
        data: SessionData,
        /// Row to delete after an id rotation
        replaced_id: Option<String>,
    },
    Destroy {
        id: Option<String>,
    },
}

#[derive(Debug, Clone)]
pub struct Session {
    inner: Arc<Mutex<SessionInner>>,
}

pub fn new_session_id() -> String {
    random_hex(32)
}

impl Session {
    /// A session that has not been stored yet. It is only persisted once
    /// something is written to it or its CSRF token is handed out.
    pub fn fresh() -> Self {
        Self::build(new_session_id(), SessionData::new(), true)
    }

    pub fn existing(id: String, data: SessionData) -> Self {
        Self::build(id, data, false)
    }

    fn build(id: String, data: SessionData, is_new: bool) -> Self {
        Self {
            inner: Arc::new(Mutex::new(SessionInner {
                id,
                data,
                is_new,
                dirty: false,
                destroyed: false,
            })),
        }
    }

    pub async fn id(&self) -> String {
        self.inner.lock().await.id.clone()
    }

    pub async fn user_id(&self) -> Option<String> {
        self.inner.lock().await.data.user_id.clone()
    }

    pub async fn is_authenticated(&self) -> bool {
        self.inner.lock().await.data.user_id.is_some()
    }

    pub async fn csrf_token(&self) -> String {
        let mut inner = self.inner.lock().await;
        if inner.is_new {
            inner.dirty = true;
        }
        inner.data.csrf_token.clone()
    }

    /// Marks the session as logged in, issues a new CSRF token and schedules
    /// an id rotation
    pub async fn login(&self, user_id: &str) {
        let mut inner = self.inner.lock().await;
        inner.data.user_id = Some(user_id.to_string());
        inner.data.csrf_token = random_hex(32);
        inner.data.regenerate = true;
        inner.dirty = true;
    }

    /// Stores a fresh OAuth state and PKCE verifier, each valid for ten minutes
    pub async fn begin_oauth(&self, state: String, verifier: String, now: i64) {
        let mut inner = self.inner.lock().await;
        inner.data.oauth_state = Some(Expiring::new(state, OAUTH_VALUE_TTL_SECONDS, now));
        inner.data.pkce_verifier = Some(Expiring::new(verifier, OAUTH_VALUE_TTL_SECONDS, now));
        inner.dirty = true;
    }

    /// Removes and returns the stored OAuth state
    pub async fn take_oauth_state(&self) -> Option<Expiring> {
        let mut inner = self.inner.lock().await;
        let taken = inner.data.oauth_state.take();
        if taken.is_some() {
            inner.dirty = true;
        }
        taken
    }

    /// Removes and returns the stored PKCE verifier
    pub async fn take_pkce_verifier(&self) -> Option<Expiring> {
        let mut inner = self.inner.lock().await;
        let taken = inner.data.pkce_verifier.take();
        if taken.is_some() {
            inner.dirty = true;
        }
        taken
    }

    pub async fn set_flash(&self, message: impl Into<String>) {
        let mut inner = self.inner.lock().await;
        inner.data.flash = Some(message.into());
        inner.dirty = true;
    }

    pub async fn take_flash(&self) -> Option<String> {
        let mut inner = self.inner.lock().await;
        let taken = inner.data.flash.take();
        if taken.is_some() {
            inner.dirty = true;
        }
        taken
    }

    pub async fn locale(&self) -> Option<String> {
        self.inner.lock().await.data.locale.clone()
    }

    pub async fn set_locale(&self, locale: &str) {
        let mut inner = self.inner.lock().await;
        inner.data.locale = Some(locale.to_string());
        inner.dirty = true;
    }

    /// Drops all session state; the cookie is cleared on the way out
    pub async fn destroy(&self) {
        let mut inner = self.inner.lock().await;
        inner.data = SessionData::new();
        inner.destroyed = true;
    }

    pub async fn snapshot(&self) -> SessionData {
        self.inner.lock().await.data.clone()
    }

    /// Settles the session at the end of a request. Consumes the
    /// `regenerate` flag by moving the data to a new id.
    pub async fn finish(&self) -> SessionOutcome {
        let mut inner = self.inner.lock().await;

        if inner.destroyed {
            let id = (!inner.is_new).then(|| inner.id.clone());
            return SessionOutcome::Destroy { id };
        }

        if inner.data.regenerate {
            inner.data.regenerate = false;
            let replaced_id = (!inner.is_new).then(|| inner.id.clone());
            inner.id = new_session_id();
            inner.is_new = false;
            inner.dirty = false;
            return SessionOutcome::Persist {
                id: inner.id.clone(),
                data: inner.data.clone(),
                replaced_id,
            };
        }

        if inner.dirty {
            inner.dirty = false;
            inner.is_new = false;
            return SessionOutcome::Persist {
                id: inner.id.clone(),
                data: inner.data.clone(),
                replaced_id: None,
            };
        }

        SessionOutcome::Unchanged
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for Session
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Session>()
            .cloned()
            .ok_or_else(|| ApiError::InternalServer("session layer missing".to_string()))
    }
}
