// src/session/models.rs

use serde::{Deserialize, Serialize};

use crate::common::helpers::random_hex;

/// Lifetime of the OAuth `state` and PKCE verifier
pub const OAUTH_VALUE_TTL_SECONDS: i64 = 600;

/// A value that stops being usable at `expires_at` (unix seconds)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Expiring {
    pub value: String,
    pub expires_at: i64,
}

impl Expiring {
    pub fn new(value: String, ttl_seconds: i64, now: i64) -> Self {
        Self {
            value,
            expires_at: now + ttl_seconds,
        }
    }

    pub fn is_valid_at(&self, now: i64) -> bool {
        now < self.expires_at
    }
}

/// Everything kept server-side for one browser session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionData {
    pub user_id: Option<String>,
    pub csrf_token: String,
    pub oauth_state: Option<Expiring>,
    pub pkce_verifier: Option<Expiring>,
    /// Rotate the session id on the next save
    #[serde(default)]
    pub regenerate: bool,
    pub locale: Option<String>,
    pub flash: Option<String>,
}

impl SessionData {
    pub fn new() -> Self {
        Self {
            user_id: None,
            csrf_token: random_hex(32),
            oauth_state: None,
            pkce_verifier: None,
            regenerate: false,
            locale: None,
            flash: None,
        }
    }
}

impl Default for SessionData {
    fn default() -> Self {
        Self::new()
    }
}
