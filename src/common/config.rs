// src/common/config.rs
//! Application configuration loaded from environment variables
//!
//! SMTP, VAPID and rate limit settings are read by their own services
//! (`SmtpConfig::from_env`, `VapidConfig::from_env`, `RateLimitConfig::from_env`).

use std::env;
use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} is required")]
    Missing(&'static str),

    #[error("{0} is invalid: {1}")]
    Invalid(&'static str, String),
}

#[derive(Clone)]
pub struct GoogleConfig {
    pub client_id: String,
    pub client_secret: String,
    pub redirect_uri: String,
}

impl fmt::Debug for GoogleConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GoogleConfig")
            .field("client_id", &self.client_id)
            .field("client_secret", &"<redacted>")
            .field("redirect_uri", &self.redirect_uri)
            .finish()
    }
}

#[derive(Clone)]
pub struct AppConfig {
    pub database_url: String,
    pub port: u16,
    pub app_url: String,
    pub app_secret_curr: String,
    pub app_secret_prev: Option<String>,
    pub google: GoogleConfig,
    pub email_allowlist: Vec<String>,
    pub session_lifetime_seconds: i64,
    pub cache_dir: PathBuf,
    pub reminder_window_minutes: i64,
}

impl fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AppConfig")
            .field("database_url", &self.database_url)
            .field("port", &self.port)
            .field("app_url", &self.app_url)
            .field("app_secret_curr", &"<redacted>")
            .field("app_secret_prev", &self.app_secret_prev.as_ref().map(|_| "<redacted>"))
            .field("google", &self.google)
            .field("email_allowlist", &self.email_allowlist.len())
            .field("session_lifetime_seconds", &self.session_lifetime_seconds)
            .field("cache_dir", &self.cache_dir)
            .field("reminder_window_minutes", &self.reminder_window_minutes)
            .finish()
    }
}

fn optional(key: &str) -> Option<String> {
    env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_or<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match optional(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| ConfigError::Invalid(key, raw)),
        None => Ok(default),
    }
}

/// Splits a comma-separated allowlist into trimmed, lowercased entries
pub fn parse_allowlist(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let port = parse_or("PORT", 8080u16)?;
        let app_url = optional("APP_URL").unwrap_or_else(|| format!("http://localhost:{}", port));
        let app_url = app_url.trim_end_matches('/').to_string();

        let google = GoogleConfig {
            client_id: optional("GOOGLE_CLIENT_ID").ok_or(ConfigError::Missing("GOOGLE_CLIENT_ID"))?,
            client_secret: optional("GOOGLE_CLIENT_SECRET")
                .ok_or(ConfigError::Missing("GOOGLE_CLIENT_SECRET"))?,
            redirect_uri: optional("GOOGLE_REDIRECT_URI")
                .unwrap_or_else(|| format!("{}/auth/callback", app_url)),
        };

        Ok(Self {
            database_url: optional("DATABASE_URL")
                .unwrap_or_else(|| "sqlite://calendar.db".to_string()),
            port,
            app_url,
            app_secret_curr: optional("APP_SECRET_CURR")
                .ok_or(ConfigError::Missing("APP_SECRET_CURR"))?,
            app_secret_prev: optional("APP_SECRET_PREV"),
            google,
            email_allowlist: parse_allowlist(&env::var("EMAIL_ALLOWLIST").unwrap_or_default()),
            session_lifetime_seconds: parse_or("SESSION_LIFETIME_SECONDS", 7 * 24 * 3600i64)?,
            cache_dir: PathBuf::from(optional("CACHE_DIR").unwrap_or_else(|| "./cache".to_string())),
            reminder_window_minutes: parse_or("REMINDER_WINDOW_MINUTES", 30i64)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_allowlist_trims_and_lowercases() {
        let list = parse_allowlist("  Foo@Bar.com , ,second@example.org,");
        assert_eq!(list, vec!["foo@bar.com", "second@example.org"]);
    }

    #[test]
    fn test_parse_allowlist_empty() {
        assert!(parse_allowlist("").is_empty());
        assert!(parse_allowlist(" , ").is_empty());
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let config = AppConfig {
            database_url: "sqlite::memory:".into(),
            port: 8080,
            app_url: "http://localhost:8080".into(),
            app_secret_curr: "deadbeef".repeat(8),
            app_secret_prev: None,
            google: GoogleConfig {
                client_id: "client".into(),
                client_secret: "very-secret".into(),
                redirect_uri: "http://localhost:8080/auth/callback".into(),
            },
            email_allowlist: vec!["a@b.com".into()],
            session_lifetime_seconds: 60,
            cache_dir: PathBuf::from("./cache"),
            reminder_window_minutes: 30,
        };
        let debug = format!("{:?}", config);
        assert!(!debug.contains("deadbeef"));
        assert!(!debug.contains("very-secret"));
        assert!(!debug.contains("a@b.com"));
    }
}
