// src/services/rate_limit.rs
use chrono::Utc;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::env;
use std::net::IpAddr;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{info, warn};

/// Paths the rate limiter guards; everything else passes straight through
pub const RATE_LIMITED_PATHS: &[&str] = &[
    "/auth/login",
    "/auth/callback",
    "/csp-report",
    "/schedule/send",
];

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub enabled: bool,
    pub max_requests: u32,
    pub window_seconds: i64,
    pub whitelist_ips: Vec<String>,
    /// Peers whose X-Forwarded-For / X-Real-IP headers are believed
    pub trusted_proxies: Vec<IpAddr>,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 100,   // 100 requests per window per IP and path
            window_seconds: 900, // 15 minute window
            whitelist_ips: Vec::new(),
            trusted_proxies: Vec::new(),
        }
    }
}

impl RateLimitConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        // RATE_LIMIT_ENABLED - set to "false" to disable rate limiting
        if let Ok(enabled) = env::var("RATE_LIMIT_ENABLED") {
            config.enabled = enabled.to_lowercase() != "false";
        }

        // RATE_LIMIT_MAX_REQUESTS - requests per window per IP and path
        if let Ok(limit) = env::var("RATE_LIMIT_MAX_REQUESTS") {
            if let Ok(val) = limit.parse::<u32>() {
                config.max_requests = val;
            }
        }

        // RATE_LIMIT_WINDOW_SECONDS - time window in seconds
        if let Ok(window) = env::var("RATE_LIMIT_WINDOW_SECONDS") {
            if let Ok(val) = window.parse::<i64>() {
                config.window_seconds = val;
            }
        }

        // RATE_LIMIT_WHITELIST_IPS - comma-separated list of whitelisted IPs
        if let Ok(whitelist) = env::var("RATE_LIMIT_WHITELIST_IPS") {
            config.whitelist_ips = whitelist
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect();
        }

        // TRUSTED_PROXIES - comma-separated proxy addresses allowed to set client IP headers
        if let Ok(proxies) = env::var("TRUSTED_PROXIES") {
            config.trusted_proxies = parse_ip_list(&proxies);
        }

        config
    }
}

/// Parses a comma-separated address list, skipping entries that aren't IPs
pub fn parse_ip_list(value: &str) -> Vec<IpAddr> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| match s.parse::<IpAddr>() {
            Ok(ip) => Some(ip),
            Err(_) => {
                warn!(entry = %s, "Ignoring invalid TRUSTED_PROXIES entry");
                None
            }
        })
        .collect()
}

/// Persisted counter for one (path, IP) pair
#[derive(Debug, Clone, Serialize, Deserialize)]
struct RateLimitState {
    count: u32,
    window_start: i64,
}

impl RateLimitState {
    fn new(now: i64) -> Self {
        Self {
            count: 1,
            window_start: now,
        }
    }

    fn is_expired(&self, window_seconds: i64, now: i64) -> bool {
        now - self.window_start >= window_seconds
    }
}

#[derive(Debug, PartialEq)]
pub enum RateLimitResult {
    Allowed,
    Limited { retry_after: u64 },
}

#[derive(Debug, Error)]
pub enum RateLimitError {
    #[error("Rate limit storage error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Rate limit serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Fixed-window limiter backed by one JSON file per (path, IP) pair.
///
/// Read-modify-write on the counter file is not locked, so concurrent
/// requests can undercount.
#[derive(Debug, Clone)]
pub struct RateLimitService {
    config: RateLimitConfig,
    storage_dir: PathBuf,
}

impl RateLimitService {
    pub fn new(config: RateLimitConfig, cache_dir: &Path) -> Self {
        info!(
            enabled = config.enabled,
            max_requests = config.max_requests,
            window_seconds = config.window_seconds,
            whitelist_ips = ?config.whitelist_ips,
            trusted_proxies = ?config.trusted_proxies,
            "Initializing RateLimitService"
        );
        Self {
            config,
            storage_dir: cache_dir.join("ratelimit"),
        }
    }

    pub fn config(&self) -> &RateLimitConfig {
        &self.config
    }

    /// Whether `path` is one of the guarded endpoints
    pub fn applies_to(path: &str) -> bool {
        RATE_LIMITED_PATHS.contains(&path)
    }

    fn state_file(&self, path: &str, ip: &str) -> PathBuf {
        let mut hasher = Sha256::new();
        hasher.update(path.as_bytes());
        hasher.update(ip.as_bytes());
        self.storage_dir
            .join(format!("{}.json", hex::encode(hasher.finalize())))
    }

    /// Check and count a request from `ip` to `path`
    pub async fn check_rate_limit(
        &self,
        path: &str,
        ip: &str,
    ) -> Result<RateLimitResult, RateLimitError> {
        self.check_rate_limit_at(path, ip, Utc::now().timestamp()).await
    }

    pub async fn check_rate_limit_at(
        &self,
        path: &str,
        ip: &str,
        now: i64,
    ) -> Result<RateLimitResult, RateLimitError> {
        if !self.config.enabled || self.config.whitelist_ips.iter().any(|w| w == ip) {
            return Ok(RateLimitResult::Allowed);
        }

        let file = self.state_file(path, ip);

        let existing = match tokio::fs::read(&file).await {
            Ok(bytes) => match serde_json::from_slice::<RateLimitState>(&bytes) {
                Ok(state) => Some(state),
                Err(e) => {
                    warn!(error = %e, "Discarding unreadable rate limit state");
                    None
                }
            },
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => return Err(e.into()),
        };

        let (state, result) = match existing {
            None => (RateLimitState::new(now), RateLimitResult::Allowed),
            Some(state) if state.is_expired(self.config.window_seconds, now) => {
                (RateLimitState::new(now), RateLimitResult::Allowed)
            }
            Some(state) if state.count >= self.config.max_requests => {
                let elapsed = now - state.window_start;
                let retry_after = (self.config.window_seconds - elapsed).max(1) as u64;
                return Ok(RateLimitResult::Limited { retry_after });
            }
            Some(mut state) => {
                state.count += 1;
                (state, RateLimitResult::Allowed)
            }
        };

        tokio::fs::create_dir_all(&self.storage_dir).await?;
        tokio::fs::write(&file, serde_json::to_vec(&state)?).await?;

        Ok(result)
    }
}
