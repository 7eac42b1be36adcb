// src/common/dev_mode.rs
//! Development mode configuration
//!
//! Production mode (the default) issues `__Host-` prefixed, `Secure` session
//! cookies and sends HSTS. Development mode drops both so the app can be served
//! over plain http://localhost.

use std::env;

/// Session cookie name used in production. The `__Host-` prefix requires
/// `Secure`, `Path=/` and no `Domain` attribute.
pub const PRODUCTION_SESSION_COOKIE: &str = "__Host-calsession";
pub const DEVELOPMENT_SESSION_COOKIE: &str = "calsession";

#[derive(Debug, Clone)]
pub struct DevModeConfig {
    pub enabled: bool,
}

impl DevModeConfig {
    pub fn from_env() -> Self {
        let app_env = env::var("APP_ENV").unwrap_or_else(|_| "production".to_string());
        Self::from_app_env(&app_env)
    }

    pub fn from_app_env(app_env: &str) -> Self {
        let app_env = app_env.trim().to_lowercase();
        Self {
            enabled: matches!(app_env.as_str(), "development" | "dev" | "local"),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn session_cookie_name(&self) -> &'static str {
        if self.enabled {
            DEVELOPMENT_SESSION_COOKIE
        } else {
            PRODUCTION_SESSION_COOKIE
        }
    }

    pub fn secure_cookies(&self) -> bool {
        !self.enabled
    }

    pub fn send_hsts(&self) -> bool {
        !self.enabled
    }
}

/// Print dev mode status on startup
pub fn print_dev_mode_status(config: &DevModeConfig) {
    if config.enabled {
        println!("⚠️  DEV MODE ENABLED");
        println!("   Session cookie: {} (not Secure)", config.session_cookie_name());
        println!("   HSTS disabled");
        println!("   ⚠️  DO NOT USE IN PRODUCTION ⚠️");
        println!();
    } else {
        println!("🔒 Production mode - {} cookie, HSTS on", config.session_cookie_name());
    }
}

/// CLI argument parsing for dev mode
pub fn parse_dev_mode_args() -> Option<bool> {
    parse_dev_mode_flag(env::args())
}

fn parse_dev_mode_flag<I: IntoIterator<Item = String>>(args: I) -> Option<bool> {
    for arg in args {
        match arg.as_str() {
            "--dev" | "--dev-mode" => return Some(true),
            "--no-dev" | "--prod" | "--production" => return Some(false),
            _ => {}
        }
    }

    None
}

/// Override dev mode from CLI args
pub fn apply_cli_override(mut config: DevModeConfig) -> DevModeConfig {
    if let Some(cli_dev_mode) = parse_dev_mode_args() {
        println!("🔧 CLI override: dev mode = {}", cli_dev_mode);
        config.enabled = cli_dev_mode;
    }

    config
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_production_is_default() {
        let config = DevModeConfig::from_app_env("production");
        assert!(!config.is_enabled());
        assert_eq!(config.session_cookie_name(), "__Host-calsession");
        assert!(config.secure_cookies());
        assert!(config.send_hsts());

        let config = DevModeConfig::from_app_env("something-else");
        assert!(!config.is_enabled());
    }

    #[test]
    fn test_development_relaxes_cookie() {
        let config = DevModeConfig::from_app_env(" Development ");
        assert!(config.is_enabled());
        assert_eq!(config.session_cookie_name(), "calsession");
        assert!(!config.secure_cookies());
    }

    #[test]
    fn test_cli_flags() {
        let args = |v: &[&str]| v.iter().map(|s| s.to_string()).collect::<Vec<_>>();
        assert_eq!(parse_dev_mode_flag(args(&["homebase", "--dev"])), Some(true));
        assert_eq!(parse_dev_mode_flag(args(&["homebase", "--prod"])), Some(false));
        assert_eq!(parse_dev_mode_flag(args(&["homebase"])), None);
    }
}
