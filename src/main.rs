// src/main.rs
use dotenv::dotenv;
use reqwest::Client;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use std::path::PathBuf;
use std::{env, net::SocketAddr, str::FromStr, sync::Arc};
use tokio::net::TcpListener;
use tracing::info;
use tracing_subscriber::EnvFilter;

// ============================================================================
// MODULE IMPORTS
// ============================================================================

mod auth;
mod calendar;
mod common;
mod csrf_middleware;
mod date_night;
mod logging_middleware;
mod notifications;
mod rate_limit_middleware;
mod reminders;
mod router;
mod schedule;
mod security_middleware;
mod services;
mod session;
mod shopping;
mod site;
mod tasks;

// ============================================================================
// COMMON IMPORTS
// ============================================================================

use auth::{GoogleEndpoints, GoogleOAuthClient};
use common::config::AppConfig;
use common::dev_mode::{apply_cli_override, print_dev_mode_status, DevModeConfig};
use common::{AppState, Integrations};
use notifications::{NotificationService, VapidConfig};
use services::email::SmtpConfig;
use services::rate_limit::RateLimitConfig;
use services::{EmailService, RateLimitService};

// ============================================================================
// MAIN APPLICATION ENTRY POINT
// ============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    // ========================================================================
    // ENVIRONMENT CONFIGURATION
    // ========================================================================

    let config = AppConfig::from_env()?;
    info!(config = ?config, "Configuration loaded");

    let dev_mode = apply_cli_override(DevModeConfig::from_env());
    print_dev_mode_status(&dev_mode);

    let send_reminders_mode = env::args().skip(1).any(|arg| arg == "send-reminders");

    // ========================================================================
    // DIRECTORY SETUP
    // ========================================================================

    tokio::fs::create_dir_all(&config.cache_dir).await?;

    // ========================================================================
    // DATABASE SETUP
    // ========================================================================

    if let Some(path_part) = config.database_url.strip_prefix("sqlite://") {
        let path_without_params = path_part.split('?').next().unwrap_or("");
        if !path_without_params.is_empty() && !path_without_params.starts_with(':') {
            let db_path = PathBuf::from(path_without_params);
            if let Some(parent) = db_path.parent() {
                if !parent.as_os_str().is_empty() {
                    tokio::fs::create_dir_all(parent).await?;
                }
            }
        }
    }

    let connect_options =
        SqliteConnectOptions::from_str(&config.database_url)?.create_if_missing(true);
    let pool = SqlitePoolOptions::new()
        .connect_with(connect_options)
        .await?;

    common::migrations::run_migrations(&pool).await?;

    // ========================================================================
    // SERVICE INITIALIZATION
    // ========================================================================

    let http_client = Client::builder().no_proxy().build()?;

    let identity_provider = Arc::new(GoogleOAuthClient::new(
        http_client.clone(),
        config.google.clone(),
        GoogleEndpoints::default(),
    ));

    let email = EmailService::new(SmtpConfig::from_env()?)?;
    info!(enabled = email.is_enabled(), "EmailService initialized");

    let notifications =
        NotificationService::new(pool.clone(), http_client.clone(), VapidConfig::from_env())?;

    let rate_limit = RateLimitService::new(RateLimitConfig::from_env(), &config.cache_dir);

    // ========================================================================
    // APPLICATION STATE
    // ========================================================================

    let port = config.port;
    let app_state = AppState::new(
        pool,
        config,
        dev_mode,
        Integrations {
            http: http_client,
            identity_provider,
            email,
            notifications,
            rate_limit,
        },
    )?;

    if send_reminders_mode {
        let report = reminders::send_reminders(&app_state).await?;
        info!(report = ?report, "send-reminders finished");
        return Ok(());
    }

    let app = router::build_router(app_state.shared());

    // ========================================================================
    // SERVER STARTUP
    // ========================================================================

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    info!("Listening on {}", addr);
    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;

    Ok(())
}
