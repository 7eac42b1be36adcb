// src/common/migrations.rs
//! Database migration and schema management

use sqlx::SqlitePool;
use std::env;
use tracing::{info, warn};

use super::id_generator::generate_date_category_id;

/// Run all database migrations
///
/// Tables are created if they don't exist. Setting RESET_DB=true drops
/// everything first.
pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let should_reset_db = env::var("RESET_DB").unwrap_or_else(|_| "false".to_string()) == "true";

    if should_reset_db {
        warn!("⚠️  RESET_DB=true - Dropping all tables and recreating schema...");
        drop_all_tables(pool).await?;
        info!("✅ Dropped old tables");
    }

    create_schema(pool).await?;
    seed_date_categories(pool).await?;

    info!("✅ Database migration completed successfully!");

    Ok(())
}

/// Creates every table and index. Safe to call repeatedly.
pub async fn create_schema(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    create_core_tables(pool).await?;
    create_calendar_tables(pool).await?;
    create_schedule_tables(pool).await?;
    create_notification_tables(pool).await?;
    create_date_night_tables(pool).await?;
    create_shopping_tables(pool).await?;
    create_indexes(pool).await?;
    Ok(())
}

async fn drop_all_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let tables = [
        "schedule_request_slots",
        "schedule_requests",
        "completed_dates",
        "date_ideas",
        "date_categories",
        "shopping_items",
        "notifications",
        "push_subscriptions",
        "tasks",
        "calendar_events",
        "audit_logs",
        "sessions",
        "user_tokens",
        "users",
    ];

    for table in tables {
        sqlx::query(&format!("DROP TABLE IF EXISTS {}", table))
            .execute(pool)
            .await?;
    }

    Ok(())
}

async fn create_core_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS users (
            id TEXT PRIMARY KEY,
            google_user_id TEXT NOT NULL UNIQUE,
            email TEXT NOT NULL,
            name TEXT,
            picture TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL,
            last_login_at TEXT
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS user_tokens (
            user_id TEXT PRIMARY KEY REFERENCES users(id) ON DELETE CASCADE,
            encrypted_tokens TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS sessions (
            id TEXT PRIMARY KEY,
            data TEXT NOT NULL,
            expires_at INTEGER NOT NULL,
            updated_at INTEGER NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS audit_logs (
            id TEXT PRIMARY KEY,
            user_id TEXT,
            event_type TEXT NOT NULL,
            detail TEXT,
            ip_address TEXT,
            user_agent TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_calendar_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS calendar_events (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            location TEXT,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL,
            all_day INTEGER NOT NULL DEFAULT 0,
            color TEXT,
            reminder_sent INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS tasks (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            due_date TEXT,
            priority TEXT NOT NULL DEFAULT 'medium',
            is_shared INTEGER NOT NULL DEFAULT 0,
            completed INTEGER NOT NULL DEFAULT 0,
            completed_at TEXT,
            reminder_sent_on TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_schedule_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedule_requests (
            id TEXT PRIMARY KEY,
            sender_id TEXT NOT NULL,
            recipient_id TEXT NOT NULL,
            title TEXT NOT NULL,
            message TEXT,
            status TEXT NOT NULL DEFAULT 'pending',
            selected_slot_id TEXT,
            response_message TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS schedule_request_slots (
            id TEXT PRIMARY KEY,
            request_id TEXT NOT NULL REFERENCES schedule_requests(id) ON DELETE CASCADE,
            start_time TEXT NOT NULL,
            end_time TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_notification_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS push_subscriptions (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            endpoint TEXT NOT NULL UNIQUE,
            p256dh TEXT NOT NULL,
            auth TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS notifications (
            id TEXT PRIMARY KEY,
            user_id TEXT NOT NULL,
            title TEXT NOT NULL,
            body TEXT NOT NULL,
            url TEXT,
            read_at TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_date_night_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS date_categories (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL UNIQUE,
            icon TEXT,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS date_ideas (
            id TEXT PRIMARY KEY,
            category_id TEXT NOT NULL,
            title TEXT NOT NULL,
            description TEXT,
            cost_level INTEGER NOT NULL DEFAULT 1,
            created_by TEXT NOT NULL,
            times_completed INTEGER NOT NULL DEFAULT 0,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS completed_dates (
            id TEXT PRIMARY KEY,
            idea_id TEXT NOT NULL,
            category_id TEXT NOT NULL,
            completed_on TEXT NOT NULL,
            rating INTEGER NOT NULL,
            notes TEXT,
            points INTEGER NOT NULL,
            created_by TEXT NOT NULL,
            created_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_shopping_tables(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        CREATE TABLE IF NOT EXISTS shopping_items (
            id TEXT PRIMARY KEY,
            name TEXT NOT NULL,
            quantity TEXT,
            category TEXT,
            is_purchased INTEGER NOT NULL DEFAULT 0,
            added_by TEXT NOT NULL,
            purchased_by TEXT,
            created_at TEXT NOT NULL,
            updated_at TEXT NOT NULL
        )
        "#,
    )
    .execute(pool)
    .await?;

    Ok(())
}

async fn create_indexes(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let indexes = [
        "CREATE INDEX IF NOT EXISTS idx_sessions_expires ON sessions(expires_at)",
        "CREATE INDEX IF NOT EXISTS idx_audit_event_type ON audit_logs(event_type, created_at)",
        "CREATE INDEX IF NOT EXISTS idx_events_user_start ON calendar_events(user_id, start_time)",
        "CREATE INDEX IF NOT EXISTS idx_tasks_user ON tasks(user_id, completed)",
        "CREATE INDEX IF NOT EXISTS idx_tasks_shared ON tasks(is_shared, completed)",
        "CREATE INDEX IF NOT EXISTS idx_schedule_sender ON schedule_requests(sender_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_schedule_recipient ON schedule_requests(recipient_id, status)",
        "CREATE INDEX IF NOT EXISTS idx_slots_request ON schedule_request_slots(request_id)",
        "CREATE INDEX IF NOT EXISTS idx_push_user ON push_subscriptions(user_id)",
        "CREATE INDEX IF NOT EXISTS idx_notifications_user ON notifications(user_id, read_at)",
        "CREATE INDEX IF NOT EXISTS idx_ideas_category ON date_ideas(category_id)",
        "CREATE INDEX IF NOT EXISTS idx_completed_dates_on ON completed_dates(completed_on)",
    ];

    for statement in indexes {
        sqlx::query(statement).execute(pool).await?;
    }

    Ok(())
}

/// Default date night categories, inserted once when the table is empty
async fn seed_date_categories(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM date_categories")
        .fetch_one(pool)
        .await?;

    if count > 0 {
        return Ok(());
    }

    let defaults = [
        ("Dinner out", "🍽️"),
        ("At home", "🏠"),
        ("Adventure", "🧭"),
        ("Culture", "🎭"),
        ("Active", "🚴"),
    ];

    for (name, icon) in defaults {
        sqlx::query(
            "INSERT INTO date_categories (id, name, icon, created_at) VALUES (?, ?, ?, datetime('now'))",
        )
        .bind(generate_date_category_id())
        .bind(name)
        .bind(icon)
        .execute(pool)
        .await?;
    }

    info!(count = defaults.len(), "Seeded default date night categories");
    Ok(())
}

#[cfg(test)]
pub mod test_support {
    //! Shared helpers for database-backed tests

    use super::*;
    use sqlx::sqlite::SqlitePoolOptions;

    /// Fresh in-memory database with the full schema. A single connection
    /// keeps every query on the same in-memory database.
    pub async fn test_pool() -> SqlitePool {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect("sqlite::memory:")
            .await
            .expect("in-memory sqlite");
        create_schema(&pool).await.expect("schema");
        seed_date_categories(&pool).await.expect("seed");
        pool
    }

    /// Inserts a user row and returns its id
    pub async fn insert_user(pool: &SqlitePool, id: &str, email: &str, name: &str) -> String {
        sqlx::query(
            r#"
            INSERT INTO users (id, google_user_id, email, name, created_at, updated_at)
            VALUES (?, ?, ?, ?, datetime('now'), datetime('now'))
            "#,
        )
        .bind(id)
        .bind(format!("sub-{}", id))
        .bind(email)
        .bind(name)
        .execute(pool)
        .await
        .expect("insert user");
        id.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::test_support::test_pool;

    #[tokio::test]
    async fn test_schema_is_idempotent_and_seeds_categories() {
        let pool = test_pool().await;
        super::create_schema(&pool).await.unwrap();
        super::seed_date_categories(&pool).await.unwrap();

        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM date_categories")
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(count, 5);
    }
}
