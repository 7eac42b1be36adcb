//! `send-reminders` mode: run from cron, sends due event and task reminders
//! with the same services the web server uses, clears out expired sessions,
//! then exits.

use chrono::{DateTime, Duration, SecondsFormat, Utc};
use std::collections::BTreeMap;
use tracing::{info, warn};

use crate::calendar::{CalendarEvent, CalendarService};
use crate::common::{helpers::display_time, safe_email_log, AppState};
use crate::services::email::event_reminder_email;
use crate::tasks::{Task, TasksService};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ReminderReport {
    pub events_reminded: usize,
    pub emails_sent: usize,
    pub task_users_notified: usize,
    pub tasks_reminded: usize,
    pub sessions_purged: u64,
}

pub async fn send_reminders(state: &AppState) -> Result<ReminderReport, sqlx::Error> {
    send_reminders_at(state, Utc::now()).await
}

pub async fn send_reminders_at(
    state: &AppState,
    now: DateTime<Utc>,
) -> Result<ReminderReport, sqlx::Error> {
    let mut report = ReminderReport::default();

    let from = now.to_rfc3339_opts(SecondsFormat::Secs, true);
    let until = (now + Duration::minutes(state.config.reminder_window_minutes))
        .to_rfc3339_opts(SecondsFormat::Secs, true);

    let calendar = CalendarService::new(state.db.clone());
    for event in calendar.due_for_reminder(&from, &until).await? {
        if remind_event(state, &event).await {
            report.emails_sent += 1;
        }
        calendar.mark_reminder_sent(&event.id).await?;
        report.events_reminded += 1;
    }

    let today = now.format("%Y-%m-%d").to_string();
    let tasks = TasksService::new(state.db.clone());

    let mut by_user: BTreeMap<String, Vec<Task>> = BTreeMap::new();
    for task in tasks.due_for_reminder(&today).await? {
        by_user.entry(task.user_id.clone()).or_default().push(task);
    }

    for (user_id, due) in by_user {
        let body = match due.as_slice() {
            [only] => format!("Due today: {}", only.title),
            many => format!("{} tasks due today", many.len()),
        };
        if let Err(e) = state
            .notifications
            .notify(&user_id, "Tasks due today", &body, Some("/dashboard#tasks"))
            .await
        {
            warn!(user_id = %user_id, error = %e, "Task reminder push failed");
        }

        let ids: Vec<String> = due.iter().map(|t| t.id.clone()).collect();
        tasks.mark_reminded(&ids, &today).await?;
        report.task_users_notified += 1;
        report.tasks_reminded += ids.len();
    }

    match state.sessions.purge_expired(now.timestamp()).await {
        Ok(purged) => report.sessions_purged = purged,
        Err(e) => warn!(error = %e, "Expired session cleanup failed"),
    }

    info!(
        events = report.events_reminded,
        emails = report.emails_sent,
        task_users = report.task_users_notified,
        tasks = report.tasks_reminded,
        sessions_purged = report.sessions_purged,
        "Reminders sent"
    );
    Ok(report)
}

/// Push and email the owner; returns whether the email went out
async fn remind_event(state: &AppState, event: &CalendarEvent) -> bool {
    let starts_at = display_time(&event.start_time);

    if let Err(e) = state
        .notifications
        .notify(
            &event.user_id,
            &format!("Starting soon: {}", event.title),
            &starts_at,
            Some("/dashboard"),
        )
        .await
    {
        warn!(event_id = %event.id, error = %e, "Event reminder push failed");
    }

    let owner = match state.auth_service.find_user(&event.user_id).await {
        Ok(Some(owner)) => owner,
        Ok(None) => return false,
        Err(e) => {
            warn!(event_id = %event.id, error = %e, "Could not load event owner");
            return false;
        }
    };

    let email = event_reminder_email(
        &event.title,
        &starts_at,
        event.location.as_deref(),
        &state.config.app_url,
    );
    match state.email_service.send(&owner.email, &email).await {
        Ok(sent) => sent,
        Err(e) => {
            warn!(to = %safe_email_log(&owner.email), error = %e, "Event reminder email failed");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::calendar::{insert_event, NewEvent};
    use crate::common::migrations::test_support::{insert_user, test_pool};
    use crate::common::state::test_support::test_state;
    use crate::tasks::models::TaskRequest;
    use crate::services::rate_limit::RateLimitConfig;
    use crate::session::SessionData;
    use chrono::TimeZone;

    fn event_at(title: &str, start: &str, end: &str) -> NewEvent {
        NewEvent {
            title: title.to_string(),
            description: None,
            location: Some("Kitchen".to_string()),
            start_time: start.to_string(),
            end_time: end.to_string(),
            all_day: false,
            color: None,
        }
    }

    fn due_task(title: &str, due: &str) -> TaskRequest {
        TaskRequest {
            title: title.to_string(),
            description: None,
            due_date: Some(due.to_string()),
            priority: None,
            is_shared: false,
        }
    }

    async fn notification_count(state: &AppState, user_id: &str) -> i64 {
        let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM notifications WHERE user_id = ?")
            .bind(user_id)
            .fetch_one(&state.db)
            .await
            .unwrap();
        count
    }

    #[tokio::test]
    async fn test_reminders_cover_window_and_run_once() {
        let pool = test_pool().await;
        let alex = insert_user(&pool, "U_REMIND01", "alex@example.com", "Alex").await;
        let cache = tempfile::tempdir().unwrap();
        let state = test_state(pool.clone(), "alex@example.com", &[], cache.path(), RateLimitConfig::default());

        {
            let mut conn = pool.acquire().await.unwrap();
            insert_event(&mut *conn, &alex, &event_at("Soon", "2024-06-01T18:20:00Z", "2024-06-01T19:00:00Z"))
                .await
                .unwrap();
            insert_event(&mut *conn, &alex, &event_at("Later", "2024-06-01T21:00:00Z", "2024-06-01T22:00:00Z"))
                .await
                .unwrap();
        }

        let tasks = TasksService::new(pool.clone());
        tasks.create_task(&alex, &due_task("Pay rent", "2024-06-01")).await.unwrap();
        tasks.create_task(&alex, &due_task("Call plumber", "2024-06-01")).await.unwrap();
        tasks.create_task(&alex, &due_task("Next week", "2024-06-08")).await.unwrap();

        let now = Utc.with_ymd_and_hms(2024, 6, 1, 18, 0, 0).unwrap();

        // One session that ran out yesterday, one started just now
        let lifetime = state.config.session_lifetime_seconds;
        state
            .sessions
            .save("stale-session", &SessionData::new(), now.timestamp() - 24 * 3600 - lifetime)
            .await
            .unwrap();
        state
            .sessions
            .save("live-session", &SessionData::new(), now.timestamp())
            .await
            .unwrap();

        let report = send_reminders_at(&state, now).await.unwrap();

        assert_eq!(
            report,
            ReminderReport {
                events_reminded: 1,
                emails_sent: 0,
                task_users_notified: 1,
                tasks_reminded: 2,
                sessions_purged: 1,
            }
        );
        let (sessions,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM sessions")
            .fetch_one(&state.db)
            .await
            .unwrap();
        assert_eq!(sessions, 1);
        // One event push plus one combined task push
        assert_eq!(notification_count(&state, &alex).await, 2);

        let again = send_reminders_at(&state, now).await.unwrap();
        assert_eq!(again, ReminderReport::default());
        assert_eq!(notification_count(&state, &alex).await, 2);
    }
}
