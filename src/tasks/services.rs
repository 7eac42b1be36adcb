use sqlx::SqlitePool;
use tracing::info;

use super::models::{Task, TaskRequest, TaskScope, TaskStatus};
use crate::common::{generate_task_id, helpers::now_rfc3339, ApiError, Validator};

const TASK_COLUMNS: &str = "id, user_id, title, description, due_date, priority, is_shared, \
                            completed, completed_at, reminder_sent_on, created_at, updated_at";

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

pub struct TasksService {
    db: SqlitePool,
}

impl TasksService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ============================================================================
    // Queries
    // ============================================================================

    pub async fn list_tasks(
        &self,
        user_id: &str,
        scope: TaskScope,
        status: TaskStatus,
    ) -> Result<Vec<Task>, ApiError> {
        let scope_clause = match scope {
            TaskScope::All => "(user_id = ? OR is_shared = 1)",
            TaskScope::Mine => "(user_id = ?)",
            TaskScope::Shared => "(is_shared = 1 AND ? IS NOT NULL)",
        };
        let status_clause = match status {
            TaskStatus::Open => "AND completed = 0",
            TaskStatus::Done => "AND completed = 1",
            TaskStatus::All => "",
        };

        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE {scope_clause} {status_clause}
            ORDER BY completed ASC,
                     due_date IS NULL, due_date ASC,
                     CASE priority WHEN 'high' THEN 0 WHEN 'medium' THEN 1 ELSE 2 END,
                     created_at DESC
            "#
        ))
        .bind(user_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    /// Own tasks and shared tasks; anything else is reported as missing
    pub async fn get_visible_task(&self, user_id: &str, task_id: &str) -> Result<Task, ApiError> {
        sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = ? AND (user_id = ? OR is_shared = 1)"
        ))
        .bind(task_id)
        .bind(user_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))
    }

    async fn get_owned_task(&self, user_id: &str, task_id: &str) -> Result<Task, ApiError> {
        let task = self.get_visible_task(user_id, task_id).await?;
        if task.user_id != user_id {
            return Err(ApiError::Forbidden(
                "Only the owner can change this task".to_string(),
            ));
        }
        Ok(task)
    }

    // ============================================================================
    // Mutations
    // ============================================================================

    pub async fn create_task(&self, user_id: &str, request: &TaskRequest) -> Result<Task, ApiError> {
        request.validate(request).into_result()?;

        let id = generate_task_id();
        let now = now_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO tasks (
                id, user_id, title, description, due_date, priority, is_shared,
                completed, completed_at, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, 0, NULL, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(user_id)
        .bind(request.title.trim())
        .bind(clean(&request.description))
        .bind(clean(&request.due_date))
        .bind(request.priority.as_deref().unwrap_or("medium"))
        .bind(request.is_shared)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        info!(task_id = %id, user_id = %user_id, shared = request.is_shared, "Task created");
        self.get_visible_task(user_id, &id).await
    }

    /// Owner only. A new due date allows another reminder.
    pub async fn update_task(
        &self,
        user_id: &str,
        task_id: &str,
        request: &TaskRequest,
    ) -> Result<Task, ApiError> {
        let existing = self.get_owned_task(user_id, task_id).await?;
        request.validate(request).into_result()?;

        let due_date = clean(&request.due_date);
        let reminder_sent_on = if due_date == existing.due_date {
            existing.reminder_sent_on
        } else {
            None
        };

        sqlx::query(
            r#"
            UPDATE tasks
            SET title = ?, description = ?, due_date = ?, priority = ?, is_shared = ?,
                reminder_sent_on = ?, updated_at = ?
            WHERE id = ? AND user_id = ?
            "#,
        )
        .bind(request.title.trim())
        .bind(clean(&request.description))
        .bind(&due_date)
        .bind(request.priority.as_deref().unwrap_or(&existing.priority))
        .bind(request.is_shared)
        .bind(&reminder_sent_on)
        .bind(now_rfc3339())
        .bind(task_id)
        .bind(user_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        self.get_visible_task(user_id, task_id).await
    }

    pub async fn delete_task(&self, user_id: &str, task_id: &str) -> Result<(), ApiError> {
        self.get_owned_task(user_id, task_id).await?;

        sqlx::query("DELETE FROM tasks WHERE id = ? AND user_id = ?")
            .bind(task_id)
            .bind(user_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        info!(task_id = %task_id, user_id = %user_id, "Task deleted");
        Ok(())
    }

    /// Owner, or anyone for shared tasks. Sets or clears `completed_at`.
    pub async fn toggle_task(&self, user_id: &str, task_id: &str) -> Result<Task, ApiError> {
        let task = self.get_visible_task(user_id, task_id).await?;
        let now = now_rfc3339();
        let completed = !task.completed;
        let completed_at = completed.then(|| now.clone());

        sqlx::query("UPDATE tasks SET completed = ?, completed_at = ?, updated_at = ? WHERE id = ?")
            .bind(completed)
            .bind(&completed_at)
            .bind(&now)
            .bind(task_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        info!(task_id = %task_id, user_id = %user_id, completed = completed, "Task toggled");
        self.get_visible_task(user_id, task_id).await
    }

    // ============================================================================
    // Reminders
    // ============================================================================

    /// Open tasks due on `today` that have not been reminded today
    pub async fn due_for_reminder(&self, today: &str) -> Result<Vec<Task>, sqlx::Error> {
        sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE completed = 0
              AND due_date = ?
              AND (reminder_sent_on IS NULL OR reminder_sent_on <> ?)
            ORDER BY user_id, created_at
            "#
        ))
        .bind(today)
        .bind(today)
        .fetch_all(&self.db)
        .await
    }

    pub async fn mark_reminded(&self, task_ids: &[String], today: &str) -> Result<(), sqlx::Error> {
        let mut tx = self.db.begin().await?;
        for task_id in task_ids {
            sqlx::query("UPDATE tasks SET reminder_sent_on = ? WHERE id = ?")
                .bind(today)
                .bind(task_id)
                .execute(&mut *tx)
                .await?;
        }
        tx.commit().await
    }
}
