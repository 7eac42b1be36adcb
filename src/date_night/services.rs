use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;

use super::models::{
    CategoryRequest, CompleteRequest, CompletedDate, CompletionResponse, DateCategory, DateIdea,
    DateStats, IdeaRequest, MIN_COST_LEVEL,
};
use super::scoring::{completion_points, level_for, monthly_streak, points_to_next_level};
use crate::common::{
    generate_completed_date_id, generate_date_category_id, generate_date_idea_id,
    helpers::now_rfc3339, ApiError, Validator,
};

const IDEA_SELECT: &str = r#"
    SELECT i.id, i.category_id, i.title, i.description, i.cost_level, i.created_by,
           i.times_completed, i.created_at, i.updated_at, c.name AS category_name
    FROM date_ideas i
    LEFT JOIN date_categories c ON c.id = i.category_id
"#;

const HISTORY_SELECT: &str = r#"
    SELECT d.id, d.idea_id, d.category_id, d.completed_on, d.rating, d.notes, d.points,
           d.created_by, d.created_at, i.title AS idea_title, c.name AS category_name
    FROM completed_dates d
    LEFT JOIN date_ideas i ON i.id = d.idea_id
    LEFT JOIN date_categories c ON c.id = d.category_id
"#;

fn clean(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Date night data is shared by the whole household, so nothing here is
/// scoped to the calling user beyond recording who created a row.
pub struct DateNightService {
    db: SqlitePool,
}

impl DateNightService {
    pub fn new(db: SqlitePool) -> Self {
        Self { db }
    }

    // ============================================================================
    // Categories
    // ============================================================================

    pub async fn list_categories(&self) -> Result<Vec<DateCategory>, ApiError> {
        sqlx::query_as::<_, DateCategory>(
            "SELECT id, name, icon, created_at FROM date_categories ORDER BY name",
        )
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn create_category(&self, request: &CategoryRequest) -> Result<DateCategory, ApiError> {
        request.validate(request).into_result()?;
        let name = request.name.trim();

        let (taken,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM date_categories WHERE LOWER(name) = LOWER(?)")
                .bind(name)
                .fetch_one(&self.db)
                .await
                .map_err(ApiError::DatabaseError)?;
        if taken > 0 {
            return Err(ApiError::BadRequest(format!("Category '{}' already exists", name)));
        }

        let category = DateCategory {
            id: generate_date_category_id(),
            name: name.to_string(),
            icon: clean(&request.icon),
            created_at: now_rfc3339(),
        };

        sqlx::query("INSERT INTO date_categories (id, name, icon, created_at) VALUES (?, ?, ?, ?)")
            .bind(&category.id)
            .bind(&category.name)
            .bind(&category.icon)
            .bind(&category.created_at)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        info!(category_id = %category.id, "Date category created");
        Ok(category)
    }

    async fn require_category(&self, category_id: &str) -> Result<(), ApiError> {
        let (exists,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM date_categories WHERE id = ?")
            .bind(category_id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        if exists == 0 {
            return Err(ApiError::BadRequest("Unknown category".to_string()));
        }
        Ok(())
    }

    // ============================================================================
    // Ideas
    // ============================================================================

    pub async fn list_ideas(&self, category_id: Option<&str>) -> Result<Vec<DateIdea>, ApiError> {
        let category_id = category_id.map(str::trim).filter(|c| !c.is_empty());

        sqlx::query_as::<_, DateIdea>(&format!(
            "{IDEA_SELECT} WHERE (? IS NULL OR i.category_id = ?) ORDER BY i.times_completed ASC, i.created_at DESC"
        ))
        .bind(category_id)
        .bind(category_id)
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn get_idea(&self, idea_id: &str) -> Result<DateIdea, ApiError> {
        sqlx::query_as::<_, DateIdea>(&format!("{IDEA_SELECT} WHERE i.id = ?"))
            .bind(idea_id)
            .fetch_optional(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?
            .ok_or_else(|| ApiError::NotFound("Date idea not found".to_string()))
    }

    pub async fn create_idea(&self, user_id: &str, request: &IdeaRequest) -> Result<DateIdea, ApiError> {
        request.validate(request).into_result()?;
        self.require_category(request.category_id.trim()).await?;

        let id = generate_date_idea_id();
        let now = now_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO date_ideas (
                id, category_id, title, description, cost_level, created_by,
                times_completed, created_at, updated_at
            )
            VALUES (?, ?, ?, ?, ?, ?, 0, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(request.category_id.trim())
        .bind(request.title.trim())
        .bind(clean(&request.description))
        .bind(request.cost_level.unwrap_or(MIN_COST_LEVEL))
        .bind(user_id)
        .bind(&now)
        .bind(&now)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        info!(idea_id = %id, user_id = %user_id, "Date idea created");
        self.get_idea(&id).await
    }

    pub async fn update_idea(&self, idea_id: &str, request: &IdeaRequest) -> Result<DateIdea, ApiError> {
        let existing = self.get_idea(idea_id).await?;
        request.validate(request).into_result()?;
        self.require_category(request.category_id.trim()).await?;

        sqlx::query(
            r#"
            UPDATE date_ideas
            SET category_id = ?, title = ?, description = ?, cost_level = ?, updated_at = ?
            WHERE id = ?
            "#,
        )
        .bind(request.category_id.trim())
        .bind(request.title.trim())
        .bind(clean(&request.description))
        .bind(request.cost_level.unwrap_or(existing.cost_level))
        .bind(now_rfc3339())
        .bind(idea_id)
        .execute(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        self.get_idea(idea_id).await
    }

    /// History rows keep their points; they just lose the idea title
    pub async fn delete_idea(&self, idea_id: &str) -> Result<(), ApiError> {
        let result = sqlx::query("DELETE FROM date_ideas WHERE id = ?")
            .bind(idea_id)
            .execute(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        if result.rows_affected() == 0 {
            return Err(ApiError::NotFound("Date idea not found".to_string()));
        }

        info!(idea_id = %idea_id, "Date idea deleted");
        Ok(())
    }

    /// A random idea, drawn from the never-completed ones while any are left
    pub async fn random_idea(&self, category_id: Option<&str>) -> Result<DateIdea, ApiError> {
        let category_id = category_id.map(str::trim).filter(|c| !c.is_empty());

        sqlx::query_as::<_, DateIdea>(&format!(
            r#"
            {IDEA_SELECT}
            WHERE (? IS NULL OR i.category_id = ?)
            ORDER BY CASE WHEN i.times_completed = 0 THEN 0 ELSE 1 END, RANDOM()
            LIMIT 1
            "#
        ))
        .bind(category_id)
        .bind(category_id)
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?
        .ok_or_else(|| ApiError::NotFound("No date ideas yet".to_string()))
    }

    // ============================================================================
    // Completion and stats
    // ============================================================================

    pub async fn complete_idea(
        &self,
        user_id: &str,
        idea_id: &str,
        request: &CompleteRequest,
    ) -> Result<CompletionResponse, ApiError> {
        request.validate(request).into_result()?;
        let idea = self.get_idea(idea_id).await?;

        let completed_on = request
            .completed_on
            .as_deref()
            .map(str::trim)
            .map(str::to_string)
            .unwrap_or_else(|| Utc::now().format("%Y-%m-%d").to_string());

        let mut tx = self.db.begin().await.map_err(ApiError::DatabaseError)?;

        let (previous,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM completed_dates WHERE category_id = ?")
                .bind(&idea.category_id)
                .fetch_one(&mut *tx)
                .await
                .map_err(ApiError::DatabaseError)?;

        let first_in_category = previous == 0;
        let points = completion_points(request.rating, first_in_category);
        let id = generate_completed_date_id();

        sqlx::query(
            r#"
            INSERT INTO completed_dates (
                id, idea_id, category_id, completed_on, rating, notes, points, created_by, created_at
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&id)
        .bind(&idea.id)
        .bind(&idea.category_id)
        .bind(&completed_on)
        .bind(request.rating)
        .bind(clean(&request.notes))
        .bind(points)
        .bind(user_id)
        .bind(now_rfc3339())
        .execute(&mut *tx)
        .await
        .map_err(ApiError::DatabaseError)?;

        sqlx::query(
            "UPDATE date_ideas SET times_completed = times_completed + 1, updated_at = ? WHERE id = ?",
        )
        .bind(now_rfc3339())
        .bind(&idea.id)
        .execute(&mut *tx)
        .await
        .map_err(ApiError::DatabaseError)?;

        tx.commit().await.map_err(ApiError::DatabaseError)?;

        info!(
            idea_id = %idea.id,
            user_id = %user_id,
            points = points,
            first_in_category = first_in_category,
            "Date completed"
        );

        let completed = sqlx::query_as::<_, CompletedDate>(&format!("{HISTORY_SELECT} WHERE d.id = ?"))
            .bind(&id)
            .fetch_one(&self.db)
            .await
            .map_err(ApiError::DatabaseError)?;

        Ok(CompletionResponse {
            completed,
            points_earned: points,
            first_in_category,
            stats: self.stats().await?,
        })
    }

    pub async fn history(&self) -> Result<Vec<CompletedDate>, ApiError> {
        sqlx::query_as::<_, CompletedDate>(&format!(
            "{HISTORY_SELECT} ORDER BY d.completed_on DESC, d.created_at DESC"
        ))
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)
    }

    pub async fn stats(&self) -> Result<DateStats, ApiError> {
        let (total_points, total_dates): (i64, i64) =
            sqlx::query_as("SELECT COALESCE(SUM(points), 0), COUNT(*) FROM completed_dates")
                .fetch_one(&self.db)
                .await
                .map_err(ApiError::DatabaseError)?;

        let months: Vec<(String,)> = sqlx::query_as(
            "SELECT DISTINCT substr(completed_on, 1, 7) FROM completed_dates",
        )
        .fetch_all(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        let favorite_category: Option<(String,)> = sqlx::query_as(
            r#"
            SELECT c.name
            FROM completed_dates d
            JOIN date_categories c ON c.id = d.category_id
            GROUP BY c.id, c.name
            ORDER BY COUNT(*) DESC, c.name ASC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.db)
        .await
        .map_err(ApiError::DatabaseError)?;

        let today = Utc::now().date_naive();

        Ok(DateStats {
            total_points,
            level: level_for(total_points),
            points_to_next_level: points_to_next_level(total_points),
            total_dates,
            current_streak: monthly_streak(months.iter().map(|(m,)| m.as_str()), today),
            favorite_category: favorite_category.map(|(name,)| name),
        })
    }
}
