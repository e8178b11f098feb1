/// Aggregate queries for performance analytics
///
/// Read-only rollups over tasks, users, and departments. These back the
/// analytics endpoints and never mutate anything.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Completed-task count for one week
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct WeeklyCompletion {
    /// First day of the week (date_trunc week)
    pub week: NaiveDate,

    /// Tasks completed in that week
    pub completed: i64,
}

/// Task count for one category
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct CategoryCount {
    /// Category name
    pub category: String,

    /// Number of tasks in the category
    pub count: i64,
}

/// Per-department completion rollup
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct DepartmentStats {
    /// Department ID
    pub department_id: Uuid,

    /// Department name
    pub department_name: String,

    /// Tasks assigned to the department's members
    pub total_tasks: i64,

    /// Of those, completed
    pub completed_tasks: i64,

    /// Sum of member points
    pub total_points: i64,
}

/// Weekly completed-task counts for a user's tasks
///
/// Covers the most recent `weeks` weeks that had any completions.
pub async fn weekly_completions(
    pool: &PgPool,
    owner: Uuid,
    weeks: i64,
) -> Result<Vec<WeeklyCompletion>, sqlx::Error> {
    let rows = sqlx::query_as::<_, WeeklyCompletion>(
        r#"
        SELECT date_trunc('week', completed_at)::date AS week,
               COUNT(*) AS completed
        FROM tasks
        WHERE assigned_to = $1 AND status = 'completed' AND completed_at IS NOT NULL
        GROUP BY 1
        ORDER BY 1 DESC
        LIMIT $2
        "#,
    )
    .bind(owner)
    .bind(weeks)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Task counts per category for a user's tasks
pub async fn category_counts(pool: &PgPool, owner: Uuid) -> Result<Vec<CategoryCount>, sqlx::Error> {
    let rows = sqlx::query_as::<_, CategoryCount>(
        r#"
        SELECT category, COUNT(*) AS count
        FROM tasks
        WHERE assigned_to = $1
        GROUP BY category
        ORDER BY count DESC, category ASC
        "#,
    )
    .bind(owner)
    .fetch_all(pool)
    .await?;

    Ok(rows)
}

/// Per-department task completion and point totals
pub async fn department_comparison(pool: &PgPool) -> Result<Vec<DepartmentStats>, sqlx::Error> {
    let rows = sqlx::query_as::<_, DepartmentStats>(
        r#"
        SELECT d.id AS department_id,
               d.name AS department_name,
               COALESCE(SUM(us.total_tasks), 0)::BIGINT AS total_tasks,
               COALESCE(SUM(us.completed_tasks), 0)::BIGINT AS completed_tasks,
               COALESCE(SUM(us.points), 0)::BIGINT AS total_points
        FROM departments d
        LEFT JOIN (
            SELECT u.id,
                   u.department_id,
                   u.points::BIGINT AS points,
                   COUNT(t.id) AS total_tasks,
                   COUNT(t.id) FILTER (WHERE t.status = 'completed') AS completed_tasks
            FROM users u
            LEFT JOIN tasks t ON t.assigned_to = u.id
            WHERE u.is_active = TRUE
            GROUP BY u.id
        ) us ON us.department_id = d.id
        GROUP BY d.id, d.name
        ORDER BY d.name ASC
        "#,
    )
    .fetch_all(pool)
    .await?;

    Ok(rows)
}
