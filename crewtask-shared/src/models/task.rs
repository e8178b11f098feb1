/// Task model and database operations
///
/// Tasks are assigned by managers to users, optionally counted against a
/// weekly team milestone, and move through a small status state machine:
///
/// ```text
/// pending → in_progress → in_review → completed
///        ↘ cancelled (from any non-terminal status)
/// completed → (reopened to any earlier status)
/// ```
///
/// Status transitions carry side effects: timestamps are stamped on first
/// entry into a status, and completion drives the owning milestone's
/// counters. The side effects are computed by the pure
/// [`transition_effect`] function and applied inside the caller's
/// transaction by [`Task::set_status_tx`], so the task row and its
/// milestone always change together.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE task_status AS ENUM (
///     'pending', 'in_progress', 'in_review', 'completed', 'cancelled'
/// );
///
/// CREATE TABLE tasks (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     title VARCHAR(255) NOT NULL,
///     description TEXT,
///     category VARCHAR(100) NOT NULL DEFAULT 'general',
///     status task_status NOT NULL DEFAULT 'pending',
///     assigned_to UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     assigned_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     milestone_id UUID REFERENCES milestones(id) ON DELETE SET NULL,
///     due_date TIMESTAMPTZ NOT NULL,
///     started_at TIMESTAMPTZ,
///     completed_at TIMESTAMPTZ,
///     cancelled_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```

use super::milestone::Milestone;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "task_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    /// Assigned, not yet started
    Pending,

    /// Being worked on
    InProgress,

    /// A manager has pulled the task into review
    InReview,

    /// Done
    Completed,

    /// Abandoned; terminal
    Cancelled,
}

impl TaskStatus {
    /// Converts status to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::InReview => "in_review",
            TaskStatus::Completed => "completed",
            TaskStatus::Cancelled => "cancelled",
        }
    }

    /// Parses a status from its wire string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(TaskStatus::Pending),
            "in_progress" => Some(TaskStatus::InProgress),
            "in_review" => Some(TaskStatus::InReview),
            "completed" => Some(TaskStatus::Completed),
            "cancelled" => Some(TaskStatus::Cancelled),
            _ => None,
        }
    }

    /// Checks if this status is terminal
    ///
    /// Cancelled tasks cannot change status again. Completed tasks can be
    /// reopened.
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Cancelled)
    }

    /// Checks whether a completion report may be submitted in this status
    pub fn accepts_report(&self) -> bool {
        matches!(self, TaskStatus::InProgress | TaskStatus::InReview)
    }

    /// Checks if a transition to `target` is allowed
    pub fn can_transition_to(&self, target: TaskStatus) -> bool {
        if *self == target {
            return false;
        }
        // Cancelled is terminal; everything else may move, including
        // reopening a completed task.
        !self.is_terminal()
    }
}

/// How a status change affects the task's milestone counters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MilestoneEffect {
    /// No counter change
    None,

    /// One more task completed
    RecordCompletion,

    /// A completed task was reopened
    RevertCompletion,
}

/// Side effects of a status transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransitionEffect {
    /// Stamp `started_at` if unset
    pub stamp_started: bool,

    /// Stamp `completed_at` if unset
    pub stamp_completed: bool,

    /// Clear `completed_at`
    pub clear_completed: bool,

    /// Stamp `cancelled_at` if unset
    pub stamp_cancelled: bool,

    /// Milestone counter change
    pub milestone: MilestoneEffect,
}

/// Computes the side effects of moving a task from `from` to `to`
///
/// Pure so the stamping and counter rules are testable without a database.
pub fn transition_effect(from: TaskStatus, to: TaskStatus) -> TransitionEffect {
    TransitionEffect {
        stamp_started: to == TaskStatus::InProgress,
        stamp_completed: to == TaskStatus::Completed,
        clear_completed: from == TaskStatus::Completed && to != TaskStatus::Completed,
        stamp_cancelled: to == TaskStatus::Cancelled,
        milestone: if to == TaskStatus::Completed && from != TaskStatus::Completed {
            MilestoneEffect::RecordCompletion
        } else if from == TaskStatus::Completed && to != TaskStatus::Completed {
            MilestoneEffect::RevertCompletion
        } else {
            MilestoneEffect::None
        },
    }
}

/// Task model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    /// Unique task ID
    pub id: Uuid,

    /// Task title
    pub title: String,

    /// Longer description
    pub description: Option<String>,

    /// Free-text category (e.g. "development", "design")
    pub category: String,

    /// Current status
    pub status: TaskStatus,

    /// User the task is assigned to (the owner)
    pub assigned_to: Uuid,

    /// Manager who assigned the task
    pub assigned_by: Uuid,

    /// Weekly milestone the task counts against, if any
    pub milestone_id: Option<Uuid>,

    /// Deadline; on-time report bonus is measured against this
    pub due_date: DateTime<Utc>,

    /// When work started (stamped on first transition to in_progress)
    pub started_at: Option<DateTime<Utc>>,

    /// When the task completed (stamped on first transition to completed)
    pub completed_at: Option<DateTime<Utc>>,

    /// When the task was cancelled
    pub cancelled_at: Option<DateTime<Utc>>,

    /// When the task was created
    pub created_at: DateTime<Utc>,

    /// When the task was last updated
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a new task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    /// Task title
    pub title: String,

    /// Longer description
    pub description: Option<String>,

    /// Category
    pub category: String,

    /// Assignee
    pub assigned_to: Uuid,

    /// Assigning manager
    pub assigned_by: Uuid,

    /// Milestone to count against (None for executive-created tasks)
    pub milestone_id: Option<Uuid>,

    /// Deadline
    pub due_date: DateTime<Utc>,
}

/// Input for editing task fields (not status)
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateTask {
    /// New title
    pub title: Option<String>,

    /// New description (Some(None) clears)
    pub description: Option<Option<String>>,

    /// New category
    pub category: Option<String>,

    /// New deadline
    pub due_date: Option<DateTime<Utc>>,
}

const TASK_COLUMNS: &str = "id, title, description, category, status, assigned_to, assigned_by, \
     milestone_id, due_date, started_at, completed_at, cancelled_at, created_at, updated_at";

impl Task {
    /// Creates a task inside an open transaction
    ///
    /// Task creation is transactional with the milestone total increment,
    /// so callers open the transaction, create each task, bump the
    /// milestone, and commit.
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        data: CreateTask,
    ) -> Result<Self, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            r#"
            INSERT INTO tasks (title, description, category, assigned_to, assigned_by,
                               milestone_id, due_date)
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            RETURNING {TASK_COLUMNS}
            "#,
        ))
        .bind(data.title)
        .bind(data.description)
        .bind(data.category)
        .bind(data.assigned_to)
        .bind(data.assigned_by)
        .bind(data.milestone_id)
        .bind(data.due_date)
        .fetch_one(&mut **tx)
        .await?;

        Ok(task)
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(task)
    }

    /// Loads a task row with a row lock inside an open transaction
    ///
    /// Used during review settlement so the status check and update are
    /// atomic across concurrent reviewers.
    pub async fn find_by_id_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(task)
    }

    /// Applies a status transition with its side effects
    ///
    /// Stamps/clears timestamps per [`transition_effect`] and updates the
    /// milestone counters when the task has one. Everything happens inside
    /// the caller's transaction.
    pub async fn set_status_tx(
        tx: &mut Transaction<'_, Postgres>,
        task: &Task,
        new_status: TaskStatus,
    ) -> Result<Self, sqlx::Error> {
        let effect = transition_effect(task.status, new_status);

        let mut query = String::from("UPDATE tasks SET status = $2, updated_at = NOW()");
        if effect.stamp_started {
            query.push_str(", started_at = COALESCE(started_at, NOW())");
        }
        if effect.stamp_completed {
            query.push_str(", completed_at = COALESCE(completed_at, NOW())");
        }
        if effect.clear_completed {
            query.push_str(", completed_at = NULL");
        }
        if effect.stamp_cancelled {
            query.push_str(", cancelled_at = COALESCE(cancelled_at, NOW())");
        }
        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let updated = sqlx::query_as::<_, Task>(&query)
            .bind(task.id)
            .bind(new_status)
            .fetch_one(&mut **tx)
            .await?;

        if let Some(milestone_id) = task.milestone_id {
            match effect.milestone {
                MilestoneEffect::RecordCompletion => {
                    Milestone::record_completion_tx(tx, milestone_id).await?;
                }
                MilestoneEffect::RevertCompletion => {
                    Milestone::revert_completion_tx(tx, milestone_id).await?;
                }
                MilestoneEffect::None => {}
            }
        }

        Ok(updated)
    }

    /// Edits task fields (title, description, category, due date)
    ///
    /// Only non-None fields are updated.
    pub async fn update(
        pool: &PgPool,
        id: Uuid,
        data: UpdateTask,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if data.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if data.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if data.category.is_some() {
            bind_count += 1;
            query.push_str(&format!(", category = ${}", bind_count));
        }
        if data.due_date.is_some() {
            bind_count += 1;
            query.push_str(&format!(", due_date = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(title) = data.title {
            q = q.bind(title);
        }
        if let Some(description) = data.description {
            q = q.bind(description);
        }
        if let Some(category) = data.category {
            q = q.bind(category);
        }
        if let Some(due_date) = data.due_date {
            q = q.bind(due_date);
        }

        let task = q.fetch_optional(pool).await?;

        Ok(task)
    }

    /// Deletes a task inside an open transaction
    ///
    /// The caller is responsible for adjusting the milestone counters with
    /// the returned row.
    pub async fn delete_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let task = sqlx::query_as::<_, Task>(&format!(
            "DELETE FROM tasks WHERE id = $1 RETURNING {TASK_COLUMNS}"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(task)
    }

    /// Lists tasks assigned to a user, with optional status/category filters
    pub async fn list_by_owner(
        pool: &PgPool,
        owner: Uuid,
        status: Option<TaskStatus>,
        category: Option<&str>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE assigned_to = $1");
        let mut bind_count = 1;

        if status.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND status = ${}", bind_count));
        }
        if category.is_some() {
            bind_count += 1;
            query.push_str(&format!(" AND category = ${}", bind_count));
        }
        query.push_str(" ORDER BY due_date ASC, created_at DESC");

        let mut q = sqlx::query_as::<_, Task>(&query).bind(owner);
        if let Some(status) = status {
            q = q.bind(status);
        }
        if let Some(category) = category {
            q = q.bind(category.to_string());
        }

        let tasks = q.fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Lists tasks assigned by a manager
    pub async fn list_by_assigner(
        pool: &PgPool,
        assigner: Uuid,
        status: Option<TaskStatus>,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE assigned_by = $1");
        if status.is_some() {
            query.push_str(" AND status = $2");
        }
        query.push_str(" ORDER BY due_date ASC, created_at DESC");

        let mut q = sqlx::query_as::<_, Task>(&query).bind(assigner);
        if let Some(status) = status {
            q = q.bind(status);
        }

        let tasks = q.fetch_all(pool).await?;

        Ok(tasks)
    }

    /// Counts a user's tasks grouped by status
    pub async fn count_by_status_for_owner(
        pool: &PgPool,
        owner: Uuid,
    ) -> Result<Vec<(TaskStatus, i64)>, sqlx::Error> {
        let counts: Vec<(TaskStatus, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM tasks
            WHERE assigned_to = $1
            GROUP BY status
            "#,
        )
        .bind(owner)
        .fetch_all(pool)
        .await?;

        Ok(counts)
    }

    /// Counts a manager's assigned tasks grouped by status
    pub async fn count_by_status_for_assigner(
        pool: &PgPool,
        assigner: Uuid,
    ) -> Result<Vec<(TaskStatus, i64)>, sqlx::Error> {
        let counts: Vec<(TaskStatus, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM tasks
            WHERE assigned_by = $1
            GROUP BY status
            "#,
        )
        .bind(assigner)
        .fetch_all(pool)
        .await?;

        Ok(counts)
    }

    /// Lists the distinct task categories in use
    pub async fn distinct_categories(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> =
            sqlx::query_as("SELECT DISTINCT category FROM tasks ORDER BY category ASC")
                .fetch_all(pool)
                .await?;

        Ok(rows.into_iter().map(|(c,)| c).collect())
    }

    /// Lists the caller's tasks eligible for a leadership report
    ///
    /// Tasks assigned to `owner` by `assigned_by`, in progress or
    /// completed, with no leadership report yet.
    pub async fn leadership_candidates(
        pool: &PgPool,
        owner: Uuid,
        assigned_by: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks t
            WHERE t.assigned_to = $1
              AND t.assigned_by = $2
              AND t.status IN ('in_progress', 'completed')
              AND NOT EXISTS (
                  SELECT 1 FROM leadership_reports lr WHERE lr.task_id = t.id
              )
            ORDER BY t.due_date ASC
            "#,
        ))
        .bind(owner)
        .bind(assigned_by)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }

    /// Lists the caller's tasks that can still receive a completion report
    ///
    /// In progress or in review, with no report submitted yet.
    pub async fn pending_report_tasks(pool: &PgPool, owner: Uuid) -> Result<Vec<Self>, sqlx::Error> {
        let tasks = sqlx::query_as::<_, Task>(&format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks t
            WHERE t.assigned_to = $1
              AND t.status IN ('in_progress', 'in_review')
              AND NOT EXISTS (SELECT 1 FROM reports r WHERE r.task_id = t.id)
            ORDER BY t.due_date ASC
            "#,
        ))
        .bind(owner)
        .fetch_all(pool)
        .await?;

        Ok(tasks)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for status in [
            TaskStatus::Pending,
            TaskStatus::InProgress,
            TaskStatus::InReview,
            TaskStatus::Completed,
            TaskStatus::Cancelled,
        ] {
            assert_eq!(TaskStatus::parse(status.as_str()), Some(status));
        }
        assert_eq!(TaskStatus::parse("done"), None);
    }

    #[test]
    fn test_cancelled_is_terminal() {
        assert!(TaskStatus::Cancelled.is_terminal());
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::Pending));
        assert!(!TaskStatus::Cancelled.can_transition_to(TaskStatus::InProgress));

        // Completed tasks can be reopened
        assert!(TaskStatus::Completed.can_transition_to(TaskStatus::InProgress));
    }

    #[test]
    fn test_report_accepting_statuses() {
        assert!(TaskStatus::InProgress.accepts_report());
        assert!(TaskStatus::InReview.accepts_report());
        assert!(!TaskStatus::Pending.accepts_report());
        assert!(!TaskStatus::Completed.accepts_report());
        assert!(!TaskStatus::Cancelled.accepts_report());
    }

    #[test]
    fn test_transition_to_completed_records_milestone() {
        let effect = transition_effect(TaskStatus::InReview, TaskStatus::Completed);
        assert!(effect.stamp_completed);
        assert!(!effect.clear_completed);
        assert_eq!(effect.milestone, MilestoneEffect::RecordCompletion);
    }

    #[test]
    fn test_reopening_completed_reverts_milestone() {
        let effect = transition_effect(TaskStatus::Completed, TaskStatus::InProgress);
        assert!(effect.clear_completed);
        assert!(effect.stamp_started);
        assert_eq!(effect.milestone, MilestoneEffect::RevertCompletion);
    }

    #[test]
    fn test_start_and_cancel_stamps() {
        let effect = transition_effect(TaskStatus::Pending, TaskStatus::InProgress);
        assert!(effect.stamp_started);
        assert_eq!(effect.milestone, MilestoneEffect::None);

        let effect = transition_effect(TaskStatus::InProgress, TaskStatus::Cancelled);
        assert!(effect.stamp_cancelled);
        assert_eq!(effect.milestone, MilestoneEffect::None);
    }

    #[test]
    fn test_lateral_transition_has_no_milestone_effect() {
        let effect = transition_effect(TaskStatus::InProgress, TaskStatus::InReview);
        assert_eq!(effect.milestone, MilestoneEffect::None);
        assert!(!effect.stamp_completed);
        assert!(!effect.clear_completed);
    }
}
