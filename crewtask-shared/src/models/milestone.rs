/// Milestone model and database operations
///
/// A milestone is the weekly aggregation unit for a team: it counts how many
/// tasks were assigned into the week and how many completed. Task status
/// transitions drive the counters; the milestone flips to completed when
/// every assigned task is done and flips back if a completed task is
/// reopened.
///
/// Counter arithmetic is factored into [`MilestoneProgress`] so the
/// invariant (`completed_tasks <= total_tasks`) is unit-testable without a
/// database; the SQL mutators apply the same clamping.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE milestones (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     team_id UUID NOT NULL REFERENCES teams(id) ON DELETE CASCADE,
///     title VARCHAR(255) NOT NULL,
///     week_start_date DATE NOT NULL,
///     week_end_date DATE NOT NULL,
///     total_tasks INTEGER NOT NULL DEFAULT 0,
///     completed_tasks INTEGER NOT NULL DEFAULT 0,
///     is_completed BOOLEAN NOT NULL DEFAULT FALSE,
///     completed_at TIMESTAMPTZ,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     CONSTRAINT milestones_counts_check CHECK (completed_tasks <= total_tasks)
/// );
/// ```

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Milestone model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Milestone {
    /// Unique milestone ID
    pub id: Uuid,

    /// Team the milestone belongs to
    pub team_id: Uuid,

    /// Milestone title
    pub title: String,

    /// First day of the covered week
    pub week_start_date: NaiveDate,

    /// Last day of the covered week
    pub week_end_date: NaiveDate,

    /// Number of tasks assigned into this milestone
    pub total_tasks: i32,

    /// Number of those tasks completed
    pub completed_tasks: i32,

    /// Whether every assigned task is completed
    pub is_completed: bool,

    /// When the milestone was completed (None while open)
    pub completed_at: Option<DateTime<Utc>>,

    /// When the milestone was created
    pub created_at: DateTime<Utc>,

    /// When the milestone was last updated
    pub updated_at: DateTime<Utc>,
}

/// Pure counter arithmetic for milestone progress
///
/// Mirrors the SQL mutators exactly. `completed_tasks` never exceeds
/// `total_tasks` and never drops below zero, regardless of the sequence of
/// transitions applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MilestoneProgress {
    /// Tasks assigned into the milestone
    pub total_tasks: i32,

    /// Tasks completed so far
    pub completed_tasks: i32,
}

impl MilestoneProgress {
    /// Records one task entering completed status
    pub fn record_completion(&mut self) {
        self.completed_tasks = (self.completed_tasks + 1).min(self.total_tasks);
    }

    /// Records one completed task being reopened
    pub fn revert_completion(&mut self) {
        self.completed_tasks = (self.completed_tasks - 1).max(0);
    }

    /// Records tasks being assigned into the milestone
    pub fn add_tasks(&mut self, count: i32) {
        self.total_tasks += count.max(0);
    }

    /// Records a task being removed from the milestone
    pub fn remove_task(&mut self, was_completed: bool) {
        self.total_tasks = (self.total_tasks - 1).max(0);
        if was_completed {
            self.completed_tasks = (self.completed_tasks - 1).max(0);
        }
        self.completed_tasks = self.completed_tasks.min(self.total_tasks);
    }

    /// Whether the milestone counts as completed
    pub fn is_complete(&self) -> bool {
        self.total_tasks > 0 && self.completed_tasks >= self.total_tasks
    }
}

impl Milestone {
    /// Resolves the milestone for a team's current week
    ///
    /// Prefers the milestone whose week contains `today`; falls back to the
    /// team's most recent milestone if the current week has none. Returns
    /// None only when the team has no milestones at all.
    pub async fn current_for_team(
        pool: &PgPool,
        team_id: Uuid,
        today: NaiveDate,
    ) -> Result<Option<Self>, sqlx::Error> {
        let current = sqlx::query_as::<_, Milestone>(
            r#"
            SELECT id, team_id, title, week_start_date, week_end_date,
                   total_tasks, completed_tasks, is_completed, completed_at,
                   created_at, updated_at
            FROM milestones
            WHERE team_id = $1 AND week_start_date <= $2 AND week_end_date >= $2
            ORDER BY week_start_date DESC
            LIMIT 1
            "#,
        )
        .bind(team_id)
        .bind(today)
        .fetch_optional(pool)
        .await?;

        if current.is_some() {
            return Ok(current);
        }

        let latest = sqlx::query_as::<_, Milestone>(
            r#"
            SELECT id, team_id, title, week_start_date, week_end_date,
                   total_tasks, completed_tasks, is_completed, completed_at,
                   created_at, updated_at
            FROM milestones
            WHERE team_id = $1
            ORDER BY week_start_date DESC
            LIMIT 1
            "#,
        )
        .bind(team_id)
        .fetch_optional(pool)
        .await?;

        Ok(latest)
    }

    /// Adds newly assigned tasks to the milestone total
    ///
    /// Adding tasks reopens a milestone that was already marked completed.
    pub async fn add_tasks_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        count: i32,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE milestones
            SET total_tasks = total_tasks + $2,
                is_completed = (completed_tasks >= total_tasks + $2 AND total_tasks + $2 > 0),
                completed_at = CASE
                    WHEN completed_tasks >= total_tasks + $2 AND total_tasks + $2 > 0
                    THEN completed_at ELSE NULL END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(count)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Records a task completion against the milestone
    ///
    /// Increments `completed_tasks` (clamped to the total) and marks the
    /// milestone completed, stamping `completed_at`, when every task is
    /// done.
    pub async fn record_completion_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE milestones
            SET completed_tasks = LEAST(completed_tasks + 1, total_tasks),
                is_completed = (LEAST(completed_tasks + 1, total_tasks) >= total_tasks
                                AND total_tasks > 0),
                completed_at = CASE
                    WHEN LEAST(completed_tasks + 1, total_tasks) >= total_tasks
                         AND total_tasks > 0
                    THEN COALESCE(completed_at, NOW())
                    ELSE completed_at END,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Reverts a task completion (completed task moved back to an open status)
    ///
    /// Decrements `completed_tasks` (floor 0) and clears the milestone's
    /// completed flag and timestamp.
    pub async fn revert_completion_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE milestones
            SET completed_tasks = GREATEST(completed_tasks - 1, 0),
                is_completed = FALSE,
                completed_at = NULL,
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .execute(&mut **tx)
        .await?;

        Ok(())
    }

    /// Removes a deleted task from the milestone counters
    pub async fn remove_task_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        was_completed: bool,
    ) -> Result<(), sqlx::Error> {
        sqlx::query(
            r#"
            UPDATE milestones
            SET total_tasks = GREATEST(total_tasks - 1, 0),
                completed_tasks = LEAST(
                    GREATEST(completed_tasks - $2, 0),
                    GREATEST(total_tasks - 1, 0)
                ),
                updated_at = NOW()
            WHERE id = $1
            "#,
        )
        .bind(id)
        .bind(if was_completed { 1i32 } else { 0i32 })
        .execute(&mut **tx)
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completion_never_exceeds_total() {
        let mut progress = MilestoneProgress {
            total_tasks: 2,
            completed_tasks: 0,
        };

        progress.record_completion();
        progress.record_completion();
        progress.record_completion(); // over-completion is clamped

        assert_eq!(progress.completed_tasks, 2);
        assert!(progress.is_complete());
    }

    #[test]
    fn test_revert_floors_at_zero() {
        let mut progress = MilestoneProgress {
            total_tasks: 3,
            completed_tasks: 1,
        };

        progress.revert_completion();
        progress.revert_completion();

        assert_eq!(progress.completed_tasks, 0);
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_invariant_under_transition_sequences() {
        // Arbitrary interleavings of completions, reverts, additions, and
        // removals keep completed <= total.
        let mut progress = MilestoneProgress {
            total_tasks: 0,
            completed_tasks: 0,
        };

        progress.add_tasks(3);
        progress.record_completion();
        progress.record_completion();
        progress.remove_task(true);
        progress.revert_completion();
        progress.record_completion();
        progress.record_completion();
        progress.record_completion();
        progress.remove_task(false);

        assert!(progress.completed_tasks <= progress.total_tasks);
        assert!(progress.completed_tasks >= 0);
    }

    #[test]
    fn test_empty_milestone_is_not_complete() {
        let progress = MilestoneProgress {
            total_tasks: 0,
            completed_tasks: 0,
        };
        assert!(!progress.is_complete());
    }

    #[test]
    fn test_adding_tasks_reopens() {
        let mut progress = MilestoneProgress {
            total_tasks: 1,
            completed_tasks: 1,
        };
        assert!(progress.is_complete());

        progress.add_tasks(2);
        assert!(!progress.is_complete());
        assert_eq!(progress.total_tasks, 3);
    }
}
