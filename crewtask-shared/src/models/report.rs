/// Completion report model and database operations
///
/// A report is submitted by a task's owner when the work is done, routes to
/// a reviewer resolved from the org hierarchy, and is settled (approved or
/// rejected) exactly once. At most one report exists per task.
///
/// # State Machine
///
/// ```text
/// pending → approved
///         → rejected
/// ```
///
/// Both outcomes are terminal; a second review attempt conflicts.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE report_status AS ENUM ('pending', 'approved', 'rejected');
///
/// CREATE TABLE reports (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     submitted_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     status report_status NOT NULL DEFAULT 'pending',
///     reviewed_by UUID REFERENCES users(id) ON DELETE SET NULL,
///     review_notes TEXT,
///     submitted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     reviewed_at TIMESTAMPTZ
/// );
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Review status of a report or leadership report
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "report_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ReportStatus {
    /// Awaiting review
    Pending,

    /// Approved; settlement awarded points and completed the task
    Approved,

    /// Rejected with notes; task left as-is
    Rejected,
}

impl ReportStatus {
    /// Converts status to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            ReportStatus::Pending => "pending",
            ReportStatus::Approved => "approved",
            ReportStatus::Rejected => "rejected",
        }
    }

    /// Whether this is a terminal review outcome
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReportStatus::Approved | ReportStatus::Rejected)
    }
}

/// Completion report model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct Report {
    /// Unique report ID
    pub id: Uuid,

    /// Task the report is about (one report per task)
    pub task_id: Uuid,

    /// Submitting user (the task owner)
    pub submitted_by: Uuid,

    /// Report body
    pub content: String,

    /// Review status
    pub status: ReportStatus,

    /// Reviewer who settled the report
    pub reviewed_by: Option<Uuid>,

    /// Reviewer's notes (required on rejection)
    pub review_notes: Option<String>,

    /// Submission timestamp; the on-time bonus compares this against the
    /// task's due date
    pub submitted_at: DateTime<Utc>,

    /// When the report was reviewed
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Input for creating a report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateReport {
    /// Task being reported on
    pub task_id: Uuid,

    /// Submitting user
    pub submitted_by: Uuid,

    /// Report body
    pub content: String,
}

const REPORT_COLUMNS: &str = "id, task_id, submitted_by, content, status, reviewed_by, \
     review_notes, submitted_at, reviewed_at";

impl Report {
    /// Creates a pending report inside an open transaction
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        data: CreateReport,
    ) -> Result<Self, sqlx::Error> {
        let report = sqlx::query_as::<_, Report>(&format!(
            r#"
            INSERT INTO reports (task_id, submitted_by, content)
            VALUES ($1, $2, $3)
            RETURNING {REPORT_COLUMNS}
            "#,
        ))
        .bind(data.task_id)
        .bind(data.submitted_by)
        .bind(data.content)
        .fetch_one(&mut **tx)
        .await?;

        Ok(report)
    }

    /// Finds a report by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let report = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(report)
    }

    /// Loads a report row with a row lock inside an open transaction
    ///
    /// Review settlement loads the report this way so the pending check and
    /// the terminal transition are atomic across concurrent reviewers.
    pub async fn find_by_id_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let report = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(report)
    }

    /// Finds the report for a task, if one exists
    pub async fn find_by_task(pool: &PgPool, task_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let report = sqlx::query_as::<_, Report>(&format!(
            "SELECT {REPORT_COLUMNS} FROM reports WHERE task_id = $1"
        ))
        .bind(task_id)
        .fetch_optional(pool)
        .await?;

        Ok(report)
    }

    /// Stamps the review outcome, guarded on pending status
    ///
    /// Returns None if the report was already settled (the guard failed),
    /// which callers surface as a conflict.
    pub async fn mark_reviewed_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: ReportStatus,
        reviewed_by: Uuid,
        review_notes: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let report = sqlx::query_as::<_, Report>(&format!(
            r#"
            UPDATE reports
            SET status = $2,
                reviewed_by = $3,
                review_notes = $4,
                reviewed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {REPORT_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status)
        .bind(reviewed_by)
        .bind(review_notes)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(report)
    }

    /// Lists reports submitted by a user
    pub async fn list_by_submitter(
        pool: &PgPool,
        submitted_by: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let reports = sqlx::query_as::<_, Report>(&format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM reports
            WHERE submitted_by = $1
            ORDER BY submitted_at DESC
            "#,
        ))
        .bind(submitted_by)
        .fetch_all(pool)
        .await?;

        Ok(reports)
    }

    /// Lists all pending reports (executive review scope)
    pub async fn list_pending(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let reports = sqlx::query_as::<_, Report>(&format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM reports
            WHERE status = 'pending'
            ORDER BY submitted_at ASC
            "#,
        ))
        .fetch_all(pool)
        .await?;

        Ok(reports)
    }

    /// Lists pending reports from submitters in a department
    pub async fn list_pending_for_department(
        pool: &PgPool,
        department_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let reports = sqlx::query_as::<_, Report>(&format!(
            r#"
            SELECT r.{REPORT_COLUMNS_QUALIFIED}
            FROM reports r
            JOIN users u ON u.id = r.submitted_by
            WHERE r.status = 'pending' AND u.department_id = $1
            ORDER BY r.submitted_at ASC
            "#,
            REPORT_COLUMNS_QUALIFIED = REPORT_COLUMNS_QUALIFIED,
        ))
        .bind(department_id)
        .fetch_all(pool)
        .await?;

        Ok(reports)
    }

    /// Lists pending reports from members of the given teams
    pub async fn list_pending_for_teams(
        pool: &PgPool,
        team_ids: &[Uuid],
    ) -> Result<Vec<Self>, sqlx::Error> {
        let reports = sqlx::query_as::<_, Report>(&format!(
            r#"
            SELECT r.{REPORT_COLUMNS_QUALIFIED}
            FROM reports r
            JOIN team_members tm ON tm.user_id = r.submitted_by
            WHERE r.status = 'pending' AND tm.team_id = ANY($1)
            ORDER BY r.submitted_at ASC
            "#,
            REPORT_COLUMNS_QUALIFIED = REPORT_COLUMNS_QUALIFIED,
        ))
        .bind(team_ids)
        .fetch_all(pool)
        .await?;

        Ok(reports)
    }

    /// Lists reports settled by a reviewer
    pub async fn list_reviewed_by(
        pool: &PgPool,
        reviewed_by: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let reports = sqlx::query_as::<_, Report>(&format!(
            r#"
            SELECT {REPORT_COLUMNS}
            FROM reports
            WHERE reviewed_by = $1
            ORDER BY reviewed_at DESC
            "#,
        ))
        .bind(reviewed_by)
        .fetch_all(pool)
        .await?;

        Ok(reports)
    }

    /// Counts a reviewer's settled reports grouped by outcome
    pub async fn review_summary(
        pool: &PgPool,
        reviewed_by: Uuid,
    ) -> Result<Vec<(ReportStatus, i64)>, sqlx::Error> {
        let counts: Vec<(ReportStatus, i64)> = sqlx::query_as(
            r#"
            SELECT status, COUNT(*)
            FROM reports
            WHERE reviewed_by = $1 AND status <> 'pending'
            GROUP BY status
            "#,
        )
        .bind(reviewed_by)
        .fetch_all(pool)
        .await?;

        Ok(counts)
    }
}

// "r."-qualified column list for joined queries.
const REPORT_COLUMNS_QUALIFIED: &str = "id, r.task_id, r.submitted_by, r.content, r.status, \
     r.reviewed_by, r.review_notes, r.submitted_at, r.reviewed_at";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_report_status_wire_strings() {
        assert_eq!(ReportStatus::Pending.as_str(), "pending");
        assert_eq!(ReportStatus::Approved.as_str(), "approved");
        assert_eq!(ReportStatus::Rejected.as_str(), "rejected");
    }

    #[test]
    fn test_terminal_statuses() {
        assert!(!ReportStatus::Pending.is_terminal());
        assert!(ReportStatus::Approved.is_terminal());
        assert!(ReportStatus::Rejected.is_terminal());
    }
}
