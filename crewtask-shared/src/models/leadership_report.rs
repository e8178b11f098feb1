/// Leadership report model and database operations
///
/// A leadership report is an upward status report from a management role
/// (team lead, department head, project manager, or an executive). Unlike a
/// completion report its reviewer is fixed at submission time: the routing
/// table resolves `submitted_to`, and only that exact user may review it.
///
/// Optionally linked to a task; at most one leadership report per task.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE leadership_reports (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     task_id UUID REFERENCES tasks(id) ON DELETE CASCADE,
///     submitted_by UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     submitted_to UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     content TEXT NOT NULL,
///     report_period VARCHAR(100),
///     status report_status NOT NULL DEFAULT 'pending',
///     review_notes TEXT,
///     submitted_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     reviewed_at TIMESTAMPTZ
/// );
/// ```

use super::report::ReportStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Postgres, Transaction};
use uuid::Uuid;

/// Leadership report model
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct LeadershipReport {
    /// Unique report ID
    pub id: Uuid,

    /// Linked task, if any (one leadership report per task)
    pub task_id: Option<Uuid>,

    /// Submitting manager
    pub submitted_by: Uuid,

    /// Reviewer resolved at submission time; equals `submitted_by` for a
    /// dual-role department head's team-level self-review
    pub submitted_to: Uuid,

    /// Report body
    pub content: String,

    /// Covered period (free text, e.g. "2025-W02")
    pub report_period: Option<String>,

    /// Review status
    pub status: ReportStatus,

    /// Reviewer's notes (required on rejection)
    pub review_notes: Option<String>,

    /// Submission timestamp
    pub submitted_at: DateTime<Utc>,

    /// When the report was reviewed
    pub reviewed_at: Option<DateTime<Utc>>,
}

/// Input for creating a leadership report
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateLeadershipReport {
    /// Linked task, if any
    pub task_id: Option<Uuid>,

    /// Submitting manager
    pub submitted_by: Uuid,

    /// Resolved reviewer
    pub submitted_to: Uuid,

    /// Report body
    pub content: String,

    /// Covered period
    pub report_period: Option<String>,
}

const LR_COLUMNS: &str = "id, task_id, submitted_by, submitted_to, content, report_period, \
     status, review_notes, submitted_at, reviewed_at";

impl LeadershipReport {
    /// Creates a pending leadership report inside an open transaction
    pub async fn create_tx(
        tx: &mut Transaction<'_, Postgres>,
        data: CreateLeadershipReport,
    ) -> Result<Self, sqlx::Error> {
        let report = sqlx::query_as::<_, LeadershipReport>(&format!(
            r#"
            INSERT INTO leadership_reports
                (task_id, submitted_by, submitted_to, content, report_period)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {LR_COLUMNS}
            "#,
        ))
        .bind(data.task_id)
        .bind(data.submitted_by)
        .bind(data.submitted_to)
        .bind(data.content)
        .bind(data.report_period)
        .fetch_one(&mut **tx)
        .await?;

        Ok(report)
    }

    /// Loads a leadership report row with a row lock inside an open transaction
    pub async fn find_by_id_for_update(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
    ) -> Result<Option<Self>, sqlx::Error> {
        let report = sqlx::query_as::<_, LeadershipReport>(&format!(
            "SELECT {LR_COLUMNS} FROM leadership_reports WHERE id = $1 FOR UPDATE"
        ))
        .bind(id)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(report)
    }

    /// Finds the leadership report linked to a task, if any
    pub async fn find_by_task(pool: &PgPool, task_id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let report = sqlx::query_as::<_, LeadershipReport>(&format!(
            "SELECT {LR_COLUMNS} FROM leadership_reports WHERE task_id = $1"
        ))
        .bind(task_id)
        .fetch_optional(pool)
        .await?;

        Ok(report)
    }

    /// Stamps the review outcome, guarded on pending status
    ///
    /// Returns None if the report was already settled.
    pub async fn mark_reviewed_tx(
        tx: &mut Transaction<'_, Postgres>,
        id: Uuid,
        status: ReportStatus,
        review_notes: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let report = sqlx::query_as::<_, LeadershipReport>(&format!(
            r#"
            UPDATE leadership_reports
            SET status = $2,
                review_notes = $3,
                reviewed_at = NOW()
            WHERE id = $1 AND status = 'pending'
            RETURNING {LR_COLUMNS}
            "#,
        ))
        .bind(id)
        .bind(status)
        .bind(review_notes)
        .fetch_optional(&mut **tx)
        .await?;

        Ok(report)
    }

    /// Lists leadership reports addressed to a reviewer, by status
    pub async fn list_for_reviewer(
        pool: &PgPool,
        submitted_to: Uuid,
        pending_only: bool,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let mut query = format!(
            "SELECT {LR_COLUMNS} FROM leadership_reports WHERE submitted_to = $1"
        );
        if pending_only {
            query.push_str(" AND status = 'pending'");
        } else {
            query.push_str(" AND status <> 'pending'");
        }
        query.push_str(" ORDER BY submitted_at DESC");

        let reports = sqlx::query_as::<_, LeadershipReport>(&query)
            .bind(submitted_to)
            .fetch_all(pool)
            .await?;

        Ok(reports)
    }
}
