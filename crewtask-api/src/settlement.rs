/// Review settlement: validation, eligibility, and point awards
///
/// Settling a review is the only place points are awarded. The rules:
///
/// - The reviewer earns 15 points for every settled review, approved or
///   rejected.
/// - On approval, and only when a task is linked, the submitter earns a
///   base 10 points plus a 5-point on-time bonus when the report was
///   submitted at or before the task's due date (boundary inclusive). A
///   taskless leadership report awards the submitter nothing.
/// - Rejection requires non-empty review notes, validated before any row
///   is touched.
///
/// Settlement runs in a single transaction with the report row (and the
/// linked task row) locked `FOR UPDATE`, and the terminal-status update is
/// guarded on `status = 'pending'`, so two reviewers racing on the same
/// report settle it exactly once; the loser gets a conflict. Point awards
/// are atomic SQL increments inside the same transaction.

use crate::error::ApiError;
use chrono::{DateTime, Utc};
use crewtask_shared::directory;
use crewtask_shared::models::leadership_report::LeadershipReport;
use crewtask_shared::models::report::{Report, ReportStatus};
use crewtask_shared::models::task::{Task, TaskStatus};
use crewtask_shared::models::user::{User, UserRole};
use sqlx::PgPool;
use uuid::Uuid;

/// Points awarded to the reviewer for settling a review
pub const REVIEWER_POINTS: i32 = 15;

/// Base points awarded to the submitter on approval
pub const SUBMITTER_BASE_POINTS: i32 = 10;

/// Bonus for submitting at or before the task's due date
pub const ON_TIME_BONUS_POINTS: i32 = 5;

/// Whether a submission time qualifies for the on-time bonus
///
/// Boundary inclusive: submitting exactly at the due date still earns the
/// bonus.
pub fn is_on_time(submitted_at: DateTime<Utc>, due_date: DateTime<Utc>) -> bool {
    submitted_at <= due_date
}

/// Points awarded to the submitter on approval
pub fn submitter_points(on_time: bool) -> i32 {
    if on_time {
        SUBMITTER_BASE_POINTS + ON_TIME_BONUS_POINTS
    } else {
        SUBMITTER_BASE_POINTS
    }
}

/// A validated review decision
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewDecision {
    /// Approve; completes the task and awards submitter points
    Approved,

    /// Reject with notes; task and submitter points untouched
    Rejected,
}

impl ReviewDecision {
    /// The terminal report status this decision produces
    pub fn as_report_status(&self) -> ReportStatus {
        match self {
            ReviewDecision::Approved => ReportStatus::Approved,
            ReviewDecision::Rejected => ReportStatus::Rejected,
        }
    }
}

/// Validates a review request body before any mutation
///
/// `status` must be "approved" or "rejected"; rejection requires non-empty
/// review notes. Returns the decision and the trimmed notes.
pub fn validate_review(
    status: &str,
    review_notes: Option<&str>,
) -> Result<(ReviewDecision, Option<String>), ApiError> {
    let decision = match status {
        "approved" => ReviewDecision::Approved,
        "rejected" => ReviewDecision::Rejected,
        _ => {
            return Err(ApiError::validation(
                "status",
                "status must be \"approved\" or \"rejected\"",
            ))
        }
    };

    let notes = review_notes
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string);

    if decision == ReviewDecision::Rejected && notes.is_none() {
        return Err(ApiError::validation(
            "review_notes",
            "Review notes are required when rejecting a report",
        ));
    }

    Ok((decision, notes))
}

/// Whether a reviewer may settle a completion report
///
/// Executives always may; a department head may within their own
/// department; a team lead or project manager may when the submitter
/// belongs to a team they lead. Pure so the eligibility table is testable
/// without a database.
pub fn can_review_report(
    reviewer_role: UserRole,
    reviewer_department: Option<Uuid>,
    submitter_department: Option<Uuid>,
    submitter_team: Option<Uuid>,
    reviewer_led_teams: &[Uuid],
) -> bool {
    if reviewer_role.is_executive() {
        return true;
    }

    match reviewer_role {
        UserRole::DepartmentHead => match (reviewer_department, submitter_department) {
            (Some(a), Some(b)) => a == b,
            _ => false,
        },
        UserRole::TeamLead | UserRole::ProjectManager => submitter_team
            .map(|team| reviewer_led_teams.contains(&team))
            .unwrap_or(false),
        _ => false,
    }
}

/// Whether a role may settle leadership reports at all
///
/// The exact `submitted_to` match is checked separately against the row.
pub fn can_review_leadership(role: UserRole) -> bool {
    matches!(
        role,
        UserRole::DepartmentHead
            | UserRole::ProjectManager
            | UserRole::Ceo
            | UserRole::Coo
            | UserRole::Cto
    )
}

/// Checks that `reviewer` may settle a report submitted by `submitter`
///
/// Gathers the directory facts and applies [`can_review_report`].
pub async fn ensure_review_authority(
    pool: &PgPool,
    reviewer: &User,
    submitter: &User,
) -> Result<(), ApiError> {
    if reviewer.id == submitter.id {
        return Err(ApiError::Forbidden(
            "You cannot review your own report".to_string(),
        ));
    }

    let submitter_team = directory::team_of(pool, submitter.id).await?.map(|t| t.id);
    let led_teams = directory::teams_led_by(pool, reviewer.id).await?;

    if can_review_report(
        reviewer.role,
        reviewer.department_id,
        submitter.department_id,
        submitter_team,
        &led_teams,
    ) {
        Ok(())
    } else {
        Err(ApiError::Forbidden(
            "You do not have authority to review this report".to_string(),
        ))
    }
}

/// Outcome of settling a completion report
#[derive(Debug, Clone)]
pub struct ReportSettlement {
    /// The settled report
    pub report: Report,

    /// The linked task after settlement (completed on approval)
    pub task: Task,

    /// Whether the on-time bonus was awarded (always false on rejection)
    pub on_time_bonus: bool,
}

/// Settles a completion report in a single transaction
///
/// Caller has already validated the decision and checked eligibility.
/// Locks the report and task rows, stamps the terminal status guarded on
/// pending, awards the reviewer, and on approval completes the task and
/// awards the submitter.
pub async fn settle_report(
    pool: &PgPool,
    report_id: Uuid,
    reviewer_id: Uuid,
    decision: ReviewDecision,
    notes: Option<&str>,
) -> Result<ReportSettlement, ApiError> {
    let mut tx = pool.begin().await.map_err(ApiError::from)?;

    let report = Report::find_by_id_for_update(&mut tx, report_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Report not found".to_string()))?;

    if report.status != ReportStatus::Pending {
        return Err(ApiError::Conflict(
            "Report has already been reviewed".to_string(),
        ));
    }

    let task = Task::find_by_id_for_update(&mut tx, report.task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task for this report not found".to_string()))?;

    let settled = Report::mark_reviewed_tx(
        &mut tx,
        report.id,
        decision.as_report_status(),
        reviewer_id,
        notes,
    )
    .await?
    .ok_or_else(|| ApiError::Conflict("Report has already been reviewed".to_string()))?;

    User::add_points_tx(&mut tx, reviewer_id, REVIEWER_POINTS).await?;

    let mut on_time_bonus = false;
    let task = if decision == ReviewDecision::Approved {
        let on_time = is_on_time(settled.submitted_at, task.due_date);
        on_time_bonus = on_time;

        User::add_points_tx(&mut tx, settled.submitted_by, submitter_points(on_time)).await?;

        if task.status != TaskStatus::Completed {
            Task::set_status_tx(&mut tx, &task, TaskStatus::Completed).await?
        } else {
            task
        }
    } else {
        task
    };

    tx.commit().await.map_err(ApiError::from)?;

    Ok(ReportSettlement {
        report: settled,
        task,
        on_time_bonus,
    })
}

/// Outcome of settling a leadership report
#[derive(Debug, Clone)]
pub struct LeadershipSettlement {
    /// The settled leadership report
    pub report: LeadershipReport,

    /// The linked task after settlement, if the report had one
    pub task: Option<Task>,

    /// Whether the on-time bonus was awarded
    pub on_time_bonus: bool,
}

/// Settles a leadership report in a single transaction
///
/// Only the exact `submitted_to` user may review; the role check
/// ([`can_review_leadership`]) and the identity check both happen here
/// against the locked row. Submitter awards require a linked task: a
/// taskless approval pays only the reviewer fee.
pub async fn settle_leadership_report(
    pool: &PgPool,
    report_id: Uuid,
    reviewer: &User,
    decision: ReviewDecision,
    notes: Option<&str>,
) -> Result<LeadershipSettlement, ApiError> {
    if !can_review_leadership(reviewer.role) {
        return Err(ApiError::Forbidden(
            "Your role cannot review leadership reports".to_string(),
        ));
    }

    let mut tx = pool.begin().await.map_err(ApiError::from)?;

    let report = LeadershipReport::find_by_id_for_update(&mut tx, report_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Leadership report not found".to_string()))?;

    if report.submitted_to != reviewer.id {
        return Err(ApiError::Forbidden(
            "This leadership report is not addressed to you".to_string(),
        ));
    }

    if report.status != ReportStatus::Pending {
        return Err(ApiError::Conflict(
            "Leadership report has already been reviewed".to_string(),
        ));
    }

    let settled =
        LeadershipReport::mark_reviewed_tx(&mut tx, report.id, decision.as_report_status(), notes)
            .await?
            .ok_or_else(|| {
                ApiError::Conflict("Leadership report has already been reviewed".to_string())
            })?;

    User::add_points_tx(&mut tx, reviewer.id, REVIEWER_POINTS).await?;

    let mut on_time_bonus = false;
    let mut settled_task = None;

    if decision == ReviewDecision::Approved {
        let task = match settled.task_id {
            Some(task_id) => Task::find_by_id_for_update(&mut tx, task_id).await?,
            None => None,
        };

        if let Some(t) = task {
            let on_time = is_on_time(settled.submitted_at, t.due_date);
            on_time_bonus = on_time;
            User::add_points_tx(&mut tx, settled.submitted_by, submitter_points(on_time)).await?;

            settled_task = Some(if t.status != TaskStatus::Completed {
                Task::set_status_tx(&mut tx, &t, TaskStatus::Completed).await?
            } else {
                t
            });
        }
    }

    tx.commit().await.map_err(ApiError::from)?;

    Ok(LeadershipSettlement {
        report: settled,
        task: settled_task,
        on_time_bonus,
    })
}

/// Moves a report's task from in_progress to in_review
///
/// Reviewer eligibility is the caller's responsibility (same rules as the
/// review itself). The task row is locked so the status check and the
/// transition are atomic.
pub async fn set_task_under_review(pool: &PgPool, task_id: Uuid) -> Result<Task, ApiError> {
    let mut tx = pool.begin().await.map_err(ApiError::from)?;

    let task = Task::find_by_id_for_update(&mut tx, task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    match task.status {
        TaskStatus::InReview => {
            return Err(ApiError::Conflict(
                "Task is already under review".to_string(),
            ))
        }
        TaskStatus::InProgress => {}
        other => {
            return Err(ApiError::Conflict(format!(
                "Task must be in progress to move under review (currently {})",
                other.as_str()
            )))
        }
    }

    let updated = Task::set_status_tx(&mut tx, &task, TaskStatus::InReview).await?;
    tx.commit().await.map_err(ApiError::from)?;

    Ok(updated)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn test_on_time_boundary_is_inclusive() {
        let due = Utc::now();
        assert!(is_on_time(due - Duration::hours(1), due));
        assert!(is_on_time(due, due));
        assert!(!is_on_time(due + Duration::seconds(1), due));
    }

    #[test]
    fn test_submitter_points() {
        assert_eq!(submitter_points(true), 15);
        assert_eq!(submitter_points(false), 10);
    }

    #[test]
    fn test_rejection_requires_notes() {
        assert!(validate_review("rejected", None).is_err());
        assert!(validate_review("rejected", Some("")).is_err());
        assert!(validate_review("rejected", Some("   ")).is_err());

        let (decision, notes) = validate_review("rejected", Some("needs detail")).unwrap();
        assert_eq!(decision, ReviewDecision::Rejected);
        assert_eq!(notes.as_deref(), Some("needs detail"));
    }

    #[test]
    fn test_approval_notes_optional() {
        let (decision, notes) = validate_review("approved", None).unwrap();
        assert_eq!(decision, ReviewDecision::Approved);
        assert!(notes.is_none());

        let (_, notes) = validate_review("approved", Some("nice work")).unwrap();
        assert_eq!(notes.as_deref(), Some("nice work"));
    }

    #[test]
    fn test_invalid_decision_rejected() {
        assert!(validate_review("pending", None).is_err());
        assert!(validate_review("escalated", Some("notes")).is_err());
    }

    #[test]
    fn test_executives_always_eligible() {
        for role in [UserRole::Ceo, UserRole::Coo, UserRole::Cto] {
            assert!(can_review_report(role, None, None, None, &[]));
        }
    }

    #[test]
    fn test_department_head_scope() {
        let dept_a = Uuid::new_v4();
        let dept_b = Uuid::new_v4();

        assert!(can_review_report(
            UserRole::DepartmentHead,
            Some(dept_a),
            Some(dept_a),
            None,
            &[],
        ));
        assert!(!can_review_report(
            UserRole::DepartmentHead,
            Some(dept_a),
            Some(dept_b),
            None,
            &[],
        ));
        // No department on either side means no scope match
        assert!(!can_review_report(
            UserRole::DepartmentHead,
            None,
            None,
            None,
            &[],
        ));
    }

    #[test]
    fn test_team_lead_scope() {
        let led = Uuid::new_v4();
        let other = Uuid::new_v4();

        assert!(can_review_report(
            UserRole::TeamLead,
            None,
            None,
            Some(led),
            &[led],
        ));
        assert!(!can_review_report(
            UserRole::TeamLead,
            None,
            None,
            Some(other),
            &[led],
        ));
        assert!(!can_review_report(
            UserRole::TeamLead,
            None,
            None,
            None,
            &[led],
        ));
    }

    #[test]
    fn test_members_never_eligible() {
        let team = Uuid::new_v4();
        assert!(!can_review_report(
            UserRole::Member,
            Some(Uuid::new_v4()),
            Some(Uuid::new_v4()),
            Some(team),
            &[team],
        ));
        assert!(!can_review_report(UserRole::Cfo, None, None, None, &[]));
    }

    #[test]
    fn test_leadership_review_roles() {
        assert!(can_review_leadership(UserRole::DepartmentHead));
        assert!(can_review_leadership(UserRole::ProjectManager));
        assert!(can_review_leadership(UserRole::Ceo));
        assert!(!can_review_leadership(UserRole::TeamLead));
        assert!(!can_review_leadership(UserRole::Member));
        assert!(!can_review_leadership(UserRole::HrManager));
    }
}
