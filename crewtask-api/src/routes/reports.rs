/// Review and settlement endpoints
///
/// Reviewers settle completion reports and leadership reports. Settlement
/// is the only path that awards points; the rules live in
/// [`crate::settlement`].
///
/// # Endpoints
///
/// - `PATCH /reports/{id}/review` - Approve or reject a completion report
/// - `PATCH /reports/{id}/set-under-review` - Pull the report's task into review
/// - `PATCH /reports/leadership-reports/{id}/review` - Settle a leadership report
/// - `GET /reports/pending-reviews` - Reports the caller may review
/// - `GET /reports/my-reviews` - Reports the caller settled
/// - `GET /reports/stats/review-summary` - Caller's review counts
/// - `GET /reports/leadership-reports/pending` / `/reviewed`
/// - `GET /reports/check-dual-role`

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    notify::{dispatch, DispatchStatus, Notification, NotificationKind},
    routes::current_user,
    settlement,
};
use axum::{
    extract::{Path, State},
    Extension, Json,
};
use crewtask_shared::{
    auth::middleware::AuthContext,
    directory,
    models::{
        leadership_report::LeadershipReport,
        report::Report,
        task::Task,
        user::{User, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;

/// Review request body
#[derive(Debug, Deserialize)]
pub struct ReviewRequest {
    /// "approved" or "rejected"
    pub status: String,

    /// Reviewer's notes; required when rejecting
    pub review_notes: Option<String>,
}

/// Settled completion report response
#[derive(Debug, Serialize)]
pub struct ReviewResponse {
    /// The settled report
    pub report: Report,

    /// The linked task after settlement
    pub task: Task,

    /// Whether the on-time bonus was part of the submitter's award
    pub on_time_bonus: bool,

    /// Notification outcome ("sent", "skipped", "error")
    pub notification: String,
}

/// Settled leadership report response
#[derive(Debug, Serialize)]
pub struct LeadershipReviewResponse {
    /// The settled leadership report
    pub report: LeadershipReport,

    /// The linked task after settlement, if any
    #[serde(skip_serializing_if = "Option::is_none")]
    pub task: Option<Task>,

    /// Whether the on-time bonus was awarded
    pub on_time_bonus: bool,

    /// Notification outcome
    pub notification: String,
}

/// Settles a completion report
///
/// Validation (including the rejection-requires-notes rule) happens before
/// any mutation; eligibility is checked against the submitter's position in
/// the org; the settlement itself is one transaction. The submitter is
/// notified after commit, best-effort.
pub async fn review_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<ReviewResponse>> {
    let (decision, notes) = settlement::validate_review(&req.status, req.review_notes.as_deref())?;

    let reviewer = current_user(&state, &auth).await?;

    let report = Report::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Report not found".to_string()))?;

    let submitter = User::find_by_id(&state.db, report.submitted_by)
        .await?
        .ok_or_else(|| ApiError::NotFound("Report submitter not found".to_string()))?;

    settlement::ensure_review_authority(&state.db, &reviewer, &submitter).await?;

    let outcome =
        settlement::settle_report(&state.db, id, reviewer.id, decision, notes.as_deref()).await?;

    let notification = dispatch(
        state.notifier.as_ref(),
        Notification {
            kind: NotificationKind::ReportReviewed,
            recipient_email: submitter.email.clone(),
            recipient_name: submitter.full_name.clone(),
            variables: json!({
                "task_title": outcome.task.title,
                "status": outcome.report.status.as_str(),
                "reviewer": reviewer.full_name,
                "review_notes": outcome.report.review_notes,
            }),
        },
    )
    .await;

    Ok(Json(ReviewResponse {
        report: outcome.report,
        task: outcome.task,
        on_time_bonus: outcome.on_time_bonus,
        notification: notification.as_str().to_string(),
    }))
}

/// Settles a leadership report
///
/// Only the exact `submitted_to` user may review. A self-reviewed report
/// (dual-role department head at team level) sends no notification.
pub async fn review_leadership_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<ReviewRequest>,
) -> ApiResult<Json<LeadershipReviewResponse>> {
    let (decision, notes) = settlement::validate_review(&req.status, req.review_notes.as_deref())?;

    let reviewer = current_user(&state, &auth).await?;

    let outcome =
        settlement::settle_leadership_report(&state.db, id, &reviewer, decision, notes.as_deref())
            .await?;

    let notification = if outcome.report.submitted_by == reviewer.id {
        // Self-review settles silently
        DispatchStatus::Skipped
    } else {
        match User::find_by_id(&state.db, outcome.report.submitted_by).await? {
            Some(submitter) => {
                dispatch(
                    state.notifier.as_ref(),
                    Notification {
                        kind: NotificationKind::LeadershipReportReviewed,
                        recipient_email: submitter.email,
                        recipient_name: submitter.full_name,
                        variables: json!({
                            "status": outcome.report.status.as_str(),
                            "reviewer": reviewer.full_name,
                            "review_notes": outcome.report.review_notes,
                        }),
                    },
                )
                .await
            }
            None => DispatchStatus::Skipped,
        }
    };

    Ok(Json(LeadershipReviewResponse {
        report: outcome.report,
        task: outcome.task,
        on_time_bonus: outcome.on_time_bonus,
        notification: notification.as_str().to_string(),
    }))
}

/// Pulls a report's task from in_progress into in_review
///
/// Same eligibility as reviewing the report itself.
pub async fn set_under_review(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let reviewer = current_user(&state, &auth).await?;

    let report = Report::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Report not found".to_string()))?;

    let submitter = User::find_by_id(&state.db, report.submitted_by)
        .await?
        .ok_or_else(|| ApiError::NotFound("Report submitter not found".to_string()))?;

    settlement::ensure_review_authority(&state.db, &reviewer, &submitter).await?;

    let task = settlement::set_task_under_review(&state.db, report.task_id).await?;

    Ok(Json(task))
}

/// Lists pending reports within the caller's review scope
///
/// Executives see every pending report; department heads their
/// department's; team leads and project managers those from teams they
/// lead.
pub async fn pending_reviews(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Report>>> {
    let caller = current_user(&state, &auth).await?;

    let reports = if caller.role.is_executive() {
        Report::list_pending(&state.db).await?
    } else {
        match caller.role {
            UserRole::DepartmentHead => match caller.department_id {
                Some(department_id) => {
                    Report::list_pending_for_department(&state.db, department_id).await?
                }
                None => Vec::new(),
            },
            UserRole::TeamLead | UserRole::ProjectManager => {
                let teams = directory::teams_led_by(&state.db, caller.id).await?;
                if teams.is_empty() {
                    Vec::new()
                } else {
                    Report::list_pending_for_teams(&state.db, &teams).await?
                }
            }
            _ => {
                return Err(ApiError::Forbidden(
                    "Your role cannot review reports".to_string(),
                ))
            }
        }
    };

    Ok(Json(reports))
}

/// Lists reports the caller has settled
pub async fn my_reviews(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Report>>> {
    let caller = current_user(&state, &auth).await?;
    let reports = Report::list_reviewed_by(&state.db, caller.id).await?;
    Ok(Json(reports))
}

/// Caller's settled-review counts grouped by outcome
pub async fn review_summary(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<HashMap<String, i64>>> {
    let caller = current_user(&state, &auth).await?;

    let summary = Report::review_summary(&state.db, caller.id)
        .await?
        .into_iter()
        .map(|(status, count)| (status.as_str().to_string(), count))
        .collect();

    Ok(Json(summary))
}

/// Dual-role check response
#[derive(Debug, Serialize)]
pub struct DualRoleResponse {
    /// Whether the caller is a department head who also leads a team
    pub is_dual_role: bool,
}

/// Checks whether the caller holds the dual department-head/team-lead role
///
/// Dual-role heads must pick a review level when submitting leadership
/// reports; clients use this to decide whether to ask.
pub async fn check_dual_role(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<DualRoleResponse>> {
    let caller = current_user(&state, &auth).await?;
    let is_dual_role = directory::is_dual_role(&state.db, &caller).await?;
    Ok(Json(DualRoleResponse { is_dual_role }))
}

/// Lists pending leadership reports addressed to the caller
pub async fn pending_leadership_reports(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<LeadershipReport>>> {
    let caller = current_user(&state, &auth).await?;
    let reports = LeadershipReport::list_for_reviewer(&state.db, caller.id, true).await?;
    Ok(Json(reports))
}

/// Lists settled leadership reports addressed to the caller
pub async fn reviewed_leadership_reports(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<LeadershipReport>>> {
    let caller = current_user(&state, &auth).await?;
    let reports = LeadershipReport::list_for_reviewer(&state.db, caller.id, false).await?;
    Ok(Json(reports))
}
