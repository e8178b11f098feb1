/// Report submission and performance endpoints
///
/// Task owners submit completion reports here; management roles submit
/// leadership reports. Reviewer resolution lives in [`crate::routing`].
/// The rest of the surface is read-only: stats, listings, leaderboard,
/// analytics.
///
/// # Endpoints
///
/// - `POST /performance/submit-report` - Completion report for an owned task
/// - `POST /performance/submit-leadership-report` - Upward status report
/// - `GET /performance/leadership-tasks` - Tasks eligible for a leadership report
/// - `GET /performance/stats` - Caller's points/task/report summary
/// - `GET /performance/tasks` - Caller's tasks (filters)
/// - `GET /performance/reports` - Caller's submitted reports
/// - `GET /performance/pending-tasks` - Caller's tasks awaiting a report
/// - `GET /performance/leaderboard` - Top users by points
/// - `GET /performance/analytics/trends` - Weekly completion counts
/// - `GET /performance/analytics/task-categories` - Counts per category
/// - `GET /performance/analytics/department-comparison` - Per-department rollup

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    notify::{dispatch, DispatchStatus, Notification, NotificationKind},
    routes::current_user,
    routing::{self, LeadershipReviewer, ReviewLevel},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use crewtask_shared::{
    auth::middleware::AuthContext,
    models::{
        analytics,
        leadership_report::{CreateLeadershipReport, LeadershipReport},
        report::{CreateReport, Report},
        task::{Task, TaskStatus},
        user::User,
    },
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// Completion report submission
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitReportRequest {
    /// Task being reported on
    pub task_id: Uuid,

    /// Report body
    #[validate(length(min = 1, message = "Report content must not be empty"))]
    pub content: String,
}

/// Leadership report submission
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitLeadershipReportRequest {
    /// Report body
    #[validate(length(min = 1, message = "Report content must not be empty"))]
    pub content: String,

    /// Linked task, if the report covers a specific task
    pub task_id: Option<Uuid>,

    /// Covered period (free text, e.g. "2025-W02")
    #[validate(length(max = 100, message = "Report period must be at most 100 characters"))]
    pub report_period: Option<String>,

    /// "team" or "leadership"; required for dual-role department heads
    pub review_level: Option<String>,
}

/// Submission response
#[derive(Debug, Serialize)]
pub struct SubmitReportResponse {
    /// The created report
    pub report: Report,

    /// Notification outcome ("sent", "skipped", "error")
    pub notification: String,
}

/// Leadership submission response
#[derive(Debug, Serialize)]
pub struct SubmitLeadershipReportResponse {
    /// The created leadership report
    pub report: LeadershipReport,

    /// Notification outcome
    pub notification: String,
}

fn parse_review_level(raw: Option<&str>) -> Result<Option<ReviewLevel>, ApiError> {
    match raw {
        None => Ok(None),
        Some(s) => ReviewLevel::parse(s).map(Some).ok_or_else(|| {
            ApiError::validation("review_level", "review_level must be \"team\" or \"leadership\"")
        }),
    }
}

/// Submits a completion report for an owned task
///
/// The task must be in progress or in review, and carry no report yet.
/// The reviewer (team lead, else department head) is notified after
/// commit; a missing reviewer skips the notification but the submission
/// still succeeds.
pub async fn submit_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SubmitReportRequest>,
) -> ApiResult<Json<SubmitReportResponse>> {
    req.validate()?;

    let caller = current_user(&state, &auth).await?;

    let task = Task::find_by_id(&state.db, req.task_id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if task.assigned_to != caller.id {
        return Err(ApiError::Forbidden(
            "You can only report on your own tasks".to_string(),
        ));
    }

    if !task.status.accepts_report() {
        return Err(ApiError::Conflict(format!(
            "Cannot submit a report for a {} task",
            task.status.as_str()
        )));
    }

    if Report::find_by_task(&state.db, task.id).await?.is_some() {
        return Err(ApiError::Conflict(
            "A report already exists for this task".to_string(),
        ));
    }

    // A racing double submission past the check above is caught by the
    // unique index and mapped to Conflict.
    let mut tx = state.db.begin().await.map_err(ApiError::from)?;
    let report = Report::create_tx(
        &mut tx,
        CreateReport {
            task_id: task.id,
            submitted_by: caller.id,
            content: req.content,
        },
    )
    .await?;
    tx.commit().await.map_err(ApiError::from)?;

    let notification = match routing::resolve_report_reviewer(&state.db, &caller).await? {
        Some(reviewer) => {
            dispatch(
                state.notifier.as_ref(),
                Notification {
                    kind: NotificationKind::ReportSubmitted,
                    recipient_email: reviewer.email,
                    recipient_name: reviewer.full_name,
                    variables: json!({
                        "task_title": task.title,
                        "submitted_by": caller.full_name,
                    }),
                },
            )
            .await
        }
        None => DispatchStatus::Skipped,
    };

    Ok(Json(SubmitReportResponse {
        report,
        notification: notification.as_str().to_string(),
    }))
}

/// Submits a leadership report
///
/// The reviewer is fixed at submission time by the routing table. A linked
/// task must belong to the submitter, be neither completed nor cancelled,
/// and carry no leadership report yet; a pending linked task moves to
/// in_progress with the submission.
pub async fn submit_leadership_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<SubmitLeadershipReportRequest>,
) -> ApiResult<Json<SubmitLeadershipReportResponse>> {
    req.validate()?;

    let caller = current_user(&state, &auth).await?;
    if !caller.role.can_submit_leadership_report() {
        return Err(ApiError::Forbidden(
            "Your role may not submit leadership reports".to_string(),
        ));
    }

    let review_level = parse_review_level(req.review_level.as_deref())?;

    let task = match req.task_id {
        Some(task_id) => {
            let task = Task::find_by_id(&state.db, task_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

            if task.assigned_to != caller.id {
                return Err(ApiError::Forbidden(
                    "You can only report on your own tasks".to_string(),
                ));
            }
            if matches!(task.status, TaskStatus::Completed | TaskStatus::Cancelled) {
                return Err(ApiError::Conflict(format!(
                    "Cannot submit a leadership report for a {} task",
                    task.status.as_str()
                )));
            }
            if LeadershipReport::find_by_task(&state.db, task.id)
                .await?
                .is_some()
            {
                return Err(ApiError::Conflict(
                    "A leadership report already exists for this task".to_string(),
                ));
            }
            Some(task)
        }
        None => None,
    };

    let reviewer = routing::resolve_leadership_reviewer(&state.db, &caller, review_level).await?;
    let submitted_to = reviewer.reviewer_id(&caller);

    let mut tx = state.db.begin().await.map_err(ApiError::from)?;
    let report = LeadershipReport::create_tx(
        &mut tx,
        CreateLeadershipReport {
            task_id: task.as_ref().map(|t| t.id),
            submitted_by: caller.id,
            submitted_to,
            content: req.content,
            report_period: req.report_period,
        },
    )
    .await?;

    if let Some(task) = &task {
        if task.status == TaskStatus::Pending {
            Task::set_status_tx(&mut tx, task, TaskStatus::InProgress).await?;
        }
    }
    tx.commit().await.map_err(ApiError::from)?;

    let notification = match reviewer {
        // A self-review generates no notification
        LeadershipReviewer::SelfReview => DispatchStatus::Skipped,
        LeadershipReviewer::Reviewer(reviewer) => {
            dispatch(
                state.notifier.as_ref(),
                Notification {
                    kind: NotificationKind::LeadershipReportSubmitted,
                    recipient_email: reviewer.email,
                    recipient_name: reviewer.full_name,
                    variables: json!({
                        "submitted_by": caller.full_name,
                        "report_period": report.report_period,
                    }),
                },
            )
            .await
        }
    };

    Ok(Json(SubmitLeadershipReportResponse {
        report,
        notification: notification.as_str().to_string(),
    }))
}

/// Review-level query parameter
#[derive(Debug, Default, Deserialize)]
pub struct LeadershipTasksQuery {
    /// "team" or "leadership" (dual-role department heads)
    pub review_level: Option<String>,
}

/// Lists the caller's tasks eligible for a leadership report
///
/// Reverse of the routing table: the tasks shown are those assigned to the
/// caller by the party they report to, in progress or completed, with no
/// leadership report yet. A dual-role head at team level gets an empty
/// list.
pub async fn leadership_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<LeadershipTasksQuery>,
) -> ApiResult<Json<Vec<Task>>> {
    let caller = current_user(&state, &auth).await?;
    let review_level = parse_review_level(query.review_level.as_deref())?;

    let tasks = match routing::leadership_task_assigner(&state.db, &caller, review_level).await? {
        Some(assigner) => Task::leadership_candidates(&state.db, caller.id, assigner.id).await?,
        None => Vec::new(),
    };

    Ok(Json(tasks))
}

/// Caller's performance summary
#[derive(Debug, Serialize)]
pub struct PerformanceStats {
    /// Accumulated points
    pub points: i32,

    /// Task counts by status
    pub tasks: HashMap<String, i64>,

    /// Submitted-report counts by status
    pub reports: HashMap<String, i64>,
}

/// Caller's points, task, and report summary
pub async fn stats(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<PerformanceStats>> {
    let caller = current_user(&state, &auth).await?;

    let tasks = Task::count_by_status_for_owner(&state.db, caller.id)
        .await?
        .into_iter()
        .map(|(status, count)| (status.as_str().to_string(), count))
        .collect();

    let mut reports: HashMap<String, i64> = HashMap::new();
    for report in Report::list_by_submitter(&state.db, caller.id).await? {
        *reports
            .entry(report.status.as_str().to_string())
            .or_insert(0) += 1;
    }

    Ok(Json(PerformanceStats {
        points: caller.points,
        tasks,
        reports,
    }))
}

/// Listing filters
#[derive(Debug, Default, Deserialize)]
pub struct TaskFilter {
    /// Status filter
    pub status: Option<String>,

    /// Category filter
    pub category: Option<String>,
}

/// Lists the caller's tasks with optional filters
pub async fn tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<Vec<Task>>> {
    let caller = current_user(&state, &auth).await?;

    let status = match filter.status.as_deref() {
        None => None,
        Some(s) => Some(
            TaskStatus::parse(s)
                .ok_or_else(|| ApiError::validation("status", "Unknown task status"))?,
        ),
    };

    let tasks =
        Task::list_by_owner(&state.db, caller.id, status, filter.category.as_deref()).await?;

    Ok(Json(tasks))
}

/// Lists the caller's submitted reports
pub async fn reports(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Report>>> {
    let caller = current_user(&state, &auth).await?;
    let reports = Report::list_by_submitter(&state.db, caller.id).await?;
    Ok(Json(reports))
}

/// Lists the caller's tasks still awaiting a completion report
pub async fn pending_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<Task>>> {
    let caller = current_user(&state, &auth).await?;
    let tasks = Task::pending_report_tasks(&state.db, caller.id).await?;
    Ok(Json(tasks))
}

/// Leaderboard query parameters
#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    /// Maximum entries to return (default 10)
    pub limit: Option<i64>,
}

/// Leaderboard entry
#[derive(Debug, Serialize)]
pub struct LeaderboardEntry {
    /// User ID
    pub user_id: Uuid,

    /// Display name
    pub full_name: String,

    /// Role string
    pub role: String,

    /// Accumulated points
    pub points: i32,
}

/// Top users by points
pub async fn leaderboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<Vec<LeaderboardEntry>>> {
    current_user(&state, &auth).await?;

    let limit = query.limit.unwrap_or(10).clamp(1, 100);
    let users = User::leaderboard(&state.db, limit).await?;

    let entries = users
        .into_iter()
        .map(|u| LeaderboardEntry {
            user_id: u.id,
            full_name: u.full_name,
            role: u.role.as_str().to_string(),
            points: u.points,
        })
        .collect();

    Ok(Json(entries))
}

/// Weekly completed-task counts for the caller
pub async fn analytics_trends(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<analytics::WeeklyCompletion>>> {
    let caller = current_user(&state, &auth).await?;
    let trends = analytics::weekly_completions(&state.db, caller.id, 12).await?;
    Ok(Json(trends))
}

/// Task counts per category for the caller
pub async fn analytics_task_categories(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<analytics::CategoryCount>>> {
    let caller = current_user(&state, &auth).await?;
    let counts = analytics::category_counts(&state.db, caller.id).await?;
    Ok(Json(counts))
}

/// Per-department completion comparison (manager-class only)
pub async fn analytics_department_comparison(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<analytics::DepartmentStats>>> {
    let caller = current_user(&state, &auth).await?;
    if !caller.role.is_manager() {
        return Err(ApiError::Forbidden(
            "Only managers may view the department comparison".to_string(),
        ));
    }

    let stats = analytics::department_comparison(&state.db).await?;
    Ok(Json(stats))
}
