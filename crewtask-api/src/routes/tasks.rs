/// Task registry endpoints
///
/// Managers create, edit, and delete tasks; owners and managers move them
/// through the status state machine. Non-executive managers must assign
/// into the assignee team's weekly milestone; executives may create
/// milestone-less tasks.
///
/// # Endpoints
///
/// - `POST /tasks/create` - Assign a task to one or more users
/// - `GET /tasks/my-tasks` - Caller's tasks (filters: status, category)
/// - `GET /tasks/assigned-tasks` - Tasks the caller assigned
/// - `GET /tasks/members` - Users the caller may assign to
/// - `GET /tasks/stats/overview` - Status counts for the caller's scope
/// - `GET /tasks/categories/list` - Distinct categories
/// - `GET/PUT/DELETE /tasks/{id}` - Single task
/// - `PATCH /tasks/{id}/status` - Status transition

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
    notify::{dispatch, DispatchStatus, Notification, NotificationKind},
    routes::current_user,
};
use axum::{
    extract::{Path, Query, State},
    Extension, Json,
};
use chrono::{DateTime, Utc};
use crewtask_shared::{
    auth::middleware::AuthContext,
    directory,
    models::{
        milestone::Milestone,
        task::{CreateTask, Task, TaskStatus, UpdateTask},
        user::{User, UserRole},
    },
};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::HashMap;
use uuid::Uuid;
use validator::Validate;

/// Task creation request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTasksRequest {
    /// Task title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: String,

    /// Longer description
    pub description: Option<String>,

    /// Category (defaults to "general")
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,

    /// Deadline
    pub due_date: DateTime<Utc>,

    /// Users to assign the task to (one task row each)
    #[validate(length(min = 1, message = "At least one assignee is required"))]
    pub assigned_user_ids: Vec<Uuid>,
}

/// Task creation response
#[derive(Debug, Serialize)]
pub struct CreateTasksResponse {
    /// One created task per assignee
    pub tasks: Vec<Task>,

    /// Aggregate notification outcome
    pub notification: String,
}

/// Status update request
#[derive(Debug, Deserialize)]
pub struct UpdateStatusRequest {
    /// Target status string
    pub status: String,
}

/// Task edit request
#[derive(Debug, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    /// New title
    #[validate(length(min = 1, max = 255, message = "Title must be 1-255 characters"))]
    pub title: Option<String>,

    /// New description
    pub description: Option<String>,

    /// New category
    #[validate(length(max = 100, message = "Category must be at most 100 characters"))]
    pub category: Option<String>,

    /// New deadline
    pub due_date: Option<DateTime<Utc>>,
}

/// Listing filters
#[derive(Debug, Default, Deserialize)]
pub struct TaskFilter {
    /// Status filter
    pub status: Option<String>,

    /// Category filter
    pub category: Option<String>,
}

fn parse_status_filter(filter: &TaskFilter) -> Result<Option<TaskStatus>, ApiError> {
    match filter.status.as_deref() {
        None => Ok(None),
        Some(s) => TaskStatus::parse(s)
            .map(Some)
            .ok_or_else(|| ApiError::validation("status", "Unknown task status")),
    }
}

/// Resolves the milestone a task for `assignee` counts against
///
/// Executives assign without a milestone. Everyone else resolves the
/// assignee team's current-week milestone (falling back to the team's most
/// recent); a missing team or milestone is a 404.
async fn resolve_milestone(
    state: &AppState,
    caller: &User,
    assignee_id: Uuid,
) -> Result<Option<Uuid>, ApiError> {
    if caller.role.is_executive() {
        return Ok(None);
    }

    let team = directory::team_of(&state.db, assignee_id)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("Assignee does not belong to a team with milestones".to_string())
        })?;

    let milestone = Milestone::current_for_team(&state.db, team.id, Utc::now().date_naive())
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("No milestone exists for the assignee's team".to_string())
        })?;

    Ok(Some(milestone.id))
}

/// Creates one task per assignee
///
/// Manager-class only. Task rows and milestone total increments commit in
/// one transaction; assignment notifications go out after commit,
/// best-effort.
pub async fn create_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Json(req): Json<CreateTasksRequest>,
) -> ApiResult<Json<CreateTasksResponse>> {
    req.validate()?;

    let caller = current_user(&state, &auth).await?;
    if !caller.role.is_manager() {
        return Err(ApiError::Forbidden(
            "Only managers may create tasks".to_string(),
        ));
    }

    let category = req.category.unwrap_or_else(|| "general".to_string());

    // Resolve assignees and their milestones before opening the transaction
    let mut assignees = Vec::with_capacity(req.assigned_user_ids.len());
    for assignee_id in &req.assigned_user_ids {
        let assignee = User::find_by_id(&state.db, *assignee_id)
            .await?
            .filter(|u| u.is_active)
            .ok_or_else(|| ApiError::NotFound(format!("Assignee {} not found", assignee_id)))?;
        let milestone_id = resolve_milestone(&state, &caller, assignee.id).await?;
        assignees.push((assignee, milestone_id));
    }

    let mut tx = state.db.begin().await.map_err(ApiError::from)?;
    let mut tasks = Vec::with_capacity(assignees.len());
    let mut milestone_counts: HashMap<Uuid, i32> = HashMap::new();

    for (assignee, milestone_id) in &assignees {
        let task = Task::create_tx(
            &mut tx,
            CreateTask {
                title: req.title.clone(),
                description: req.description.clone(),
                category: category.clone(),
                assigned_to: assignee.id,
                assigned_by: caller.id,
                milestone_id: *milestone_id,
                due_date: req.due_date,
            },
        )
        .await?;

        if let Some(milestone_id) = milestone_id {
            *milestone_counts.entry(*milestone_id).or_insert(0) += 1;
        }
        tasks.push(task);
    }

    for (milestone_id, count) in &milestone_counts {
        Milestone::add_tasks_tx(&mut tx, *milestone_id, *count).await?;
    }

    tx.commit().await.map_err(ApiError::from)?;

    // Post-commit, best-effort
    let mut notification = DispatchStatus::Sent;
    for (assignee, _) in &assignees {
        let status = dispatch(
            state.notifier.as_ref(),
            Notification {
                kind: NotificationKind::TaskAssigned,
                recipient_email: assignee.email.clone(),
                recipient_name: assignee.full_name.clone(),
                variables: json!({
                    "task_title": req.title,
                    "due_date": req.due_date,
                    "assigned_by": caller.full_name,
                }),
            },
        )
        .await;
        if status == DispatchStatus::Error {
            notification = DispatchStatus::Error;
        }
    }

    Ok(Json(CreateTasksResponse {
        tasks,
        notification: notification.as_str().to_string(),
    }))
}

/// Fetches a single task (owner, assigner, or any manager)
pub async fn get_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Task>> {
    let caller = current_user(&state, &auth).await?;
    let task = Task::find_by_id(&state.db, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if task.assigned_to != caller.id && task.assigned_by != caller.id && !caller.role.is_manager() {
        return Err(ApiError::Forbidden(
            "You do not have access to this task".to_string(),
        ));
    }

    Ok(Json(task))
}

/// Edits task fields (manager-class only)
pub async fn update_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateTaskRequest>,
) -> ApiResult<Json<Task>> {
    req.validate()?;

    let caller = current_user(&state, &auth).await?;
    if !caller.role.is_manager() {
        return Err(ApiError::Forbidden(
            "Only managers may edit tasks".to_string(),
        ));
    }

    let task = Task::update(
        &state.db,
        id,
        UpdateTask {
            title: req.title,
            description: req.description.map(Some),
            category: req.category,
            due_date: req.due_date,
        },
    )
    .await?
    .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    Ok(Json(task))
}

/// Deletes a task and adjusts its milestone counters (manager-class only)
pub async fn delete_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<serde_json::Value>> {
    let caller = current_user(&state, &auth).await?;
    if !caller.role.is_manager() {
        return Err(ApiError::Forbidden(
            "Only managers may delete tasks".to_string(),
        ));
    }

    let mut tx = state.db.begin().await.map_err(ApiError::from)?;

    let task = Task::delete_tx(&mut tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if let Some(milestone_id) = task.milestone_id {
        Milestone::remove_task_tx(&mut tx, milestone_id, task.status == TaskStatus::Completed)
            .await?;
    }

    tx.commit().await.map_err(ApiError::from)?;

    Ok(Json(json!({ "deleted": task.id })))
}

/// Moves a task through the status state machine
///
/// The owner or any manager may transition. Cancelled is terminal;
/// transitions to the current status conflict. Side effects (timestamps,
/// milestone counters) apply inside one transaction.
pub async fn update_status(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<Uuid>,
    Json(req): Json<UpdateStatusRequest>,
) -> ApiResult<Json<Task>> {
    let new_status = TaskStatus::parse(&req.status)
        .ok_or_else(|| ApiError::validation("status", "Unknown task status"))?;

    let caller = current_user(&state, &auth).await?;

    let mut tx = state.db.begin().await.map_err(ApiError::from)?;

    let task = Task::find_by_id_for_update(&mut tx, id)
        .await?
        .ok_or_else(|| ApiError::NotFound("Task not found".to_string()))?;

    if task.assigned_to != caller.id && !caller.role.is_manager() {
        return Err(ApiError::Forbidden(
            "Only the task owner or a manager may change its status".to_string(),
        ));
    }

    if !task.status.can_transition_to(new_status) {
        return Err(ApiError::Conflict(format!(
            "Cannot move task from {} to {}",
            task.status.as_str(),
            new_status.as_str()
        )));
    }

    let updated = Task::set_status_tx(&mut tx, &task, new_status).await?;
    tx.commit().await.map_err(ApiError::from)?;

    Ok(Json(updated))
}

/// Lists the caller's own tasks
pub async fn my_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<Vec<Task>>> {
    let caller = current_user(&state, &auth).await?;
    let status = parse_status_filter(&filter)?;

    let tasks =
        Task::list_by_owner(&state.db, caller.id, status, filter.category.as_deref()).await?;

    Ok(Json(tasks))
}

/// Lists tasks the caller assigned (manager-class only)
pub async fn assigned_tasks(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(filter): Query<TaskFilter>,
) -> ApiResult<Json<Vec<Task>>> {
    let caller = current_user(&state, &auth).await?;
    if !caller.role.is_manager() {
        return Err(ApiError::Forbidden(
            "Only managers have assigned tasks".to_string(),
        ));
    }
    let status = parse_status_filter(&filter)?;

    let tasks = Task::list_by_assigner(&state.db, caller.id, status).await?;

    Ok(Json(tasks))
}

/// Lists the users the caller may assign tasks to
///
/// Executives see everyone, department heads their department, team leads
/// (and other managers) the members of teams they lead.
pub async fn assignable_members(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<User>>> {
    let caller = current_user(&state, &auth).await?;
    if !caller.role.is_manager() {
        return Err(ApiError::Forbidden(
            "Only managers may assign tasks".to_string(),
        ));
    }

    let members = if caller.role.is_executive() {
        User::list_active(&state.db).await?
    } else if caller.role == UserRole::DepartmentHead {
        match caller.department_id {
            Some(department_id) => User::list_by_department(&state.db, department_id).await?,
            None => Vec::new(),
        }
    } else {
        directory::members_of_led_teams(&state.db, caller.id).await?
    };

    Ok(Json(members))
}

/// Status-count overview for the caller
#[derive(Debug, Serialize)]
pub struct StatsOverview {
    /// Counts by status for tasks assigned to the caller
    pub own: HashMap<String, i64>,

    /// Counts by status for tasks the caller assigned (managers only)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assigned: Option<HashMap<String, i64>>,
}

/// Status counts for the caller's scope
pub async fn stats_overview(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<StatsOverview>> {
    let caller = current_user(&state, &auth).await?;

    let own = Task::count_by_status_for_owner(&state.db, caller.id)
        .await?
        .into_iter()
        .map(|(status, count)| (status.as_str().to_string(), count))
        .collect();

    let assigned = if caller.role.is_manager() {
        Some(
            Task::count_by_status_for_assigner(&state.db, caller.id)
                .await?
                .into_iter()
                .map(|(status, count)| (status.as_str().to_string(), count))
                .collect(),
        )
    } else {
        None
    };

    Ok(Json(StatsOverview { own, assigned }))
}

/// Lists the distinct task categories in use
pub async fn categories(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> ApiResult<Json<Vec<String>>> {
    current_user(&state, &auth).await?;
    let categories = Task::distinct_categories(&state.db).await?;
    Ok(Json(categories))
}
