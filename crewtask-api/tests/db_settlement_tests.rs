/// Database-backed settlement tests
///
/// These tests require a running PostgreSQL database and are skipped when
/// DATABASE_URL is not set. Run with:
/// DATABASE_URL=postgresql://... cargo test --test db_settlement_tests -- --test-threads=1
use chrono::{DateTime, Duration, Utc};
use crewtask_api::error::ApiError;
use crewtask_api::settlement::{settle_leadership_report, settle_report, ReviewDecision};
use crewtask_shared::db::migrations::run_migrations;
use crewtask_shared::db::pool::{create_pool, DatabaseConfig};
use crewtask_shared::models::leadership_report::{CreateLeadershipReport, LeadershipReport};
use crewtask_shared::models::report::{CreateReport, Report, ReportStatus};
use crewtask_shared::models::task::{CreateTask, Task, TaskStatus};
use crewtask_shared::models::user::{CreateUser, User, UserRole};
use sqlx::PgPool;
use std::env;
use uuid::Uuid;

async fn test_pool() -> Option<PgPool> {
    let url = match env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            eprintln!("DATABASE_URL not set; skipping database test");
            return None;
        }
    };

    let pool = create_pool(DatabaseConfig {
        url,
        max_connections: 5,
        ..Default::default()
    })
    .await
    .expect("Failed to create test pool");

    run_migrations(&pool).await.expect("Failed to run migrations");

    Some(pool)
}

async fn create_user(pool: &PgPool, role: UserRole) -> User {
    User::create(
        pool,
        CreateUser {
            email: format!("{}@example.com", Uuid::new_v4()),
            password_hash: "$argon2id$test".to_string(),
            full_name: "Test User".to_string(),
            role,
            department_id: None,
        },
    )
    .await
    .expect("Failed to create user")
}

async fn create_task(
    pool: &PgPool,
    assigned_to: Uuid,
    assigned_by: Uuid,
    due_date: DateTime<Utc>,
) -> Task {
    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let task = Task::create_tx(
        &mut tx,
        CreateTask {
            title: "Settlement test task".to_string(),
            description: None,
            category: "general".to_string(),
            assigned_to,
            assigned_by,
            milestone_id: None,
            due_date,
        },
    )
    .await
    .expect("Failed to create task");
    tx.commit().await.expect("Failed to commit");
    task
}

async fn create_report(pool: &PgPool, task_id: Uuid, submitted_by: Uuid) -> Report {
    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let report = Report::create_tx(
        &mut tx,
        CreateReport {
            task_id,
            submitted_by,
            content: "Work is done".to_string(),
        },
    )
    .await
    .expect("Failed to create report");
    tx.commit().await.expect("Failed to commit");
    report
}

async fn points_of(pool: &PgPool, id: Uuid) -> i32 {
    User::find_by_id(pool, id)
        .await
        .expect("Failed to load user")
        .expect("User not found")
        .points
}

#[tokio::test]
async fn test_second_report_for_task_conflicts() {
    let Some(pool) = test_pool().await else { return };

    let member = create_user(&pool, UserRole::Member).await;
    let lead = create_user(&pool, UserRole::TeamLead).await;
    let task = create_task(&pool, member.id, lead.id, Utc::now() + Duration::days(7)).await;

    create_report(&pool, task.id, member.id).await;

    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let err = Report::create_tx(
        &mut tx,
        CreateReport {
            task_id: task.id,
            submitted_by: member.id,
            content: "Submitted again".to_string(),
        },
    )
    .await
    .expect_err("Second report for the same task must be rejected");
    tx.rollback().await.expect("Failed to roll back");

    assert!(matches!(ApiError::from(err), ApiError::Conflict(_)));
}

#[tokio::test]
async fn test_on_time_approval_settles_points_and_completes_task() {
    let Some(pool) = test_pool().await else { return };

    let member = create_user(&pool, UserRole::Member).await;
    let lead = create_user(&pool, UserRole::TeamLead).await;
    let task = create_task(&pool, member.id, lead.id, Utc::now() + Duration::days(7)).await;
    let report = create_report(&pool, task.id, member.id).await;

    let outcome = settle_report(
        &pool,
        report.id,
        lead.id,
        ReviewDecision::Approved,
        Some("Good work"),
    )
    .await
    .expect("Settlement failed");

    assert_eq!(outcome.report.status, ReportStatus::Approved);
    assert_eq!(outcome.report.reviewed_by, Some(lead.id));
    assert!(outcome.on_time_bonus);
    assert_eq!(outcome.task.status, TaskStatus::Completed);
    assert!(outcome.task.completed_at.is_some());

    // Reviewer 15, submitter 10 base + 5 on-time.
    assert_eq!(points_of(&pool, lead.id).await, 15);
    assert_eq!(points_of(&pool, member.id).await, 15);
}

#[tokio::test]
async fn test_late_submission_earns_base_points_only() {
    let Some(pool) = test_pool().await else { return };

    let member = create_user(&pool, UserRole::Member).await;
    let lead = create_user(&pool, UserRole::TeamLead).await;
    let task = create_task(&pool, member.id, lead.id, Utc::now() - Duration::days(1)).await;
    let report = create_report(&pool, task.id, member.id).await;

    let outcome = settle_report(&pool, report.id, lead.id, ReviewDecision::Approved, None)
        .await
        .expect("Settlement failed");

    assert!(!outcome.on_time_bonus);
    assert_eq!(outcome.task.status, TaskStatus::Completed);
    assert_eq!(points_of(&pool, member.id).await, 10);
    assert_eq!(points_of(&pool, lead.id).await, 15);
}

#[tokio::test]
async fn test_rejection_awards_reviewer_only() {
    let Some(pool) = test_pool().await else { return };

    let member = create_user(&pool, UserRole::Member).await;
    let lead = create_user(&pool, UserRole::TeamLead).await;
    let task = create_task(&pool, member.id, lead.id, Utc::now() + Duration::days(7)).await;
    let report = create_report(&pool, task.id, member.id).await;

    let outcome = settle_report(
        &pool,
        report.id,
        lead.id,
        ReviewDecision::Rejected,
        Some("Missing details"),
    )
    .await
    .expect("Settlement failed");

    assert_eq!(outcome.report.status, ReportStatus::Rejected);
    assert_eq!(outcome.report.review_notes.as_deref(), Some("Missing details"));
    assert_ne!(outcome.task.status, TaskStatus::Completed);
    assert_eq!(points_of(&pool, lead.id).await, 15);
    assert_eq!(points_of(&pool, member.id).await, 0);
}

#[tokio::test]
async fn test_settled_report_cannot_be_reviewed_again() {
    let Some(pool) = test_pool().await else { return };

    let member = create_user(&pool, UserRole::Member).await;
    let lead = create_user(&pool, UserRole::TeamLead).await;
    let head = create_user(&pool, UserRole::DepartmentHead).await;
    let task = create_task(&pool, member.id, lead.id, Utc::now() + Duration::days(7)).await;
    let report = create_report(&pool, task.id, member.id).await;

    settle_report(&pool, report.id, lead.id, ReviewDecision::Approved, None)
        .await
        .expect("First settlement failed");

    let err = settle_report(
        &pool,
        report.id,
        head.id,
        ReviewDecision::Rejected,
        Some("Changed my mind"),
    )
    .await
    .expect_err("Second settlement must be rejected");

    assert!(matches!(err, ApiError::Conflict(_)));

    // Nothing from the losing review sticks.
    let settled = Report::find_by_id(&pool, report.id)
        .await
        .expect("Failed to load report")
        .expect("Report not found");
    assert_eq!(settled.status, ReportStatus::Approved);
    assert_eq!(settled.reviewed_by, Some(lead.id));
    assert_eq!(points_of(&pool, head.id).await, 0);
    assert_eq!(points_of(&pool, lead.id).await, 15);
    assert_eq!(points_of(&pool, member.id).await, 15);
}

#[tokio::test]
async fn test_taskless_self_reviewed_leadership_report_pays_reviewer_fee_only() {
    let Some(pool) = test_pool().await else { return };

    // A dual-role department head reviewing their own team-level report
    // must net exactly the reviewer fee; with no linked task there is no
    // submitter award to collect on top of it.
    let head = create_user(&pool, UserRole::DepartmentHead).await;

    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let report = LeadershipReport::create_tx(
        &mut tx,
        CreateLeadershipReport {
            task_id: None,
            submitted_by: head.id,
            submitted_to: head.id,
            content: "Weekly team summary".to_string(),
            report_period: Some("2026-W35".to_string()),
        },
    )
    .await
    .expect("Failed to create leadership report");
    tx.commit().await.expect("Failed to commit");

    let outcome = settle_leadership_report(&pool, report.id, &head, ReviewDecision::Approved, None)
        .await
        .expect("Settlement failed");

    assert_eq!(outcome.report.status, ReportStatus::Approved);
    assert!(outcome.task.is_none());
    assert!(!outcome.on_time_bonus);
    assert_eq!(points_of(&pool, head.id).await, 15);
}

#[tokio::test]
async fn test_leadership_rejection_awards_reviewer_only() {
    let Some(pool) = test_pool().await else { return };

    let head = create_user(&pool, UserRole::DepartmentHead).await;
    let ceo = create_user(&pool, UserRole::Ceo).await;

    let mut tx = pool.begin().await.expect("Failed to begin transaction");
    let report = LeadershipReport::create_tx(
        &mut tx,
        CreateLeadershipReport {
            task_id: None,
            submitted_by: head.id,
            submitted_to: ceo.id,
            content: "Department summary".to_string(),
            report_period: None,
        },
    )
    .await
    .expect("Failed to create leadership report");
    tx.commit().await.expect("Failed to commit");

    let outcome = settle_leadership_report(
        &pool,
        report.id,
        &ceo,
        ReviewDecision::Rejected,
        Some("Needs numbers"),
    )
    .await
    .expect("Settlement failed");

    assert_eq!(outcome.report.status, ReportStatus::Rejected);
    assert_eq!(points_of(&pool, ceo.id).await, 15);
    assert_eq!(points_of(&pool, head.id).await, 0);
}
