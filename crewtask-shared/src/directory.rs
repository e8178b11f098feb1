/// Organizational directory: read-only lookups over the org structure
///
/// Answers the "who reviews this person" questions for report routing:
/// which team a user leads or belongs to, who heads a department, and who
/// the CEO is. Every lookup returns `Option`/empty rather than erroring
/// when no match exists; callers decide whether a missing reviewer is fatal.
///
/// Lookups assume the documented single-team-membership invariant: a user
/// belongs to at most one team, so [`team_of`] uses a plain
/// `fetch_optional`.

use crate::models::team::Team;
use crate::models::user::{User, UserRole};
use sqlx::PgPool;
use uuid::Uuid;

const USER_COLUMNS: &str = "id, email, password_hash, full_name, role, department_id, \
     points, is_active, created_at, updated_at, last_login_at";

/// Finds the team a user leads, if any
///
/// A user leads at most one team (unique index on `teams.team_lead_id`).
pub async fn team_led_by(pool: &PgPool, user_id: Uuid) -> Result<Option<Team>, sqlx::Error> {
    let team = sqlx::query_as::<_, Team>(
        r#"
        SELECT id, name, department_id, team_lead_id, created_at, updated_at
        FROM teams
        WHERE team_lead_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(team)
}

/// Finds the team a user belongs to via membership
pub async fn team_of(pool: &PgPool, user_id: Uuid) -> Result<Option<Team>, sqlx::Error> {
    let team = sqlx::query_as::<_, Team>(
        r#"
        SELECT t.id, t.name, t.department_id, t.team_lead_id, t.created_at, t.updated_at
        FROM teams t
        JOIN team_members tm ON tm.team_id = t.id
        WHERE tm.user_id = $1
        "#,
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    Ok(team)
}

/// Lists the ids of teams a user leads
///
/// Review eligibility for team leads and project managers checks whether
/// the submitter belongs to one of these.
pub async fn teams_led_by(pool: &PgPool, user_id: Uuid) -> Result<Vec<Uuid>, sqlx::Error> {
    let rows: Vec<(Uuid,)> = sqlx::query_as("SELECT id FROM teams WHERE team_lead_id = $1")
        .bind(user_id)
        .fetch_all(pool)
        .await?;

    Ok(rows.into_iter().map(|(id,)| id).collect())
}

/// Finds the head of a department
///
/// Prefers the department's `head_id`; falls back to any active user in the
/// department with role `department_head` when the pointer is unset.
pub async fn department_head(
    pool: &PgPool,
    department_id: Uuid,
) -> Result<Option<User>, sqlx::Error> {
    let head = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT u.{USER_COLUMNS_QUALIFIED}
        FROM users u
        JOIN departments d ON d.head_id = u.id
        WHERE d.id = $1 AND u.is_active = TRUE
        "#,
        USER_COLUMNS_QUALIFIED = USER_COLUMNS_QUALIFIED,
    ))
    .bind(department_id)
    .fetch_optional(pool)
    .await?;

    if head.is_some() {
        return Ok(head);
    }

    let head = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE department_id = $1 AND role = 'department_head' AND is_active = TRUE
        ORDER BY created_at ASC
        LIMIT 1
        "#,
    ))
    .bind(department_id)
    .fetch_optional(pool)
    .await?;

    Ok(head)
}

/// Finds the organization's CEO
///
/// If multiple users hold the ceo role, the earliest-created active one is
/// returned. Uniqueness is not enforced at the data layer; the
/// first-match resolution is deliberate and deterministic.
pub async fn find_ceo(pool: &PgPool) -> Result<Option<User>, sqlx::Error> {
    let ceo = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT {USER_COLUMNS}
        FROM users
        WHERE role = 'ceo' AND is_active = TRUE
        ORDER BY created_at ASC
        LIMIT 1
        "#,
    ))
    .fetch_optional(pool)
    .await?;

    Ok(ceo)
}

/// Checks whether a department head also leads a team (dual role)
pub async fn is_dual_role(pool: &PgPool, user: &User) -> Result<bool, sqlx::Error> {
    if user.role != UserRole::DepartmentHead {
        return Ok(false);
    }
    Ok(team_led_by(pool, user.id).await?.is_some())
}

/// Lists active members of the teams a user leads
pub async fn members_of_led_teams(pool: &PgPool, user_id: Uuid) -> Result<Vec<User>, sqlx::Error> {
    let members = sqlx::query_as::<_, User>(&format!(
        r#"
        SELECT u.{USER_COLUMNS_QUALIFIED}
        FROM users u
        JOIN team_members tm ON tm.user_id = u.id
        JOIN teams t ON t.id = tm.team_id
        WHERE t.team_lead_id = $1 AND u.is_active = TRUE
        ORDER BY u.full_name ASC
        "#,
        USER_COLUMNS_QUALIFIED = USER_COLUMNS_QUALIFIED,
    ))
    .bind(user_id)
    .fetch_all(pool)
    .await?;

    Ok(members)
}

// "u."-qualified column list for joined queries.
const USER_COLUMNS_QUALIFIED: &str = "id, u.email, u.password_hash, u.full_name, u.role, \
     u.department_id, u.points, u.is_active, u.created_at, u.updated_at, u.last_login_at";
