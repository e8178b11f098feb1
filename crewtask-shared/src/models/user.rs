/// User model and database operations
///
/// Users carry an organizational role, an optional department, and a
/// monotonic points accumulator. Points are only ever mutated through
/// [`User::add_points_tx`], which issues an atomic SQL increment so that
/// concurrent settlements cannot lose updates.
///
/// # Schema
///
/// ```sql
/// CREATE TYPE user_role AS ENUM (
///     'member', 'team_lead', 'department_head', 'project_manager',
///     'ceo', 'coo', 'cto', 'cfo', 'cmo', 'hr_manager'
/// );
///
/// CREATE TABLE users (
///     id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
///     email VARCHAR(255) NOT NULL UNIQUE,
///     password_hash VARCHAR(255) NOT NULL,
///     full_name VARCHAR(255) NOT NULL,
///     role user_role NOT NULL DEFAULT 'member',
///     department_id UUID REFERENCES departments(id) ON DELETE SET NULL,
///     points INTEGER NOT NULL DEFAULT 0,
///     is_active BOOLEAN NOT NULL DEFAULT TRUE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     last_login_at TIMESTAMPTZ
/// );
/// ```
///
/// # Example
///
/// ```no_run
/// use crewtask_shared::models::user::{User, CreateUser, UserRole};
/// # use sqlx::PgPool;
///
/// # async fn example(pool: PgPool) -> Result<(), sqlx::Error> {
/// let user = User::create(&pool, CreateUser {
///     email: "alice@example.com".to_string(),
///     password_hash: "$argon2id$...".to_string(),
///     full_name: "Alice".to_string(),
///     role: UserRole::Member,
///     department_id: None,
/// }).await?;
/// assert_eq!(user.points, 0);
/// # Ok(())
/// # }
/// ```

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Organizational role of a user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "user_role", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum UserRole {
    /// Regular team member
    Member,

    /// Leads a team (teams.team_lead_id)
    TeamLead,

    /// Heads a department (departments.head_id)
    DepartmentHead,

    /// Cross-team project manager
    ProjectManager,

    /// Chief executive officer (top of the review chain)
    Ceo,

    /// Chief operating officer
    Coo,

    /// Chief technology officer
    Cto,

    /// Chief financial officer
    Cfo,

    /// Chief marketing officer
    Cmo,

    /// Human resources manager
    HrManager,
}

impl UserRole {
    /// Converts role to its wire/database string
    pub fn as_str(&self) -> &'static str {
        match self {
            UserRole::Member => "member",
            UserRole::TeamLead => "team_lead",
            UserRole::DepartmentHead => "department_head",
            UserRole::ProjectManager => "project_manager",
            UserRole::Ceo => "ceo",
            UserRole::Coo => "coo",
            UserRole::Cto => "cto",
            UserRole::Cfo => "cfo",
            UserRole::Cmo => "cmo",
            UserRole::HrManager => "hr_manager",
        }
    }

    /// Checks whether this is a manager-class role
    ///
    /// Manager-class roles may create, edit, and delete tasks and review
    /// completion reports. Everything except `member`.
    pub fn is_manager(&self) -> bool {
        !matches!(self, UserRole::Member)
    }

    /// Checks whether this is an executive role (ceo/coo/cto)
    ///
    /// Executives may create tasks with no milestone and always have
    /// review authority over completion reports.
    pub fn is_executive(&self) -> bool {
        matches!(self, UserRole::Ceo | UserRole::Coo | UserRole::Cto)
    }

    /// Checks whether this role may submit leadership reports
    pub fn can_submit_leadership_report(&self) -> bool {
        matches!(
            self,
            UserRole::TeamLead
                | UserRole::DepartmentHead
                | UserRole::ProjectManager
                | UserRole::Ceo
                | UserRole::Coo
                | UserRole::Cto
        )
    }
}

/// User model representing an account in the organization
#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    /// Unique user ID (UUID v4)
    pub id: Uuid,

    /// Email address, unique across all users
    pub email: String,

    /// Argon2id password hash, never plaintext
    #[serde(skip_serializing)]
    pub password_hash: String,

    /// Display name
    pub full_name: String,

    /// Organizational role
    pub role: UserRole,

    /// Department the user belongs to, if any
    pub department_id: Option<Uuid>,

    /// Accumulated performance points
    ///
    /// Mutated only by review settlement, via atomic increment.
    pub points: i32,

    /// Whether the account is active
    pub is_active: bool,

    /// When the account was created
    pub created_at: DateTime<Utc>,

    /// When the account was last updated
    pub updated_at: DateTime<Utc>,

    /// When the user last logged in (None if never)
    pub last_login_at: Option<DateTime<Utc>>,
}

/// Input for creating a new user
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateUser {
    /// Email address
    pub email: String,

    /// Argon2id password hash (NOT a plaintext password)
    pub password_hash: String,

    /// Display name
    pub full_name: String,

    /// Organizational role
    pub role: UserRole,

    /// Optional department
    pub department_id: Option<Uuid>,
}

impl User {
    /// Creates a new user
    ///
    /// # Errors
    ///
    /// Returns an error if the email already exists or the database
    /// operation fails.
    pub async fn create(pool: &PgPool, data: CreateUser) -> Result<Self, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (email, password_hash, full_name, role, department_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, email, password_hash, full_name, role, department_id,
                      points, is_active, created_at, updated_at, last_login_at
            "#,
        )
        .bind(data.email)
        .bind(data.password_hash)
        .bind(data.full_name)
        .bind(data.role)
        .bind(data.department_id)
        .fetch_one(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by ID
    pub async fn find_by_id(pool: &PgPool, id: Uuid) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, role, department_id,
                   points, is_active, created_at, updated_at, last_login_at
            FROM users
            WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Finds a user by email address
    pub async fn find_by_email(pool: &PgPool, email: &str) -> Result<Option<Self>, sqlx::Error> {
        let user = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, role, department_id,
                   points, is_active, created_at, updated_at, last_login_at
            FROM users
            WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(pool)
        .await?;

        Ok(user)
    }

    /// Atomically awards points to a user inside an open transaction
    ///
    /// Applied as a single SQL increment rather than read-modify-write so
    /// concurrent settlements against the same user cannot lose updates.
    pub async fn add_points_tx(
        tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
        id: Uuid,
        points: i32,
    ) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE users SET points = points + $2, updated_at = NOW() WHERE id = $1",
        )
        .bind(id)
        .bind(points)
        .execute(&mut **tx)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Updates the last login timestamp
    pub async fn update_last_login(pool: &PgPool, id: Uuid) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("UPDATE users SET last_login_at = NOW() WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Lists active users ordered by points (the leaderboard)
    pub async fn leaderboard(pool: &PgPool, limit: i64) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, role, department_id,
                   points, is_active, created_at, updated_at, last_login_at
            FROM users
            WHERE is_active = TRUE
            ORDER BY points DESC, created_at ASC
            LIMIT $1
            "#,
        )
        .bind(limit)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Lists active users in a department
    pub async fn list_by_department(
        pool: &PgPool,
        department_id: Uuid,
    ) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, role, department_id,
                   points, is_active, created_at, updated_at, last_login_at
            FROM users
            WHERE department_id = $1 AND is_active = TRUE
            ORDER BY full_name ASC
            "#,
        )
        .bind(department_id)
        .fetch_all(pool)
        .await?;

        Ok(users)
    }

    /// Lists all active users
    pub async fn list_active(pool: &PgPool) -> Result<Vec<Self>, sqlx::Error> {
        let users = sqlx::query_as::<_, User>(
            r#"
            SELECT id, email, password_hash, full_name, role, department_id,
                   points, is_active, created_at, updated_at, last_login_at
            FROM users
            WHERE is_active = TRUE
            ORDER BY full_name ASC
            "#,
        )
        .fetch_all(pool)
        .await?;

        Ok(users)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_wire_strings() {
        assert_eq!(UserRole::Member.as_str(), "member");
        assert_eq!(UserRole::TeamLead.as_str(), "team_lead");
        assert_eq!(UserRole::DepartmentHead.as_str(), "department_head");
        assert_eq!(UserRole::ProjectManager.as_str(), "project_manager");
        assert_eq!(UserRole::HrManager.as_str(), "hr_manager");
    }

    #[test]
    fn test_manager_class_roles() {
        assert!(!UserRole::Member.is_manager());
        assert!(UserRole::TeamLead.is_manager());
        assert!(UserRole::DepartmentHead.is_manager());
        assert!(UserRole::ProjectManager.is_manager());
        assert!(UserRole::Ceo.is_manager());
        assert!(UserRole::Cfo.is_manager());
        assert!(UserRole::Cmo.is_manager());
        assert!(UserRole::HrManager.is_manager());
    }

    #[test]
    fn test_executive_roles() {
        assert!(UserRole::Ceo.is_executive());
        assert!(UserRole::Coo.is_executive());
        assert!(UserRole::Cto.is_executive());
        assert!(!UserRole::Cfo.is_executive());
        assert!(!UserRole::DepartmentHead.is_executive());
    }

    #[test]
    fn test_leadership_report_roles() {
        assert!(UserRole::TeamLead.can_submit_leadership_report());
        assert!(UserRole::DepartmentHead.can_submit_leadership_report());
        assert!(UserRole::ProjectManager.can_submit_leadership_report());
        assert!(UserRole::Ceo.can_submit_leadership_report());
        assert!(!UserRole::Member.can_submit_leadership_report());
        assert!(!UserRole::HrManager.can_submit_leadership_report());
        assert!(!UserRole::Cfo.can_submit_leadership_report());
    }
}
