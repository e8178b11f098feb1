/// Database models
///
/// Each model is a `sqlx::FromRow` struct with associated async functions
/// for its database operations:
///
/// - `user`: Accounts, organizational roles, and the points accumulator
/// - `team`: Organizational structure (departments are queried through
///   `crate::directory`)
/// - `milestone`: Weekly per-team task counters
/// - `task`: Assigned work items and their status state machine
/// - `report`: Task completion reports
/// - `leadership_report`: Upward status reports from management roles
/// - `analytics`: Read-only aggregate rollups

pub mod analytics;
pub mod leadership_report;
pub mod milestone;
pub mod report;
pub mod task;
pub mod team;
pub mod user;
