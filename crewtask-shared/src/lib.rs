//! # CrewTask Shared Library
//!
//! Shared types and data-layer logic used by the CrewTask API server.
//!
//! ## Module Organization
//!
//! - `models`: Database models (users, teams, departments, milestones,
//!   tasks, reports, leadership reports)
//! - `directory`: Read-only organizational lookups (who leads whom,
//!   department heads, the CEO)
//! - `auth`: JWT tokens, password hashing, and axum auth middleware
//! - `db`: Connection pool and migrations

pub mod auth;
pub mod db;
pub mod directory;
pub mod models;

/// Current version of the CrewTask shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
