//! # CrewTask API Server
//!
//! HTTP backend for organizational task and report management:
//!
//! - Task registry: managers assign tasks into weekly team milestones and
//!   move them through a status state machine
//! - Completion reports routed to reviewers via the org hierarchy
//! - Leadership reports routed by a deterministic table
//! - Review settlement awarding performance points
//! - Best-effort post-commit email notifications
//!
//! ## Usage
//!
//! ```bash
//! cargo run -p crewtask-api
//! ```

pub mod app;
pub mod config;
pub mod error;
pub mod notify;
pub mod routes;
pub mod routing;
pub mod settlement;
