/// HTTP route handlers
///
/// Route modules grouped by API surface:
/// - `health` - Health check endpoint
/// - `auth` - Registration, login, token refresh
/// - `tasks` - Task registry (create/edit/delete/status/listings)
/// - `reports` - Review and settlement
/// - `performance` - Report submission, stats, leaderboard, analytics

pub mod auth;
pub mod health;
pub mod performance;
pub mod reports;
pub mod tasks;

use crate::{app::AppState, error::ApiError};
use crewtask_shared::auth::middleware::AuthContext;
use crewtask_shared::models::user::User;

/// Loads the authenticated user's row
///
/// The middleware only verifies the token; role and ownership checks are
/// made against the database row, so every protected handler starts here.
pub(crate) async fn current_user(state: &AppState, auth: &AuthContext) -> Result<User, ApiError> {
    User::find_by_id(&state.db, auth.user_id)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized("Account not found or deactivated".to_string()))
}
