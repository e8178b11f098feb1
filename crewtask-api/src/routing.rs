/// Review routing: who reviews a given submission
///
/// Two routing tables live here.
///
/// **Completion reports** route up the submitter's own chain, first match
/// wins: their team's lead, else their department's head. No match means
/// the submission still succeeds, just with nobody notified.
///
/// **Leadership reports** route by a deterministic table keyed on
/// (submitter role, whether they lead a team, requested review level):
///
/// | Role | Leads a team | review_level | Reviewer |
/// |---|---|---|---|
/// | team_lead | - | - | department head |
/// | department_head | yes | "team" | themselves (self-review) |
/// | department_head | yes | "leadership" | CEO |
/// | department_head | yes | missing/other | validation error |
/// | department_head | no | - | CEO |
/// | project_manager / ceo / coo / cto | - | - | CEO |
///
/// The table itself is the pure [`leadership_route`] function; the async
/// resolvers turn a routed variant into an actual user via the
/// organizational directory.

use crate::error::ApiError;
use crewtask_shared::directory;
use crewtask_shared::models::user::{User, UserRole};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;

/// Requested review level for a dual-role department head
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewLevel {
    /// Report as a team lead (self-review)
    Team,

    /// Report as a department head (to the CEO)
    Leadership,
}

impl ReviewLevel {
    /// Parses a review level from its wire string
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "team" => Some(ReviewLevel::Team),
            "leadership" => Some(ReviewLevel::Leadership),
            _ => None,
        }
    }
}

/// Where a leadership report routes, before directory resolution
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LeadershipRoute {
    /// To the submitter's department head
    ToDepartmentHead,

    /// The submitter reviews their own report; no notification is sent
    SelfReview,

    /// To the organization's CEO
    ToCeo,
}

/// Routing failure, mapped to an API error by the caller
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoutingError {
    /// Role may not submit leadership reports
    #[error("Role '{0}' may not submit leadership reports")]
    NotEligible(String),

    /// Dual-role department head must pick a review level
    #[error("review_level must be \"team\" or \"leadership\"")]
    ReviewLevelRequired,
}

impl From<RoutingError> for ApiError {
    fn from(err: RoutingError) -> Self {
        match err {
            RoutingError::NotEligible(_) => ApiError::Forbidden(err.to_string()),
            RoutingError::ReviewLevelRequired => {
                ApiError::validation("review_level", &err.to_string())
            }
        }
    }
}

/// The leadership routing table
///
/// Pure so every row is unit-testable. `review_level` only matters for a
/// department head who also leads a team; it is ignored for everyone else.
pub fn leadership_route(
    role: UserRole,
    leads_team: bool,
    review_level: Option<ReviewLevel>,
) -> Result<LeadershipRoute, RoutingError> {
    match role {
        UserRole::TeamLead => Ok(LeadershipRoute::ToDepartmentHead),

        UserRole::DepartmentHead if leads_team => match review_level {
            Some(ReviewLevel::Team) => Ok(LeadershipRoute::SelfReview),
            Some(ReviewLevel::Leadership) => Ok(LeadershipRoute::ToCeo),
            None => Err(RoutingError::ReviewLevelRequired),
        },
        UserRole::DepartmentHead => Ok(LeadershipRoute::ToCeo),

        UserRole::ProjectManager | UserRole::Ceo | UserRole::Coo | UserRole::Cto => {
            Ok(LeadershipRoute::ToCeo)
        }

        other => Err(RoutingError::NotEligible(other.as_str().to_string())),
    }
}

/// Resolved leadership reviewer
#[derive(Debug, Clone)]
pub enum LeadershipReviewer {
    /// The submitter themselves; skip notification
    SelfReview,

    /// Another user; notify them
    Reviewer(User),
}

impl LeadershipReviewer {
    /// The user id recorded as `submitted_to`
    pub fn reviewer_id(&self, submitter: &User) -> uuid::Uuid {
        match self {
            LeadershipReviewer::SelfReview => submitter.id,
            LeadershipReviewer::Reviewer(user) => user.id,
        }
    }
}

/// Resolves the reviewer for a completion report
///
/// First match wins: the lead of the submitter's team, then the head of
/// the submitter's department. `Ok(None)` when neither exists; submission
/// proceeds without a notification.
pub async fn resolve_report_reviewer(
    pool: &PgPool,
    submitter: &User,
) -> Result<Option<User>, sqlx::Error> {
    if let Some(team) = directory::team_of(pool, submitter.id).await? {
        if let Some(lead_id) = team.team_lead_id {
            if let Some(lead) = User::find_by_id(pool, lead_id).await? {
                return Ok(Some(lead));
            }
        }
    }

    if let Some(department_id) = submitter.department_id {
        if let Some(head) = directory::department_head(pool, department_id).await? {
            return Ok(Some(head));
        }
    }

    Ok(None)
}

/// Resolves the reviewer for a leadership report
///
/// Applies [`leadership_route`] and looks the routed party up in the
/// directory. A missing department head or CEO is an error here (unlike
/// completion reports, leadership reports always have a fixed reviewer).
pub async fn resolve_leadership_reviewer(
    pool: &PgPool,
    submitter: &User,
    review_level: Option<ReviewLevel>,
) -> Result<LeadershipReviewer, ApiError> {
    let leads_team = directory::team_led_by(pool, submitter.id).await?.is_some();
    let route = leadership_route(submitter.role, leads_team, review_level)?;

    match route {
        LeadershipRoute::SelfReview => Ok(LeadershipReviewer::SelfReview),

        LeadershipRoute::ToDepartmentHead => {
            let department_id = submitter.department_id.ok_or_else(|| {
                ApiError::NotFound("Submitter has no department".to_string())
            })?;
            let head = directory::department_head(pool, department_id)
                .await?
                .ok_or_else(|| {
                    ApiError::NotFound("No department head to review this report".to_string())
                })?;
            Ok(LeadershipReviewer::Reviewer(head))
        }

        LeadershipRoute::ToCeo => {
            let ceo = directory::find_ceo(pool).await?.ok_or_else(|| {
                ApiError::NotFound("No CEO to review this report".to_string())
            })?;
            Ok(LeadershipReviewer::Reviewer(ceo))
        }
    }
}

/// Reverse routing for the leadership-tasks listing
///
/// Determines whose assignments the caller reports on: the tasks listed
/// are those assigned to the caller *by* the resolved party. `Ok(None)`
/// means the listing is empty (a dual-role head reporting at team level;
/// team-level reports carry no task).
pub async fn leadership_task_assigner(
    pool: &PgPool,
    caller: &User,
    review_level: Option<ReviewLevel>,
) -> Result<Option<User>, ApiError> {
    let leads_team = directory::team_led_by(pool, caller.id).await?.is_some();
    let route = leadership_route(caller.role, leads_team, review_level)?;

    match route {
        LeadershipRoute::SelfReview => Ok(None),

        LeadershipRoute::ToDepartmentHead => {
            let department_id = caller
                .department_id
                .ok_or_else(|| ApiError::NotFound("Caller has no department".to_string()))?;
            let head = directory::department_head(pool, department_id)
                .await?
                .ok_or_else(|| ApiError::NotFound("No department head found".to_string()))?;
            Ok(Some(head))
        }

        LeadershipRoute::ToCeo => {
            let ceo = directory::find_ceo(pool)
                .await?
                .ok_or_else(|| ApiError::NotFound("No CEO found".to_string()))?;
            Ok(Some(ceo))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_lead_routes_to_department_head() {
        assert_eq!(
            leadership_route(UserRole::TeamLead, false, None),
            Ok(LeadershipRoute::ToDepartmentHead)
        );
        // review_level is ignored for team leads
        assert_eq!(
            leadership_route(UserRole::TeamLead, true, Some(ReviewLevel::Leadership)),
            Ok(LeadershipRoute::ToDepartmentHead)
        );
    }

    #[test]
    fn test_dual_role_head_team_level_is_self_review() {
        assert_eq!(
            leadership_route(UserRole::DepartmentHead, true, Some(ReviewLevel::Team)),
            Ok(LeadershipRoute::SelfReview)
        );
    }

    #[test]
    fn test_dual_role_head_leadership_level_routes_to_ceo() {
        assert_eq!(
            leadership_route(UserRole::DepartmentHead, true, Some(ReviewLevel::Leadership)),
            Ok(LeadershipRoute::ToCeo)
        );
    }

    #[test]
    fn test_dual_role_head_requires_review_level() {
        assert_eq!(
            leadership_route(UserRole::DepartmentHead, true, None),
            Err(RoutingError::ReviewLevelRequired)
        );
    }

    #[test]
    fn test_plain_department_head_routes_to_ceo() {
        assert_eq!(
            leadership_route(UserRole::DepartmentHead, false, None),
            Ok(LeadershipRoute::ToCeo)
        );
        // review_level is irrelevant without a led team
        assert_eq!(
            leadership_route(UserRole::DepartmentHead, false, Some(ReviewLevel::Team)),
            Ok(LeadershipRoute::ToCeo)
        );
    }

    #[test]
    fn test_executives_route_to_ceo() {
        for role in [
            UserRole::ProjectManager,
            UserRole::Ceo,
            UserRole::Coo,
            UserRole::Cto,
        ] {
            assert_eq!(
                leadership_route(role, false, None),
                Ok(LeadershipRoute::ToCeo)
            );
        }
    }

    #[test]
    fn test_ineligible_roles_rejected() {
        for role in [
            UserRole::Member,
            UserRole::Cfo,
            UserRole::Cmo,
            UserRole::HrManager,
        ] {
            assert!(matches!(
                leadership_route(role, false, None),
                Err(RoutingError::NotEligible(_))
            ));
        }
    }

    #[test]
    fn test_review_level_parse() {
        assert_eq!(ReviewLevel::parse("team"), Some(ReviewLevel::Team));
        assert_eq!(
            ReviewLevel::parse("leadership"),
            Some(ReviewLevel::Leadership)
        );
        assert_eq!(ReviewLevel::parse("executive"), None);
        assert_eq!(ReviewLevel::parse(""), None);
    }
}
