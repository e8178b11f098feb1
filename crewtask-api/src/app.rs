/// Application state and router builder
///
/// This module defines the shared application state and provides a function
/// to build the Axum router with all routes and middleware.
///
/// # Example
///
/// ```no_run
/// use crewtask_api::{app::AppState, config::Config, notify::mailer::MailNotifier};
/// use sqlx::PgPool;
/// use std::sync::Arc;
///
/// # async fn example() -> anyhow::Result<()> {
/// let config = Config::from_env()?;
/// let pool = PgPool::connect(&config.database.url).await?;
/// let notifier = Arc::new(MailNotifier::new(&config.mail)?);
/// let state = AppState::new(pool, config, notifier);
/// let app = crewtask_api::app::build_router(state);
/// # Ok(())
/// # }
/// ```

use crate::{config::Config, error::ApiError, notify::Notifier};
use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
    routing::{get, patch, post},
    Router,
};
use crewtask_shared::auth::middleware::jwt_auth_middleware;
use sqlx::PgPool;
use std::sync::Arc;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
///
/// Cloned for each request handler via Axum's `State` extractor; Arc
/// internally for cheap cloning. The notifier is an explicit dependency
/// here rather than a process-wide client, so tests swap in a recording
/// implementation.
#[derive(Clone)]
pub struct AppState {
    /// Database connection pool
    pub db: PgPool,

    /// Application configuration
    pub config: Arc<Config>,

    /// Outbound notification dispatcher
    pub notifier: Arc<dyn Notifier>,
}

impl AppState {
    /// Creates new application state
    pub fn new(db: PgPool, config: Config, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            db,
            config: Arc::new(config),
            notifier,
        }
    }

    /// Gets the JWT secret for token operations
    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete Axum router with all routes and middleware
///
/// # Architecture
///
/// ```text
/// /
/// ├── /health                           # Health check (public)
/// ├── /auth/                            # Authentication (public)
/// │   ├── POST /register
/// │   ├── POST /login
/// │   └── POST /refresh
/// ├── /tasks/                           # Task registry (authenticated)
/// ├── /reports/                         # Review & settlement (authenticated)
/// └── /performance/                     # Submission, stats (authenticated)
/// ```
///
/// # Middleware Stack
///
/// Applied in order (bottom to top):
/// 1. Logging (tower-http TraceLayer)
/// 2. CORS (tower-http CorsLayer)
/// 3. Authentication (per-route-group)
pub fn build_router(state: AppState) -> Router {
    use crate::routes;

    // Health check (public, no auth)
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    // Auth routes (public, no auth required)
    let auth_routes = Router::new()
        .route("/register", post(routes::auth::register))
        .route("/login", post(routes::auth::login))
        .route("/refresh", post(routes::auth::refresh));

    // Task registry (authenticated)
    let task_routes = Router::new()
        .route("/create", post(routes::tasks::create_tasks))
        .route("/my-tasks", get(routes::tasks::my_tasks))
        .route("/assigned-tasks", get(routes::tasks::assigned_tasks))
        .route("/members", get(routes::tasks::assignable_members))
        .route("/stats/overview", get(routes::tasks::stats_overview))
        .route("/categories/list", get(routes::tasks::categories))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .put(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route("/:id/status", patch(routes::tasks::update_status));

    // Review & settlement (authenticated)
    let report_routes = Router::new()
        .route("/pending-reviews", get(routes::reports::pending_reviews))
        .route("/my-reviews", get(routes::reports::my_reviews))
        .route(
            "/stats/review-summary",
            get(routes::reports::review_summary),
        )
        .route("/check-dual-role", get(routes::reports::check_dual_role))
        .route(
            "/leadership-reports/pending",
            get(routes::reports::pending_leadership_reports),
        )
        .route(
            "/leadership-reports/reviewed",
            get(routes::reports::reviewed_leadership_reports),
        )
        .route(
            "/leadership-reports/:id/review",
            patch(routes::reports::review_leadership_report),
        )
        .route("/:id/review", patch(routes::reports::review_report))
        .route(
            "/:id/set-under-review",
            patch(routes::reports::set_under_review),
        );

    // Report submission and performance stats (authenticated)
    let performance_routes = Router::new()
        .route("/submit-report", post(routes::performance::submit_report))
        .route(
            "/submit-leadership-report",
            post(routes::performance::submit_leadership_report),
        )
        .route(
            "/leadership-tasks",
            get(routes::performance::leadership_tasks),
        )
        .route("/stats", get(routes::performance::stats))
        .route("/tasks", get(routes::performance::tasks))
        .route("/reports", get(routes::performance::reports))
        .route("/pending-tasks", get(routes::performance::pending_tasks))
        .route("/leaderboard", get(routes::performance::leaderboard))
        .route(
            "/analytics/trends",
            get(routes::performance::analytics_trends),
        )
        .route(
            "/analytics/task-categories",
            get(routes::performance::analytics_task_categories),
        )
        .route(
            "/analytics/department-comparison",
            get(routes::performance::analytics_department_comparison),
        );

    let authenticated = Router::new()
        .nest("/tasks", task_routes)
        .nest("/reports", report_routes)
        .nest("/performance", performance_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    Router::new()
        .merge(health_routes)
        .nest("/auth", auth_routes)
        .merge(authenticated)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// JWT authentication middleware layer
///
/// Binds the configured secret to the shared middleware, which validates
/// the Bearer token and injects an
/// [`AuthContext`](crewtask_shared::auth::middleware::AuthContext) into
/// request extensions.
async fn jwt_auth_layer(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Result<Response, ApiError> {
    jwt_auth_middleware(state.jwt_secret().to_string(), req, next)
        .await
        .map_err(ApiError::from)
}
