/// Router integration tests
///
/// Exercises the public surface of the router without a live database: the
/// pool is connected lazily, so routes that never touch it (auth rejection
/// paths, unknown routes) behave exactly as in production.

use axum::body::Body;
use axum::http::{Request, StatusCode};
use crewtask_api::app::{build_router, AppState};
use crewtask_api::config::{ApiConfig, Config, DatabaseConfig, JwtConfig, MailConfig};
use crewtask_api::notify::mock::RecordingNotifier;
use crewtask_shared::auth::jwt::{create_token, Claims, TokenType};
use serde_json::json;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower::Service as _;
use uuid::Uuid;

const JWT_SECRET: &str = "router-test-secret-at-least-32-bytes!!";

fn test_state() -> AppState {
    let config = Config {
        api: ApiConfig {
            host: "127.0.0.1".to_string(),
            port: 0,
        },
        database: DatabaseConfig {
            url: "postgresql://localhost:1/unreachable".to_string(),
            max_connections: 1,
        },
        jwt: JwtConfig {
            secret: JWT_SECRET.to_string(),
        },
        mail: MailConfig {
            url: None,
            token: None,
            timeout_seconds: 30,
        },
    };

    // Lazy pool: no connection is attempted until a query runs
    let pool = PgPoolOptions::new()
        .max_connections(1)
        .connect_lazy(&config.database.url)
        .expect("lazy pool");

    AppState::new(pool, config, Arc::new(RecordingNotifier::new()))
}

#[tokio::test]
async fn test_health_endpoint_responds() {
    let app = build_router(test_state());

    let request = Request::builder()
        .method("GET")
        .uri("/health")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();

    // No reachable database, so the service reports degraded
    assert_eq!(json["status"], "degraded");
    assert_eq!(json["database"], "disconnected");
    assert!(json["version"].is_string());
}

#[tokio::test]
async fn test_protected_routes_require_auth() {
    let app = build_router(test_state());

    for (method, uri) in [
        ("GET", "/tasks/my-tasks"),
        ("POST", "/tasks/create"),
        ("GET", "/reports/pending-reviews"),
        ("POST", "/performance/submit-report"),
        ("GET", "/performance/leaderboard"),
    ] {
        let request = Request::builder()
            .method(method)
            .uri(uri)
            .body(Body::empty())
            .unwrap();

        let response = app.clone().call(request).await.unwrap();
        assert_eq!(
            response.status(),
            StatusCode::UNAUTHORIZED,
            "{} {} should require authentication",
            method,
            uri
        );
    }
}

#[tokio::test]
async fn test_malformed_bearer_token_rejected() {
    let app = build_router(test_state());

    let request = Request::builder()
        .method("GET")
        .uri("/tasks/my-tasks")
        .header("authorization", "Bearer not-a-jwt")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_non_bearer_authorization_rejected() {
    let app = build_router(test_state());

    let request = Request::builder()
        .method("GET")
        .uri("/tasks/my-tasks")
        .header("authorization", "Basic dXNlcjpwYXNz")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn test_refresh_token_rejected_on_protected_route() {
    let app = build_router(test_state());

    // A refresh token must not pass the access-token middleware
    let claims = Claims::new(Uuid::new_v4(), "member", TokenType::Refresh);
    let token = create_token(&claims, JWT_SECRET).unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/tasks/my-tasks")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_wrong_secret_token_rejected() {
    let app = build_router(test_state());

    let claims = Claims::new(Uuid::new_v4(), "member", TokenType::Access);
    let token = create_token(&claims, "a-different-secret-32-bytes-long!!!").unwrap();

    let request = Request::builder()
        .method("GET")
        .uri("/tasks/my-tasks")
        .header("authorization", format!("Bearer {}", token))
        .body(Body::empty())
        .unwrap();

    let response = app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_register_validates_body() {
    let app = build_router(test_state());

    let request = Request::builder()
        .method("POST")
        .uri("/auth/register")
        .header("content-type", "application/json")
        .body(Body::from(
            json!({
                "email": "not-an-email",
                "password": "short",
                "full_name": "Test User"
            })
            .to_string(),
        ))
        .unwrap();

    let response = app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

    let body = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
    assert_eq!(json["error"], "validation_error");
}

#[tokio::test]
async fn test_unknown_route_is_404() {
    let app = build_router(test_state());

    let request = Request::builder()
        .method("GET")
        .uri("/no-such-route")
        .body(Body::empty())
        .unwrap();

    let response = app.clone().call(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}
