/// Authentication endpoints
///
/// - Registration (new accounts start as `member`)
/// - Login
/// - Token refresh
///
/// # Endpoints
///
/// - `POST /auth/register` - Register a new user
/// - `POST /auth/login` - Login and get tokens
/// - `POST /auth/refresh` - Refresh access token

use crate::{
    app::AppState,
    error::{ApiError, ApiResult},
};
use axum::{extract::State, Json};
use crewtask_shared::{
    auth::{
        jwt::{self, Claims, TokenType},
        password,
    },
    models::user::{CreateUser, User, UserRole},
};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Register request
#[derive(Debug, Deserialize, Validate)]
pub struct RegisterRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,

    /// Display name
    #[validate(length(
        min = 1,
        max = 255,
        message = "Full name must be between 1 and 255 characters"
    ))]
    pub full_name: String,
}

/// Register response
#[derive(Debug, Serialize)]
pub struct RegisterResponse {
    /// Created user
    pub user: User,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Login request
#[derive(Debug, Deserialize, Validate)]
pub struct LoginRequest {
    /// Email address
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    /// Password
    pub password: String,
}

/// Login response
#[derive(Debug, Serialize)]
pub struct LoginResponse {
    /// Authenticated user
    pub user: User,

    /// Access token (24h)
    pub access_token: String,

    /// Refresh token (30d)
    pub refresh_token: String,
}

/// Refresh token request
#[derive(Debug, Deserialize)]
pub struct RefreshRequest {
    /// Refresh token
    pub refresh_token: String,
}

/// Refresh token response
#[derive(Debug, Serialize)]
pub struct RefreshResponse {
    /// New access token (24h)
    pub access_token: String,
}

fn issue_tokens(user: &User, secret: &str) -> Result<(String, String), ApiError> {
    let access = jwt::create_token(
        &Claims::new(user.id, user.role.as_str(), TokenType::Access),
        secret,
    )?;
    let refresh = jwt::create_token(
        &Claims::new(user.id, user.role.as_str(), TokenType::Refresh),
        secret,
    )?;
    Ok((access, refresh))
}

/// Registers a new user
///
/// New accounts always get the `member` role; organizational roles are
/// assigned administratively.
///
/// # Errors
///
/// - `409 Conflict`: Email already exists
/// - `422 Unprocessable Entity`: Validation failed
pub async fn register(
    State(state): State<AppState>,
    Json(req): Json<RegisterRequest>,
) -> ApiResult<Json<RegisterResponse>> {
    req.validate()?;

    let password_hash = password::hash_password(&req.password)?;

    let user = User::create(
        &state.db,
        CreateUser {
            email: req.email,
            password_hash,
            full_name: req.full_name,
            role: UserRole::Member,
            department_id: None,
        },
    )
    .await?;

    let (access_token, refresh_token) = issue_tokens(&user, state.jwt_secret())?;

    Ok(Json(RegisterResponse {
        user,
        access_token,
        refresh_token,
    }))
}

/// Logs a user in
///
/// # Errors
///
/// - `401 Unauthorized`: Unknown email, wrong password, or inactive account
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> ApiResult<Json<LoginResponse>> {
    req.validate()?;

    // Same error for unknown email and wrong password
    let invalid = || ApiError::Unauthorized("Invalid email or password".to_string());

    let user = User::find_by_email(&state.db, &req.email)
        .await?
        .ok_or_else(invalid)?;

    if !user.is_active {
        return Err(ApiError::Unauthorized("Account is deactivated".to_string()));
    }

    if !password::verify_password(&req.password, &user.password_hash)? {
        return Err(invalid());
    }

    User::update_last_login(&state.db, user.id).await?;

    let (access_token, refresh_token) = issue_tokens(&user, state.jwt_secret())?;

    Ok(Json(LoginResponse {
        user,
        access_token,
        refresh_token,
    }))
}

/// Exchanges a refresh token for a new access token
///
/// # Errors
///
/// - `401 Unauthorized`: Invalid or expired refresh token
pub async fn refresh(
    State(state): State<AppState>,
    Json(req): Json<RefreshRequest>,
) -> ApiResult<Json<RefreshResponse>> {
    let claims = jwt::validate_refresh_token(&req.refresh_token, state.jwt_secret())?;

    // Re-read the role so a promotion or deactivation takes effect on refresh
    let user = User::find_by_id(&state.db, claims.sub)
        .await?
        .filter(|u| u.is_active)
        .ok_or_else(|| ApiError::Unauthorized("Account not found or deactivated".to_string()))?;

    let access_token = jwt::create_token(
        &Claims::new(user.id, user.role.as_str(), TokenType::Access),
        state.jwt_secret(),
    )?;

    Ok(Json(RefreshResponse { access_token }))
}
