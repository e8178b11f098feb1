/// Authentication and authorization utilities
///
/// - `jwt`: Token generation and validation (HS256 access/refresh tokens)
/// - `password`: Argon2id password hashing and verification
/// - `middleware`: Axum middleware injecting an [`middleware::AuthContext`]

pub mod jwt;
pub mod middleware;
pub mod password;
