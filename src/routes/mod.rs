//! API route handlers.

pub mod auth;
pub mod github;
pub mod user;

use crate::auth::middleware::AppState;
use crate::error::ApiError;
use axum::{routing::get, routing::post, Router};

pub(crate) async fn redis_con(
    state: &AppState,
) -> Result<redis::aio::MultiplexedConnection, ApiError> {
    state
        .redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| ApiError::Internal(format!("Redis connection error: {}", e)))
}

/// Build the API router with all endpoints.
pub fn api_router() -> Router<AppState> {
    Router::new()
        // Local auth endpoints
        .route("/api/v1/auth/signup", post(auth::signup))
        .route("/api/v1/auth/resendOtp", post(auth::resend_otp))
        .route("/api/v1/auth/forgetPassword", post(auth::forget_password))
        .route("/api/v1/auth/verifyOtp", post(auth::verify_otp))
        .route("/api/v1/auth/login", post(auth::login))
        .route("/api/v1/auth/logout", post(auth::logout))
        // GitHub OAuth endpoints
        .route("/api/v1/auth/github/login", get(github::github_login))
        .route("/api/v1/auth/github/callback", get(github::github_callback))
        .route("/api/v1/auth/github/logout", post(github::github_logout))
        // User endpoints
        .route("/api/v1/user/me", get(user::me))
        .route("/api/v1/user/resetPassword", post(user::reset_password))
}
