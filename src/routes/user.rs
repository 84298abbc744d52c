//! Endpoints consuming the authenticated identity.
//!
//! Downstream resource handlers (projects, profiles) live in their own
//! services; `me` is the identity echo they all build on.

use crate::auth::middleware::{AppState, AuthUser, Identity};
use crate::auth::password::{hash_password, verify_password};
use crate::error::{envelope, ApiError, ApiJson};
use crate::models::ResetPasswordRequest;
use crate::routes::redis_con;
use crate::storage;
use crate::validate;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

/// GET /api/v1/user/me — Return the caller's resolved identity
pub async fn me(AuthUser(identity): AuthUser) -> impl IntoResponse {
    let data = match identity {
        Identity::Local { id, email } => json!({
            "scheme": "local",
            "id": id,
            "email": email,
        }),
        Identity::Github {
            login,
            github_id,
            email,
        } => json!({
            "scheme": "github",
            "login": login,
            "github_id": github_id,
            "email": email,
        }),
    };

    (
        StatusCode::OK,
        Json(envelope("User details fetched successfully", None, data)),
    )
}

/// POST /api/v1/user/resetPassword — Set a new password after an OTP-verified
/// reset
///
/// The new password must differ from the current one. OAuth-only accounts
/// have no current password; for them this sets the first one.
pub async fn reset_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<ResetPasswordRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::validate_email(req.email.trim())?;
    validate::validate_password(&req.password)?;
    let email = validate::normalize_email(&req.email);

    let mut con = redis_con(&state).await?;
    let mut user = storage::user::get_user_by_email(&mut con, &email)
        .await?
        .ok_or(ApiError::UserNotFound)?;

    if let Some(current_hash) = user.password_hash.as_deref() {
        if verify_password(&req.password, current_hash)? {
            return Err(ApiError::PasswordReuse);
        }
    }

    user.password_hash = Some(hash_password(&req.password)?);
    storage::user::update_user(&mut con, &user).await?;

    tracing::info!(action = "password_reset", email = %email, "Password updated");

    Ok((
        StatusCode::OK,
        Json(envelope(
            "Password reset successfully.",
            None,
            json!({
                "name": user.name,
                "username": user.username,
                "email": user.email,
            }),
        )),
    ))
}
