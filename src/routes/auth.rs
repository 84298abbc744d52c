//! Local auth endpoints: signup, OTP lifecycle, login, logout.

use crate::auth::middleware::{parse_cookies, AppState};
use crate::auth::otp;
use crate::auth::password::verify_password;
use crate::auth::token::{
    clear_session_cookie, issue_session, session_cookie, LOCAL_SESSION_COOKIE,
};
use crate::error::{envelope, ApiError, ApiJson};
use crate::models::{EmailRequest, IdentityData, LoginRequest, SignupRequest, VerifyOtpRequest};
use crate::routes::redis_con;
use crate::storage;
use crate::validate;
use axum::{
    extract::State,
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::IntoResponse,
    Json,
};
use serde_json::Value;

/// POST /api/v1/auth/signup — Stage a signup and send the first OTP
pub async fn signup(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<SignupRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::validate_signup(&req)?;
    let email = validate::normalize_email(&req.email);

    let mut con = redis_con(&state).await?;
    otp::request_signup_otp(
        &mut con,
        &state.mailer,
        state.config.otp_ttl_secs,
        req.name.trim(),
        &req.username,
        &email,
        &req.password,
    )
    .await?;

    Ok((
        StatusCode::CREATED,
        Json(envelope("OTP sent successfully", None, Value::Null)),
    ))
}

/// POST /api/v1/auth/resendOtp — Regenerate and redeliver the OTP
pub async fn resend_otp(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::validate_email(req.email.trim())?;
    let email = validate::normalize_email(&req.email);

    let mut con = redis_con(&state).await?;
    otp::resend_otp(&mut con, &state.mailer, state.config.otp_ttl_secs, &email).await?;

    Ok((
        StatusCode::CREATED,
        Json(envelope("OTP sent successfully", None, Value::Null)),
    ))
}

/// POST /api/v1/auth/forgetPassword — Start a password-reset verification
pub async fn forget_password(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<EmailRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::validate_email(req.email.trim())?;
    let email = validate::normalize_email(&req.email);

    let mut con = redis_con(&state).await?;
    otp::request_password_reset_otp(&mut con, &state.mailer, state.config.otp_ttl_secs, &email)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(envelope("OTP sent successfully", None, Value::Null)),
    ))
}

/// POST /api/v1/auth/verifyOtp — Verify the code and open a session
pub async fn verify_otp(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<VerifyOtpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::validate_email(req.email.trim())?;
    let submitted = req
        .otp
        .as_ref()
        .map(|otp| otp.as_code())
        .filter(|code| !code.is_empty())
        .ok_or_else(|| ApiError::Validation("OTP is a required field".to_string()))?;
    let email = validate::normalize_email(&req.email);

    let mut con = redis_con(&state).await?;
    let user = otp::verify_otp(&mut con, &email, &submitted).await?;

    let token = issue_session(
        &user.email,
        &state.config.access_token_secret,
        state.config.session_ttl_secs,
    )
    .map_err(|e| ApiError::Internal(format!("Token signing error: {}", e)))?;
    let cookie = session_cookie(LOCAL_SESSION_COOKIE, &token, state.config.session_ttl_secs);

    let data = serde_json::to_value(IdentityData {
        username: user.username,
        email: user.email,
    })?;

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(envelope("Verification successful", None, data)),
    ))
}

/// POST /api/v1/auth/login — Password login
pub async fn login(
    State(state): State<AppState>,
    ApiJson(req): ApiJson<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    validate::validate_email(req.email.trim())?;
    if req.password.is_empty() {
        return Err(ApiError::Validation("Password is required".to_string()));
    }
    let email = validate::normalize_email(&req.email);

    let mut con = redis_con(&state).await?;
    let user = storage::user::get_user_by_email(&mut con, &email)
        .await?
        .ok_or(ApiError::InvalidEmail)?;

    // OAuth-only accounts have no password to check against.
    let password_hash = user.password_hash.as_deref().ok_or(ApiError::InvalidPassword)?;
    if !verify_password(&req.password, password_hash)? {
        tracing::warn!(action = "login_failed", email = %email, "Invalid password");
        return Err(ApiError::InvalidPassword);
    }

    let token = issue_session(
        &user.email,
        &state.config.access_token_secret,
        state.config.session_ttl_secs,
    )
    .map_err(|e| ApiError::Internal(format!("Token signing error: {}", e)))?;
    let cookie = session_cookie(LOCAL_SESSION_COOKIE, &token, state.config.session_ttl_secs);

    let data = serde_json::to_value(IdentityData {
        username: user.username,
        email: user.email,
    })?;

    tracing::info!(action = "login", email = %email, "User logged in");

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, cookie)],
        Json(envelope("Logged in Successfully", None, data)),
    ))
}

/// POST /api/v1/auth/logout — Clear the local session cookie
///
/// No cookies at all is a no-op (204); cookies without a local session
/// are an invalid operation (400). The token is not decoded: clearing an
/// already-expired session must still succeed.
pub async fn logout(headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let Some(cookie_header) = headers.get("cookie").and_then(|v| v.to_str().ok()) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let cookies = parse_cookies(cookie_header);
    if cookies.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    if !cookies.contains_key(LOCAL_SESSION_COOKIE) {
        return Err(ApiError::InvalidOperation(
            "Invalid operation: No token found".to_string(),
        ));
    }

    tracing::info!(action = "logout", "Local session cleared");

    Ok((
        StatusCode::CREATED,
        [(SET_COOKIE, clear_session_cookie(LOCAL_SESSION_COOKIE))],
        Json(envelope("User has been Logout", None, Value::Null)),
    )
        .into_response())
}
