//! GitHub OAuth endpoints: authorize redirect, callback exchange, logout.

use crate::auth::middleware::{parse_cookies, AppState};
use crate::auth::token::{
    clear_session_cookie, issue_github_session, session_cookie, GITHUB_SESSION_COOKIE,
};
use crate::error::{envelope, ApiError};
use crate::models::{now_unix, GithubEmail, GithubProfile, StoredUser};
use crate::storage;
use crate::validate;
use axum::{
    extract::{Query, State},
    http::{header::SET_COOKIE, HeaderMap, StatusCode},
    response::{IntoResponse, Redirect},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use rand::Rng;
use serde::Deserialize;
use serde_json::Value;

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AccessTokenResponse {
    access_token: Option<String>,
}

/// GET /api/v1/auth/github/login — Redirect to the GitHub authorize page
pub async fn github_login(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let github = state
        .config
        .github
        .as_ref()
        .ok_or_else(|| ApiError::Internal("GitHub OAuth is not configured".to_string()))?;

    // CSRF nonce; GitHub echoes it back on the callback.
    let mut bytes = [0u8; 16];
    rand::rng().fill(&mut bytes);
    let nonce = general_purpose::URL_SAFE_NO_PAD.encode(bytes);

    let url = format!(
        "{}/login/oauth/authorize?client_id={}&redirect_uri={}&scope=user:email&state={}",
        state.config.github_oauth_base, github.client_id, github.callback_url, nonce
    );

    Ok(Redirect::temporary(&url))
}

/// GET /api/v1/auth/github/callback — Exchange the code, upsert the user,
/// set the GitHub session cookie, and bounce back to the app.
pub async fn github_callback(
    State(state): State<AppState>,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let github = state
        .config
        .github
        .as_ref()
        .ok_or_else(|| ApiError::Internal("GitHub OAuth is not configured".to_string()))?;

    let code = query
        .code
        .ok_or_else(|| ApiError::Internal("Missing authorization code".to_string()))?;

    // Code -> access token
    let token_response: AccessTokenResponse = state
        .http
        .post(format!(
            "{}/login/oauth/access_token",
            state.config.github_oauth_base
        ))
        .header("Accept", "application/json")
        .form(&[
            ("client_id", github.client_id.as_str()),
            ("client_secret", github.client_secret.as_str()),
            ("code", code.as_str()),
            ("redirect_uri", github.callback_url.as_str()),
        ])
        .send()
        .await
        .map_err(|e| ApiError::Internal(format!("GitHub token exchange failed: {}", e)))?
        .json()
        .await
        .map_err(|e| ApiError::Internal(format!("GitHub token exchange failed: {}", e)))?;

    let access_token = token_response
        .access_token
        .ok_or_else(|| ApiError::Internal("GitHub token exchange failed".to_string()))?;

    // Access token -> profile
    let profile: GithubProfile = state
        .http
        .get(format!("{}/user", state.config.github_api_base))
        .bearer_auth(&access_token)
        .header("User-Agent", "opportune-auth")
        .send()
        .await
        .map_err(|e| ApiError::Internal(format!("GitHub profile fetch failed: {}", e)))?
        .json()
        .await
        .map_err(|e| ApiError::Internal(format!("GitHub profile fetch failed: {}", e)))?;

    let email = match &profile.email {
        Some(email) => email.clone(),
        None => primary_email(&state, &access_token).await?,
    };
    let email = validate::normalize_email(&email);

    let mut con = state
        .redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| ApiError::Internal(format!("Redis connection error: {}", e)))?;

    if storage::user::get_user_by_email(&mut con, &email)
        .await?
        .is_none()
    {
        let user = StoredUser {
            id: nanoid::nanoid!(12),
            name: profile.name.clone().unwrap_or_else(|| profile.login.clone()),
            username: profile.login.clone(),
            email: email.clone(),
            password_hash: None,
            phone: None,
            github_id: Some(profile.id.to_string()),
            created_at: now_unix(),
        };

        if !storage::user::create_user(&mut con, &user).await? {
            // Lost a race with a concurrent callback; the record now exists.
            if storage::user::get_user_by_email(&mut con, &email)
                .await?
                .is_none()
            {
                return Err(ApiError::Internal(
                    "GitHub login name is already taken".to_string(),
                ));
            }
        } else {
            tracing::info!(action = "user_created", email = %email, username = %profile.login, "User created via GitHub OAuth");
        }
    }

    let token = issue_github_session(
        &email,
        &access_token,
        &state.config.access_token_secret,
        state.config.github_session_ttl_secs,
    )
    .map_err(|e| ApiError::Internal(format!("Token signing error: {}", e)))?;
    let cookie = session_cookie(
        GITHUB_SESSION_COOKIE,
        &token,
        state.config.github_session_ttl_secs,
    );

    tracing::info!(action = "github_login", email = %email, "GitHub session issued");

    Ok((
        [(SET_COOKIE, cookie)],
        Redirect::to(&state.config.post_auth_redirect_url),
    ))
}

/// Look up the primary verified address when the profile hides its email.
async fn primary_email(state: &AppState, access_token: &str) -> Result<String, ApiError> {
    let emails: Vec<GithubEmail> = state
        .http
        .get(format!("{}/user/emails", state.config.github_api_base))
        .bearer_auth(access_token)
        .header("User-Agent", "opportune-auth")
        .send()
        .await
        .map_err(|e| ApiError::Internal(format!("GitHub email fetch failed: {}", e)))?
        .json()
        .await
        .map_err(|e| ApiError::Internal(format!("GitHub email fetch failed: {}", e)))?;

    emails
        .iter()
        .find(|e| e.primary && e.verified)
        .or_else(|| emails.first())
        .map(|e| e.email.clone())
        .ok_or_else(|| ApiError::Internal("No primary email found".to_string()))
}

/// POST /api/v1/auth/github/logout — Clear the GitHub session cookie
pub async fn github_logout(headers: HeaderMap) -> Result<impl IntoResponse, ApiError> {
    let Some(cookie_header) = headers.get("cookie").and_then(|v| v.to_str().ok()) else {
        return Ok(StatusCode::NO_CONTENT.into_response());
    };

    let cookies = parse_cookies(cookie_header);
    if cookies.is_empty() {
        return Ok(StatusCode::NO_CONTENT.into_response());
    }

    if !cookies.contains_key(GITHUB_SESSION_COOKIE) {
        return Err(ApiError::InvalidOperation(
            "Invalid operation: No token found".to_string(),
        ));
    }

    tracing::info!(action = "github_logout", "GitHub session cleared");

    Ok((
        StatusCode::OK,
        [(SET_COOKIE, clear_session_cookie(GITHUB_SESSION_COOKIE))],
        Json(envelope("User has been Logout", None, Value::Null)),
    )
        .into_response())
}
