//! The auth gate: an Axum extractor resolving an inbound request's
//! identity from its cookies.
//!
//! Two schemes are consulted, at most one per request:
//! - `SessionID` (local): JWT verified, subject resolved to a durable user.
//! - `githubAuthToken` (GitHub): JWT verified, then the embedded upstream
//!   access token is re-validated live against the GitHub API.
//!
//! The local cookie wins when both are present.

use crate::auth::token::{
    decode_github_session, decode_session, GITHUB_SESSION_COOKIE, LOCAL_SESSION_COOKIE,
};
use crate::config::Config;
use crate::email::Mailer;
use crate::error::ApiError;
use crate::models::GithubProfile;
use crate::storage;
use axum::{extract::FromRequestParts, http::request::Parts};
use std::collections::HashMap;
use std::sync::Arc;

/// Application state shared across handlers.
#[derive(Clone)]
pub struct AppState {
    pub redis: redis::Client,
    pub config: Arc<Config>,
    pub http: reqwest::Client,
    pub mailer: Arc<Mailer>,
}

/// Parse a Cookie header into a key→value mapping.
///
/// Malformed pairs (no `=`) are tolerated and map to an empty value.
pub fn parse_cookies(header: &str) -> HashMap<String, String> {
    header
        .split(';')
        .filter_map(|pair| {
            let pair = pair.trim();
            if pair.is_empty() {
                return None;
            }
            match pair.split_once('=') {
                Some((key, value)) => Some((key.trim().to_string(), value.trim().to_string())),
                None => Some((pair.to_string(), String::new())),
            }
        })
        .collect()
}

/// The authenticated identity attached to a request.
#[derive(Debug, Clone)]
pub enum Identity {
    /// Resolved from the local session cookie against the credential store.
    Local { id: String, email: String },
    /// Resolved from the GitHub session cookie and re-validated upstream.
    Github {
        login: String,
        github_id: u64,
        email: Option<String>,
    },
}

impl Identity {
    pub fn subject(&self) -> &str {
        match self {
            Identity::Local { email, .. } => email,
            Identity::Github { login, .. } => login,
        }
    }
}

/// Authenticated identity extractor. Rejects with 401 when no scheme
/// resolves.
pub struct AuthUser(pub Identity);

impl FromRequestParts<AppState> for AuthUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let cookie_header = parts
            .headers
            .get("cookie")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| ApiError::Authentication("Token not found".to_string()))?;

        let cookies = parse_cookies(cookie_header);

        if let Some(token) = cookies.get(LOCAL_SESSION_COOKIE) {
            return resolve_local(state, token).await.map(AuthUser);
        }

        if let Some(token) = cookies.get(GITHUB_SESSION_COOKIE) {
            return resolve_github(state, token).await.map(AuthUser);
        }

        Err(ApiError::Authentication("Token not found".to_string()))
    }
}

async fn resolve_local(state: &AppState, token: &str) -> Result<Identity, ApiError> {
    let claims = decode_session(token, &state.config.access_token_secret)
        .map_err(|_| ApiError::Authentication("Session Expired".to_string()))?;

    let mut con = state
        .redis
        .get_multiplexed_async_connection()
        .await
        .map_err(|e| ApiError::Internal(format!("Redis connection error: {}", e)))?;

    // A decoded subject that no longer resolves is a server-side
    // inconsistency, not an authentication failure.
    let user = storage::user::get_user_by_email(&mut con, &claims.sub)
        .await?
        .ok_or_else(|| ApiError::Internal("Session subject no longer exists".to_string()))?;

    Ok(Identity::Local {
        id: user.id,
        email: user.email,
    })
}

async fn resolve_github(state: &AppState, token: &str) -> Result<Identity, ApiError> {
    let claims = decode_github_session(token, &state.config.access_token_secret)
        .map_err(|_| ApiError::Authentication("Session Expired".to_string()))?;

    // Live re-validation of the embedded upstream token.
    let response = state
        .http
        .get(format!("{}/user", state.config.github_api_base))
        .bearer_auth(&claims.access_token)
        .header("User-Agent", "opportune-auth")
        .send()
        .await
        .map_err(|_| ApiError::Authentication("GitHub token validation failed".to_string()))?;

    if !response.status().is_success() {
        return Err(ApiError::Authentication(
            "GitHub token validation failed".to_string(),
        ));
    }

    let profile: GithubProfile = response
        .json()
        .await
        .map_err(|_| ApiError::Authentication("GitHub token validation failed".to_string()))?;

    Ok(Identity::Github {
        login: profile.login,
        github_id: profile.id,
        email: profile.email,
    })
}
