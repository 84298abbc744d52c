//! Session token issuing and cookie handling.
//!
//! Two independent cookie slots exist concurrently: `SessionID` for
//! local password/OTP-verified sessions (1 day) and `githubAuthToken`
//! for GitHub-derived sessions (30 days, carrying the upstream access
//! token as a passthrough claim). Both are HS256 JWTs signed with the
//! shared access-token secret.

use crate::models::now_unix;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};

/// Cookie name for local password/OTP sessions.
pub const LOCAL_SESSION_COOKIE: &str = "SessionID";

/// Cookie name for GitHub-derived sessions.
pub const GITHUB_SESSION_COOKIE: &str = "githubAuthToken";

/// Claims for a local session.
#[derive(Debug, Serialize, Deserialize)]
pub struct SessionClaims {
    pub sub: String,
    pub exp: u64,
}

/// Claims for a GitHub session; `access_token` is re-validated live by the
/// auth gate against the GitHub API.
#[derive(Debug, Serialize, Deserialize)]
pub struct GithubSessionClaims {
    pub sub: String,
    pub access_token: String,
    pub exp: u64,
}

/// Mint a local session token with the subject email.
pub fn issue_session(
    email: &str,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = SessionClaims {
        sub: email.to_string(),
        exp: now_unix() + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate signature and expiry of a local session token.
pub fn decode_session(token: &str, secret: &str) -> Result<SessionClaims, jsonwebtoken::errors::Error> {
    let data = decode::<SessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Mint a GitHub session token embedding the upstream access token.
pub fn issue_github_session(
    email: &str,
    access_token: &str,
    secret: &str,
    ttl_secs: u64,
) -> Result<String, jsonwebtoken::errors::Error> {
    let claims = GithubSessionClaims {
        sub: email.to_string(),
        access_token: access_token.to_string(),
        exp: now_unix() + ttl_secs,
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
}

/// Validate signature and expiry of a GitHub session token.
pub fn decode_github_session(
    token: &str,
    secret: &str,
) -> Result<GithubSessionClaims, jsonwebtoken::errors::Error> {
    let data = decode::<GithubSessionClaims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )?;
    Ok(data.claims)
}

/// Set-Cookie value for a session cookie.
///
/// HttpOnly + Secure + SameSite=None so the cross-site frontend can carry
/// the cookie on credentialed requests.
pub fn session_cookie(name: &str, token: &str, max_age_secs: u64) -> String {
    format!(
        "{}={}; Max-Age={}; Path=/; HttpOnly; Secure; SameSite=None",
        name, token, max_age_secs
    )
}

/// Set-Cookie value that clears a session cookie.
///
/// Path must match what was set or browsers will not remove it.
pub fn clear_session_cookie(name: &str) -> String {
    format!(
        "{}=; Max-Age=0; Path=/; HttpOnly; Secure; SameSite=None",
        name
    )
}
