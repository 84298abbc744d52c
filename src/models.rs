//! Request and response models for the API.
//!
//! All models use serde for serialization/deserialization.
//! Storage models represent Redis data structures.

use serde::{Deserialize, Serialize};

// ============================================================================
// Auth Requests
// ============================================================================

/// Request body for signup.
#[derive(Debug, Deserialize)]
pub struct SignupRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for OTP resend and forgot-password.
#[derive(Debug, Deserialize)]
pub struct EmailRequest {
    #[serde(default)]
    pub email: String,
}

/// Submitted OTP code; clients send either a JSON number or a string.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum OtpSubmission {
    Number(u64),
    Text(String),
}

impl OtpSubmission {
    /// Coerce to the comparable string form used against the stored code.
    pub fn as_code(&self) -> String {
        match self {
            OtpSubmission::Number(n) => n.to_string(),
            OtpSubmission::Text(s) => s.trim().to_string(),
        }
    }
}

/// Request body for OTP verification.
#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    #[serde(default)]
    pub email: String,
    pub otp: Option<OtpSubmission>,
}

/// Request body for password login.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Request body for completing a password reset.
#[derive(Debug, Deserialize)]
pub struct ResetPasswordRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

// ============================================================================
// Responses
// ============================================================================

/// Identity fields returned on successful verification and login.
#[derive(Debug, Serialize)]
pub struct IdentityData {
    pub username: String,
    pub email: String,
}

// ============================================================================
// GitHub Upstream Models
// ============================================================================

/// Subset of the GitHub `/user` profile the service consumes.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubProfile {
    pub login: String,
    pub id: u64,
    pub name: Option<String>,
    pub email: Option<String>,
}

/// Entry of the GitHub `/user/emails` listing.
#[derive(Debug, Clone, Deserialize)]
pub struct GithubEmail {
    pub email: String,
    pub primary: bool,
    pub verified: bool,
}

// ============================================================================
// Storage Models
// ============================================================================

/// Optional structured phone number on a user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Phone {
    pub country_code: String,
    pub number: String,
}

/// Durable user record as stored in Redis.
///
/// `password_hash` is None for OAuth-only accounts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredUser {
    pub id: String,
    pub name: String,
    pub username: String,
    pub email: String,
    pub password_hash: Option<String>,
    pub phone: Option<Phone>,
    pub github_id: Option<String>,
    pub created_at: u64,
}

/// Transient OTP record staged between signup and verification.
///
/// Staged fields are None when the record was created by the
/// password-reset flow.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PendingVerification {
    pub name: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub email: String,
    pub otp: u32,
    pub attempts: u32,
    pub created_at: u64,
}

/// Current unix timestamp in seconds.
pub fn now_unix() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_submission_number_coercion() {
        let json = r#"{"email":"a@x.com","otp":123456}"#;
        let req: VerifyOtpRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.otp.unwrap().as_code(), "123456");
    }

    #[test]
    fn test_otp_submission_string_coercion() {
        let json = r#"{"email":"a@x.com","otp":"123456"}"#;
        let req: VerifyOtpRequest = serde_json::from_str(json).unwrap();
        assert_eq!(req.otp.unwrap().as_code(), "123456");
    }

    #[test]
    fn test_otp_submission_missing() {
        let json = r#"{"email":"a@x.com"}"#;
        let req: VerifyOtpRequest = serde_json::from_str(json).unwrap();
        assert!(req.otp.is_none());
    }

    #[test]
    fn test_stored_user_round_trip() {
        let user = StoredUser {
            id: "abc123def456".to_string(),
            name: "John Doe".to_string(),
            username: "johndoe".to_string(),
            email: "johndoe@gmail.com".to_string(),
            password_hash: Some("$2b$12$hash".to_string()),
            phone: Some(Phone {
                country_code: "+91".to_string(),
                number: "7785877858".to_string(),
            }),
            github_id: None,
            created_at: 1_700_000_000,
        };

        let json = serde_json::to_string(&user).unwrap();
        let back: StoredUser = serde_json::from_str(&json).unwrap();
        assert_eq!(back.email, user.email);
        assert_eq!(back.password_hash, user.password_hash);
        assert!(back.github_id.is_none());
    }

    #[test]
    fn test_pending_verification_reset_flow_fields() {
        // Password-reset records stage no signup fields
        let pending = PendingVerification {
            name: None,
            username: None,
            password: None,
            email: "a@x.com".to_string(),
            otp: 123_456,
            attempts: 1,
            created_at: 1_700_000_000,
        };
        let json = serde_json::to_string(&pending).unwrap();
        let back: PendingVerification = serde_json::from_str(&json).unwrap();
        assert!(back.name.is_none());
        assert_eq!(back.otp, 123_456);
    }
}
