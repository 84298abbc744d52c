//! Error types and Axum response conversions.
//!
//! Every failure path maps to the uniform `{ message, error, data }`
//! envelope used across the API.

use axum::{
    extract::{rejection::JsonRejection, FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

/// Build the uniform response envelope.
pub fn envelope(message: &str, error: Option<&str>, data: Value) -> Value {
    json!({
        "message": message,
        "error": error,
        "data": data,
    })
}

/// OTP-specific failures, each with its own HTTP shape.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum OtpError {
    /// No pending verification exists; the caller must restart signup.
    #[error("Session expires Signup Again")]
    SessionExpired,

    /// The resend attempt budget (3) is exhausted for this record.
    #[error("Too many attempts")]
    TooManyAttempts,

    /// No pending verification was found at verify time.
    #[error("OTP expired. Request new one.")]
    Expired,

    /// Submitted code does not match the stored code.
    #[error("Incorrect OTP")]
    IncorrectCode,
}

impl OtpError {
    fn status(&self) -> StatusCode {
        match self {
            OtpError::SessionExpired => StatusCode::UNAUTHORIZED,
            OtpError::TooManyAttempts => StatusCode::TOO_MANY_REQUESTS,
            OtpError::Expired => StatusCode::GONE,
            OtpError::IncorrectCode => StatusCode::UNAUTHORIZED,
        }
    }

    fn tag(&self) -> &'static str {
        match self {
            OtpError::SessionExpired | OtpError::TooManyAttempts => "otp_error",
            OtpError::Expired => "otp_expired",
            OtpError::IncorrectCode => "verification_failed",
        }
    }
}

/// Application error types.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    Validation(String),

    #[error("{0}")]
    ExistingUser(String),

    #[error("{0}")]
    InvalidOperation(String),

    #[error(transparent)]
    Otp(#[from] OtpError),

    #[error("{0}")]
    EmailDelivery(String),

    #[error("{0}")]
    Authentication(String),

    #[error("Invalid email address")]
    InvalidEmail,

    #[error("Invalid password")]
    InvalidPassword,

    #[error("Invalid Operation")]
    UserNotFound,

    #[error("The new password cannot be the same as the old password. Please choose a different password.")]
    PasswordReuse,

    #[error("{0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, tag, message) = match &self {
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "validation_error", msg.clone()),
            ApiError::ExistingUser(msg) => (StatusCode::CONFLICT, "existing_user", msg.clone()),
            ApiError::InvalidOperation(msg) => {
                (StatusCode::BAD_REQUEST, "invalid_operation", msg.clone())
            }
            ApiError::Otp(err) => (err.status(), err.tag(), err.to_string()),
            ApiError::EmailDelivery(msg) => (StatusCode::BAD_GATEWAY, "email_error", msg.clone()),
            ApiError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, "authentication_error", msg.clone())
            }
            ApiError::InvalidEmail => (
                StatusCode::UNAUTHORIZED,
                "invalid_email",
                self.to_string(),
            ),
            ApiError::InvalidPassword => (
                StatusCode::UNAUTHORIZED,
                "invalid_password",
                self.to_string(),
            ),
            ApiError::UserNotFound => {
                (StatusCode::BAD_REQUEST, "user_not_found", self.to_string())
            }
            ApiError::PasswordReuse => {
                (StatusCode::BAD_REQUEST, "password_error", self.to_string())
            }
            ApiError::Internal(msg) => {
                tracing::error!(error = %msg, "Internal server error");
                // The raw message is surfaced in the envelope; the upstream
                // backend behaves the same way.
                (StatusCode::INTERNAL_SERVER_ERROR, "server_error", msg.clone())
            }
        };

        let body = Json(envelope(&message, Some(tag), Value::Null));
        (status, body).into_response()
    }
}

/// JSON body extractor whose rejection goes through the response envelope
/// instead of axum's plain-text default.
pub struct ApiJson<T>(pub T);

impl<S, T> FromRequest<S> for ApiJson<T>
where
    axum::Json<T>: FromRequest<S, Rejection = JsonRejection>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        match axum::Json::<T>::from_request(req, state).await {
            Ok(axum::Json(value)) => Ok(ApiJson(value)),
            Err(rejection) => Err(ApiError::Validation(rejection.body_text())),
        }
    }
}

// Convenience conversions from common error types
impl From<redis::RedisError> for ApiError {
    fn from(err: redis::RedisError) -> Self {
        ApiError::Internal(format!("Redis error: {}", err))
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        ApiError::Internal(format!("JSON error: {}", err))
    }
}

impl From<bcrypt::BcryptError> for ApiError {
    fn from(err: bcrypt::BcryptError) -> Self {
        ApiError::Internal(format!("Password hashing error: {}", err))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;

    /// Extract status code and JSON body from an ApiError response.
    async fn error_response(err: ApiError) -> (StatusCode, serde_json::Value) {
        let response = err.into_response();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json: serde_json::Value = serde_json::from_slice(&body).unwrap();
        (status, json)
    }

    #[tokio::test]
    async fn test_envelope_shape() {
        let (_, body) = error_response(ApiError::Validation("Name is a required field".into())).await;
        assert!(body.get("message").is_some());
        assert!(body.get("error").is_some());
        assert!(body.get("data").is_some());
        assert_eq!(body["data"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_validation_error() {
        let (status, body) =
            error_response(ApiError::Validation("Email is a required field".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Email is a required field");
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_existing_user() {
        let (status, body) = error_response(ApiError::ExistingUser("User already exist".into())).await;
        assert_eq!(status, StatusCode::CONFLICT);
        assert_eq!(body["error"], "existing_user");
    }

    #[tokio::test]
    async fn test_otp_session_expired() {
        let (status, body) = error_response(OtpError::SessionExpired.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Session expires Signup Again");
        assert_eq!(body["error"], "otp_error");
    }

    #[tokio::test]
    async fn test_otp_too_many_attempts() {
        let (status, body) = error_response(OtpError::TooManyAttempts.into()).await;
        assert_eq!(status, StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(body["error"], "otp_error");
    }

    #[tokio::test]
    async fn test_otp_expired() {
        let (status, body) = error_response(OtpError::Expired.into()).await;
        assert_eq!(status, StatusCode::GONE);
        assert_eq!(body["message"], "OTP expired. Request new one.");
        assert_eq!(body["error"], "otp_expired");
    }

    #[tokio::test]
    async fn test_otp_incorrect_code() {
        let (status, body) = error_response(OtpError::IncorrectCode.into()).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Incorrect OTP");
        assert_eq!(body["error"], "verification_failed");
    }

    #[tokio::test]
    async fn test_email_delivery() {
        let (status, body) =
            error_response(ApiError::EmailDelivery("SMTP relay refused".into())).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "email_error");
    }

    #[tokio::test]
    async fn test_authentication() {
        let (status, body) = error_response(ApiError::Authentication("Token not found".into())).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "authentication_error");
    }

    #[tokio::test]
    async fn test_login_failures() {
        let (status, body) = error_response(ApiError::InvalidEmail).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid email address");
        assert_eq!(body["error"], "invalid_email");

        let (status, body) = error_response(ApiError::InvalidPassword).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["message"], "Invalid password");
        assert_eq!(body["error"], "invalid_password");
    }

    #[tokio::test]
    async fn test_reset_password_failures() {
        let (status, body) = error_response(ApiError::UserNotFound).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["message"], "Invalid Operation");
        assert_eq!(body["error"], "user_not_found");

        let (status, body) = error_response(ApiError::PasswordReuse).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "password_error");
    }

    async fn api_json_rejection(content_type: &str, body: &str) -> (StatusCode, serde_json::Value) {
        let request = Request::builder()
            .method("POST")
            .header("content-type", content_type)
            .body(axum::body::Body::from(body.to_string()))
            .unwrap();

        let err = ApiJson::<serde_json::Value>::from_request(request, &())
            .await
            .err()
            .expect("body should be rejected");
        error_response(err).await
    }

    #[tokio::test]
    async fn test_malformed_json_body_uses_envelope() {
        let (status, body) = api_json_rejection("application/json", "{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
        assert!(body.get("message").is_some());
        assert_eq!(body["data"], serde_json::Value::Null);
    }

    #[tokio::test]
    async fn test_wrong_content_type_uses_envelope() {
        let (status, body) = api_json_rejection("text/plain", "{}").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "validation_error");
    }

    #[tokio::test]
    async fn test_internal_surfaces_message() {
        let (status, body) = error_response(ApiError::Internal("boom".into())).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "boom");
        assert_eq!(body["error"], "server_error");
    }

    #[test]
    fn test_from_redis_error() {
        let redis_err = redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "test context",
            "connection refused".to_string(),
        ));
        let api_err = ApiError::from(redis_err);
        match api_err {
            ApiError::Internal(msg) => assert!(msg.contains("Redis error")),
            _ => panic!("Expected Internal variant"),
        }
    }

    #[test]
    fn test_from_serde_error() {
        let serde_err = serde_json::from_str::<serde_json::Value>("not json").unwrap_err();
        let api_err = ApiError::from(serde_err);
        match api_err {
            ApiError::Internal(msg) => assert!(msg.contains("JSON error")),
            _ => panic!("Expected Internal variant"),
        }
    }
}
