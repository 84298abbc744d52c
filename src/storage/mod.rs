//! Redis storage layer for users and pending OTP verifications.
//!
//! All functions are async and use redis::AsyncCommands.
//! Data is serialized to JSON for storage in Redis.

pub mod otp;
pub mod user;

/// Wrap a serde_json failure as a RedisError so storage functions keep a
/// single error type.
pub(crate) fn json_err(context: &'static str, err: serde_json::Error) -> redis::RedisError {
    redis::RedisError::from((
        redis::ErrorKind::TypeError,
        context,
        err.to_string(),
    ))
}
