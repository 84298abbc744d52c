//! OTP engine: issues, resends, and verifies one-time codes against the
//! pending-verification store, promoting staged signup data to a durable
//! user on success.
//!
//! The attempt budget gates resends only; incorrect verification attempts
//! do not consume it.

use crate::auth::password::hash_password;
use crate::email::Mailer;
use crate::error::{ApiError, OtpError};
use crate::models::{now_unix, PendingVerification, StoredUser};
use crate::storage;
use crate::storage::otp::ResendOutcome;
use rand::Rng;
use redis::AsyncCommands;

/// Generate a 6-digit code, uniform in [100000, 999999].
pub fn generate_code() -> u32 {
    rand::rng().random_range(100_000..=999_999)
}

/// Stage a signup and deliver its first OTP.
///
/// The issued code goes only to the mail delivery, never to the caller.
pub async fn request_signup_otp<C>(
    con: &mut C,
    mailer: &Mailer,
    ttl_secs: u64,
    name: &str,
    username: &str,
    email: &str,
    password: &str,
) -> Result<(), ApiError>
where
    C: AsyncCommands,
{
    if storage::user::get_user_by_email(con, email).await?.is_some() {
        return Err(ApiError::ExistingUser("User already exist".to_string()));
    }

    let code = generate_code();
    let pending = PendingVerification {
        name: Some(name.to_string()),
        username: Some(username.to_string()),
        password: Some(password.to_string()),
        email: email.to_string(),
        otp: code,
        attempts: 1,
        created_at: now_unix(),
    };

    let created = storage::otp::create_pending(con, &pending, ttl_secs).await?;
    if !created {
        return Err(ApiError::ExistingUser("OTP Already Sent".to_string()));
    }

    mailer.send_otp(email, code).await?;

    tracing::info!(action = "otp_issued", email = %email, "Signup OTP issued");
    Ok(())
}

/// Regenerate and redeliver the code for an existing pending verification.
pub async fn resend_otp<C>(
    con: &mut C,
    mailer: &Mailer,
    ttl_secs: u64,
    email: &str,
) -> Result<(), ApiError>
where
    C: AsyncCommands,
{
    if storage::user::get_user_by_email(con, email).await?.is_some() {
        return Err(ApiError::ExistingUser("User already exist".to_string()));
    }

    let code = generate_code();
    match storage::otp::resend_pending(con, email, code, ttl_secs).await? {
        ResendOutcome::Missing => Err(OtpError::SessionExpired.into()),
        ResendOutcome::LimitReached => Err(OtpError::TooManyAttempts.into()),
        ResendOutcome::Updated => {
            mailer.send_otp(email, code).await?;
            tracing::info!(action = "otp_resent", email = %email, "OTP regenerated");
            Ok(())
        }
    }
}

/// Start (or refresh) a password-reset verification for an existing user.
///
/// An existing pending record is treated as a resend; otherwise a fresh
/// record is created with no staged signup fields.
pub async fn request_password_reset_otp<C>(
    con: &mut C,
    mailer: &Mailer,
    ttl_secs: u64,
    email: &str,
) -> Result<(), ApiError>
where
    C: AsyncCommands,
{
    if storage::user::get_user_by_email(con, email).await?.is_none() {
        return Err(ApiError::InvalidOperation(
            "Invalid operation: No user found".to_string(),
        ));
    }

    let code = generate_code();
    match storage::otp::resend_pending(con, email, code, ttl_secs).await? {
        ResendOutcome::LimitReached => return Err(OtpError::TooManyAttempts.into()),
        ResendOutcome::Updated => {}
        ResendOutcome::Missing => {
            let pending = PendingVerification {
                name: None,
                username: None,
                password: None,
                email: email.to_string(),
                otp: code,
                attempts: 1,
                created_at: now_unix(),
            };
            // A concurrent request may have created the record between the
            // two calls; falling back to its code keeps the flows identical.
            if !storage::otp::create_pending(con, &pending, ttl_secs).await? {
                return resend_via_existing(con, mailer, ttl_secs, email).await;
            }
        }
    }

    mailer.send_otp(email, code).await?;

    tracing::info!(action = "otp_issued", email = %email, "Password-reset OTP issued");
    Ok(())
}

async fn resend_via_existing<C>(
    con: &mut C,
    mailer: &Mailer,
    ttl_secs: u64,
    email: &str,
) -> Result<(), ApiError>
where
    C: AsyncCommands,
{
    let code = generate_code();
    match storage::otp::resend_pending(con, email, code, ttl_secs).await? {
        ResendOutcome::Updated => {
            mailer.send_otp(email, code).await?;
            Ok(())
        }
        ResendOutcome::LimitReached => Err(OtpError::TooManyAttempts.into()),
        ResendOutcome::Missing => Err(OtpError::Expired.into()),
    }
}

/// Validate a submitted code and resolve the verified identity.
///
/// Promotes the staged signup fields to a new user unless one already
/// exists for this email (reset-style verification). The pending record is
/// deleted on success so a stale code cannot be replayed.
pub async fn verify_otp<C>(con: &mut C, email: &str, submitted: &str) -> Result<StoredUser, ApiError>
where
    C: AsyncCommands,
{
    let pending = storage::otp::get_pending(con, email)
        .await?
        .ok_or(OtpError::Expired)?;

    // Numeric-vs-string tolerant comparison: both sides as decimal strings.
    if pending.otp.to_string() != submitted {
        return Err(OtpError::IncorrectCode.into());
    }

    if let Some(existing) = storage::user::get_user_by_email(con, email).await? {
        storage::otp::delete_pending(con, email).await?;
        tracing::info!(action = "otp_verified", email = %email, "Existing user verified");
        return Ok(existing);
    }

    // Promotion path: the staged fields came from signup.
    let (name, username, password) = match (pending.name, pending.username, pending.password) {
        (Some(n), Some(u), Some(p)) => (n, u, p),
        _ => {
            return Err(ApiError::Internal(
                "Pending verification has no staged signup data".to_string(),
            ));
        }
    };

    let user = StoredUser {
        id: nanoid::nanoid!(12),
        name,
        username,
        email: email.to_string(),
        password_hash: Some(hash_password(&password)?),
        phone: None,
        github_id: None,
        created_at: now_unix(),
    };

    if !storage::user::create_user(con, &user).await? {
        return Err(ApiError::ExistingUser("User already exist".to_string()));
    }

    storage::otp::delete_pending(con, email).await?;

    tracing::info!(action = "user_created", email = %email, username = %user.username, "Pending verification promoted");
    Ok(user)
}
