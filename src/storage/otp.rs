//! Pending-verification (OTP record) Redis operations.
//!
//! Redis key patterns:
//! - `otp:{email}` — staged signup fields plus OTP state (JSON), expiring
//!   via key TTL
//!
//! The resend path is a single Lua script so two concurrent resends cannot
//! lose an attempt-counter update.

use crate::models::PendingVerification;
use redis::AsyncCommands;

/// Resend budget per pending record.
pub const MAX_ATTEMPTS: u32 = 3;

fn otp_key(email: &str) -> String {
    format!("otp:{}", email)
}

/// Outcome of an atomic resend mutation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResendOutcome {
    /// No record exists for this email (expired or never created).
    Missing,
    /// The attempt budget is exhausted; the record was left untouched.
    LimitReached,
    /// Code replaced, attempts incremented, TTL refreshed.
    Updated,
}

/// Create a pending verification if none exists for this email.
///
/// Returns false without writing when a record is already present.
pub async fn create_pending<C>(
    con: &mut C,
    pending: &PendingVerification,
    ttl_secs: u64,
) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let json = serde_json::to_string(pending).map_err(|e| super::json_err("JSON serialize", e))?;

    let set: Option<String> = redis::cmd("SET")
        .arg(otp_key(&pending.email))
        .arg(json)
        .arg("NX")
        .arg("EX")
        .arg(ttl_secs)
        .query_async(con)
        .await?;

    Ok(set.is_some())
}

/// Get the pending verification for an email, if any.
pub async fn get_pending<C>(
    con: &mut C,
    email: &str,
) -> Result<Option<PendingVerification>, redis::RedisError>
where
    C: AsyncCommands,
{
    let json: Option<String> = con.get(otp_key(email)).await?;

    match json {
        Some(data) => {
            let pending =
                serde_json::from_str(&data).map_err(|e| super::json_err("JSON deserialize", e))?;
            Ok(Some(pending))
        }
        None => Ok(None),
    }
}

/// Atomically check the attempt budget, swap in a fresh code, increment the
/// counter, and refresh the TTL.
pub async fn resend_pending<C>(
    con: &mut C,
    email: &str,
    new_code: u32,
    ttl_secs: u64,
) -> Result<ResendOutcome, redis::RedisError>
where
    C: AsyncCommands,
{
    let script = redis::Script::new(
        r"
        local val = redis.call('GET', KEYS[1])
        if not val then
            return 'missing'
        end
        local rec = cjson.decode(val)
        if rec['attempts'] >= tonumber(ARGV[2]) then
            return 'limit'
        end
        rec['otp'] = tonumber(ARGV[1])
        rec['attempts'] = rec['attempts'] + 1
        redis.call('SET', KEYS[1], cjson.encode(rec), 'EX', tonumber(ARGV[3]))
        return 'updated'
        ",
    );

    let outcome: String = script
        .key(otp_key(email))
        .arg(new_code)
        .arg(MAX_ATTEMPTS)
        .arg(ttl_secs)
        .invoke_async(con)
        .await?;

    match outcome.as_str() {
        "missing" => Ok(ResendOutcome::Missing),
        "limit" => Ok(ResendOutcome::LimitReached),
        "updated" => Ok(ResendOutcome::Updated),
        other => Err(redis::RedisError::from((
            redis::ErrorKind::TypeError,
            "resend script",
            format!("unexpected outcome: {}", other),
        ))),
    }
}

/// Delete the pending verification for an email.
///
/// Returns true if a record was deleted.
pub async fn delete_pending<C>(con: &mut C, email: &str) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let deleted: i32 = con.del(otp_key(email)).await?;
    Ok(deleted > 0)
}
