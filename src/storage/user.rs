//! Durable user (credential store) Redis operations.
//!
//! Redis key patterns:
//! - `user:{email}` — user record (JSON), keyed by normalized email
//! - `username:{username_lowercase}` — case-insensitive username index
//!   mapping to the owning email (STRING)
//!
//! Email and username uniqueness are enforced at write time: record
//! creation is a single Lua script that refuses to overwrite either key.

use crate::models::StoredUser;
use redis::AsyncCommands;

fn user_key(email: &str) -> String {
    format!("user:{}", email)
}

fn username_key(username: &str) -> String {
    format!("username:{}", username.to_lowercase())
}

/// Create a user record if neither the email nor the username is taken.
///
/// Returns false without writing anything when either key already exists.
pub async fn create_user<C>(con: &mut C, user: &StoredUser) -> Result<bool, redis::RedisError>
where
    C: AsyncCommands,
{
    let json = serde_json::to_string(user).map_err(|e| super::json_err("JSON serialize", e))?;

    // Atomic existence check + double write; both keys or neither.
    let script = redis::Script::new(
        r"
        if redis.call('EXISTS', KEYS[1]) == 1 or redis.call('EXISTS', KEYS[2]) == 1 then
            return 0
        end
        redis.call('SET', KEYS[1], ARGV[1])
        redis.call('SET', KEYS[2], ARGV[2])
        return 1
        ",
    );

    let created: i32 = script
        .key(user_key(&user.email))
        .key(username_key(&user.username))
        .arg(json)
        .arg(&user.email)
        .invoke_async(con)
        .await?;

    Ok(created == 1)
}

/// Overwrite an existing user record in place.
///
/// Email and username are immutable, so the index key needs no update.
pub async fn update_user<C>(con: &mut C, user: &StoredUser) -> Result<(), redis::RedisError>
where
    C: AsyncCommands,
{
    let json = serde_json::to_string(user).map_err(|e| super::json_err("JSON serialize", e))?;
    con.set(user_key(&user.email), json).await
}

/// Get a user by normalized email.
pub async fn get_user_by_email<C>(
    con: &mut C,
    email: &str,
) -> Result<Option<StoredUser>, redis::RedisError>
where
    C: AsyncCommands,
{
    let json: Option<String> = con.get(user_key(email)).await?;

    match json {
        Some(data) => {
            let user =
                serde_json::from_str(&data).map_err(|e| super::json_err("JSON deserialize", e))?;
            Ok(Some(user))
        }
        None => Ok(None),
    }
}
