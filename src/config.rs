use std::env;
use std::net::SocketAddr;

/// GitHub OAuth application settings. Present only when all three
/// variables are configured; the GitHub routes reject otherwise.
#[derive(Clone)]
pub struct GithubOauthConfig {
    pub client_id: String,
    pub client_secret: String,
    pub callback_url: String,
}

/// SMTP transport settings. When absent the mailer runs in log-only mode.
#[derive(Clone)]
pub struct SmtpConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    pub from: String,
}

#[derive(Clone)]
pub struct Config {
    // Session signing
    pub access_token_secret: String,

    // Redis
    pub redis_url: String,

    // Server
    pub bind_addr: SocketAddr,

    // Cross-origin frontend (credentials-mode CORS); None disables CORS
    pub allowed_origin: Option<String>,

    // TTLs (in seconds)
    pub otp_ttl_secs: u64,
    pub session_ttl_secs: u64,
    pub github_session_ttl_secs: u64,

    // GitHub OAuth
    pub github: Option<GithubOauthConfig>,
    pub github_oauth_base: String,
    pub github_api_base: String,
    pub post_auth_redirect_url: String,

    // Mail
    pub smtp: Option<SmtpConfig>,
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("access_token_secret", &"[REDACTED]")
            .field("redis_url", &"[REDACTED]")
            .field("bind_addr", &self.bind_addr)
            .field("allowed_origin", &self.allowed_origin)
            .field("otp_ttl_secs", &self.otp_ttl_secs)
            .field("session_ttl_secs", &self.session_ttl_secs)
            .field("github_session_ttl_secs", &self.github_session_ttl_secs)
            .field("github", &self.github.as_ref().map(|g| g.client_id.as_str()))
            .field("github_oauth_base", &self.github_oauth_base)
            .field("github_api_base", &self.github_api_base)
            .field("post_auth_redirect_url", &self.post_auth_redirect_url)
            .field("smtp", &self.smtp.as_ref().map(|s| s.host.as_str()))
            .finish()
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {0}: {1}")]
    InvalidValue(String, String),

    #[error("Failed to parse {0}: {1}")]
    ParseError(String, String),
}

impl Config {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Attempt to load .env file, but don't fail if it doesn't exist
        // (env vars may be set directly in production)
        let _ = dotenvy::dotenv();

        // Session signing secret - required, shared by both cookie schemes
        let access_token_secret = env::var("ACCESS_TOKEN_SECRET")
            .map_err(|_| ConfigError::MissingVar("ACCESS_TOKEN_SECRET".to_string()))?;

        if access_token_secret.is_empty() {
            return Err(ConfigError::InvalidValue(
                "ACCESS_TOKEN_SECRET".to_string(),
                "cannot be empty".to_string(),
            ));
        }

        // Redis — required to prevent silent unauthenticated connections
        let redis_url =
            env::var("REDIS_URL").map_err(|_| ConfigError::MissingVar("REDIS_URL".to_string()))?;

        // Server
        let bind_addr_str = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".to_string());
        let bind_addr = bind_addr_str
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::ParseError("BIND_ADDR".to_string(), e.to_string()))?;

        let allowed_origin = env::var("ALLOWED_ORIGIN").ok().filter(|s| !s.is_empty());

        // TTLs
        let otp_ttl_secs = parse_env_or_default("OTP_TTL_SECS", 600)?;
        let session_ttl_secs = parse_env_or_default("SESSION_TTL_SECS", 86_400)?;
        let github_session_ttl_secs = parse_env_or_default("GITHUB_SESSION_TTL_SECS", 2_592_000)?;

        // GitHub OAuth app (optional as a group)
        let github = match (
            env::var("GITHUB_CLIENT_ID").ok().filter(|s| !s.is_empty()),
            env::var("GITHUB_CLIENT_SECRET").ok().filter(|s| !s.is_empty()),
            env::var("GITHUB_OAUTH_CALLBACK_URL")
                .ok()
                .filter(|s| !s.is_empty()),
        ) {
            (Some(client_id), Some(client_secret), Some(callback_url)) => Some(GithubOauthConfig {
                client_id,
                client_secret,
                callback_url,
            }),
            (None, None, None) => None,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "GITHUB_CLIENT_ID/GITHUB_CLIENT_SECRET/GITHUB_OAUTH_CALLBACK_URL".to_string(),
                    "must be set together or not at all".to_string(),
                ));
            }
        };

        let github_oauth_base =
            env::var("GITHUB_OAUTH_BASE").unwrap_or_else(|_| "https://github.com".to_string());
        let github_api_base =
            env::var("GITHUB_API_BASE").unwrap_or_else(|_| "https://api.github.com".to_string());
        let post_auth_redirect_url =
            env::var("POST_AUTH_REDIRECT_URL").unwrap_or_else(|_| "/".to_string());

        // SMTP (optional as a group; log-only delivery when absent)
        let smtp = match (
            env::var("SMTP_HOST").ok().filter(|s| !s.is_empty()),
            env::var("SMTP_USERNAME").ok().filter(|s| !s.is_empty()),
            env::var("SMTP_PASSWORD").ok().filter(|s| !s.is_empty()),
            env::var("EMAIL_FROM").ok().filter(|s| !s.is_empty()),
        ) {
            (Some(host), Some(username), Some(password), Some(from)) => Some(SmtpConfig {
                host,
                username,
                password,
                from,
            }),
            (None, _, _, _) => None,
            _ => {
                return Err(ConfigError::InvalidValue(
                    "SMTP_HOST/SMTP_USERNAME/SMTP_PASSWORD/EMAIL_FROM".to_string(),
                    "must be set together or not at all".to_string(),
                ));
            }
        };

        Ok(Config {
            access_token_secret,
            redis_url,
            bind_addr,
            allowed_origin,
            otp_ttl_secs,
            session_ttl_secs,
            github_session_ttl_secs,
            github,
            github_oauth_base,
            github_api_base,
            post_auth_redirect_url,
            smtp,
        })
    }
}

/// Helper function to parse environment variable with a default value
fn parse_env_or_default<T>(key: &str, default: T) -> Result<T, ConfigError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(val) => val
            .parse::<T>()
            .map_err(|e| ConfigError::ParseError(key.to_string(), format!("{}: {}", e, val))),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Use a mutex to ensure tests run serially since they modify global env vars.
    // unwrap_or_else handles poison from prior panics.
    static TEST_MUTEX: Mutex<()> = Mutex::new(());

    fn lock_test() -> std::sync::MutexGuard<'static, ()> {
        TEST_MUTEX.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn clear_test_env() {
        env::remove_var("ACCESS_TOKEN_SECRET");
        env::remove_var("REDIS_URL");
        env::remove_var("BIND_ADDR");
        env::remove_var("ALLOWED_ORIGIN");
        env::remove_var("OTP_TTL_SECS");
        env::remove_var("SESSION_TTL_SECS");
        env::remove_var("GITHUB_SESSION_TTL_SECS");
        env::remove_var("GITHUB_CLIENT_ID");
        env::remove_var("GITHUB_CLIENT_SECRET");
        env::remove_var("GITHUB_OAUTH_CALLBACK_URL");
        env::remove_var("GITHUB_OAUTH_BASE");
        env::remove_var("GITHUB_API_BASE");
        env::remove_var("POST_AUTH_REDIRECT_URL");
        env::remove_var("SMTP_HOST");
        env::remove_var("SMTP_USERNAME");
        env::remove_var("SMTP_PASSWORD");
        env::remove_var("EMAIL_FROM");
    }

    fn set_required() {
        env::set_var("ACCESS_TOKEN_SECRET", "test-secret");
        env::set_var("REDIS_URL", "redis://127.0.0.1:6379");
    }

    #[test]
    fn test_parse_env_or_default() {
        let _guard = lock_test();

        env::set_var("TEST_U64", "12345");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 12345);

        env::remove_var("TEST_U64");
        let result: Result<u64, ConfigError> = parse_env_or_default("TEST_U64", 100);
        assert_eq!(result.unwrap(), 100);
    }

    #[test]
    fn test_empty_secret_rejected() {
        let _guard = lock_test();
        clear_test_env();

        // Set to empty to prevent dotenvy from reloading a valid value from
        // .env (dotenvy doesn't override existing vars).
        env::set_var("ACCESS_TOKEN_SECRET", "");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(ref s, _) if s == "ACCESS_TOKEN_SECRET"
        ));

        clear_test_env();
    }

    #[test]
    fn test_invalid_socket_addr() {
        let _guard = lock_test();
        clear_test_env();
        set_required();

        env::set_var("BIND_ADDR", "invalid_address");

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(result.unwrap_err(), ConfigError::ParseError(_, _)));

        clear_test_env();
    }

    #[test]
    fn test_partial_github_config_rejected() {
        let _guard = lock_test();
        clear_test_env();
        set_required();

        env::set_var("GITHUB_CLIENT_ID", "client-id");
        // client secret and callback URL missing

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(_, _)
        ));

        clear_test_env();
    }

    #[test]
    fn test_partial_smtp_config_rejected() {
        let _guard = lock_test();
        clear_test_env();
        set_required();

        env::set_var("SMTP_HOST", "smtp.example.com");
        env::set_var("SMTP_USERNAME", "mailer");
        // password and from address missing

        let result = Config::from_env();
        assert!(result.is_err());
        assert!(matches!(
            result.unwrap_err(),
            ConfigError::InvalidValue(_, _)
        ));

        clear_test_env();
    }

    #[test]
    fn test_config_defaults() {
        let _guard = lock_test();
        clear_test_env();
        set_required();
        env::set_var("BIND_ADDR", "0.0.0.0:3000");

        let config = Config::from_env().unwrap();

        assert_eq!(config.access_token_secret, "test-secret");
        assert_eq!(config.redis_url, "redis://127.0.0.1:6379");
        assert_eq!(config.bind_addr.to_string(), "0.0.0.0:3000");
        assert!(config.allowed_origin.is_none());
        assert_eq!(config.otp_ttl_secs, 600);
        assert_eq!(config.session_ttl_secs, 86_400);
        assert_eq!(config.github_session_ttl_secs, 2_592_000);
        assert!(config.github.is_none());
        assert_eq!(config.github_oauth_base, "https://github.com");
        assert_eq!(config.github_api_base, "https://api.github.com");
        assert_eq!(config.post_auth_redirect_url, "/");
        assert!(config.smtp.is_none());

        clear_test_env();
    }

    #[test]
    fn test_full_github_config_accepted() {
        let _guard = lock_test();
        clear_test_env();
        set_required();

        env::set_var("GITHUB_CLIENT_ID", "client-id");
        env::set_var("GITHUB_CLIENT_SECRET", "client-secret");
        env::set_var("GITHUB_OAUTH_CALLBACK_URL", "https://api.example.com/cb");

        let config = Config::from_env().unwrap();
        let github = config.github.expect("github config should be present");
        assert_eq!(github.client_id, "client-id");
        assert_eq!(github.callback_url, "https://api.example.com/cb");

        clear_test_env();
    }

    #[test]
    fn test_debug_redacts_secrets() {
        let _guard = lock_test();
        clear_test_env();
        set_required();

        let config = Config::from_env().unwrap();
        let debug = format!("{:?}", config);
        assert!(!debug.contains("test-secret"));
        assert!(debug.contains("[REDACTED]"));

        clear_test_env();
    }
}
