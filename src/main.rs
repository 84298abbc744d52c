//! Opportune auth service entry point.
//!
//! Bootstraps the server:
//! 1. Load configuration from environment
//! 2. Connect to Redis
//! 3. Build the mailer (SMTP or log-only)
//! 4. Build router with API routes
//! 5. Apply CORS for the credentialed frontend origin
//! 6. Start Axum server

use axum::http::{header, HeaderValue, Method};
use opportune_auth::{auth::middleware::AppState, config::Config, email::Mailer, routes};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

#[tokio::main]
async fn main() {
    // Initialize tracing with env filter support (RUST_LOG)
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Load config from environment
    let config = Config::from_env().expect("Failed to load config");
    tracing::info!("Starting opportune-auth on {}", config.bind_addr);

    // Connect to Redis
    let redis_client = redis::Client::open(config.redis_url.as_str()).expect("Invalid Redis URL");

    // Verify Redis connection
    redis_client
        .get_multiplexed_async_connection()
        .await
        .expect("Failed to connect to Redis");

    // Mail transport (log-only without SMTP settings)
    let mailer = Mailer::from_config(config.smtp.as_ref()).expect("Failed to build mailer");
    match &mailer {
        Mailer::Smtp { .. } => tracing::info!("SMTP mail delivery configured"),
        Mailer::LogOnly => tracing::warn!("No SMTP configured; OTP delivery is log-only"),
    }

    // Build shared state
    let state = AppState {
        redis: redis_client,
        config: Arc::new(config.clone()),
        http: reqwest::Client::new(),
        mailer: Arc::new(mailer),
    };

    // Session cookies are SameSite=None, so the frontend origin must be
    // allowed explicitly with credentials. Without ALLOWED_ORIGIN,
    // CorsLayer::new() with no allowed origins rejects all CORS preflight
    // requests (single-origin deployment).
    let cors = match &config.allowed_origin {
        Some(origin) => CorsLayer::new()
            .allow_origin(
                origin
                    .parse::<HeaderValue>()
                    .expect("Invalid ALLOWED_ORIGIN"),
            )
            .allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE])
            .allow_headers([header::CONTENT_TYPE])
            .allow_credentials(true),
        None => CorsLayer::new(),
    };

    let app = routes::api_router()
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    // Bind to configured address
    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .expect("Failed to bind");
    tracing::info!("Listening on {}", config.bind_addr);

    // Start server
    axum::serve(listener, app).await.expect("Server error");
}
