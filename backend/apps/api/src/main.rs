//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors; request-level errors are
//! `reward::RewardError`, rendered through `kernel::error::AppError`.

use anyhow::{Context, bail};
use axum::{
    Router, http,
    http::{Method, header},
};
use reward::{PgRewardRepository, RewardAmount, RewardConfig, reward_router};
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use std::env;
use std::fmt::Display;
use std::net::SocketAddr;
use std::str::FromStr;
use std::time::Duration;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:31113";

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,reward=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let reward_config = load_reward_config()?;

    // Database connection
    let database_url =
        env::var("DATABASE_URL").context("DATABASE_URL must be set in environment")?;
    let max_connections: u32 = env_parse("DATABASE_MAX_CONNECTIONS", 10)?;
    let statement_timeout_ms: u64 = env_parse("DATABASE_STATEMENT_TIMEOUT_MS", 5_000)?;

    // Every statement carries its own server-side timeout
    let connect_options = PgConnectOptions::from_str(&database_url)
        .context("DATABASE_URL is not a valid PostgreSQL URL")?
        .options([("statement_timeout", statement_timeout_ms.to_string())]);

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(reward_config.unit_timeout)
        .connect_with(connect_options)
        .await?;

    tracing::info!(
        max_connections = max_connections,
        statement_timeout_ms = statement_timeout_ms,
        "Connected to database"
    );

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    let reward_store = PgRewardRepository::new(pool.clone());

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:40922,http://127.0.0.1:40922".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let app = Router::new()
        .nest("/api/rewards", reward_router(reward_store, reward_config))
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| DEFAULT_BIND_ADDR.to_string())
        .parse()
        .context("BIND_ADDR must be host:port")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Build the reward configuration from the environment
///
/// Debug builds fall back to a random token secret; release builds require
/// `AUTH_TOKEN_SECRET` (base64, 32 bytes).
fn load_reward_config() -> anyhow::Result<RewardConfig> {
    let base = if cfg!(debug_assertions) {
        RewardConfig::development()
    } else {
        RewardConfig::default()
    };

    let token_secret = match env::var("AUTH_TOKEN_SECRET") {
        Ok(secret_b64) => {
            let bytes = platform::crypto::from_base64(secret_b64.trim())
                .context("AUTH_TOKEN_SECRET must be base64")?;
            let Ok(secret) = <[u8; 32]>::try_from(bytes.as_slice()) else {
                bail!("AUTH_TOKEN_SECRET must decode to 32 bytes (got {})", bytes.len());
            };
            secret
        }
        Err(_) if cfg!(debug_assertions) => {
            tracing::warn!("AUTH_TOKEN_SECRET not set, using a random secret");
            base.token_secret
        }
        Err(_) => bail!("AUTH_TOKEN_SECRET must be set in production"),
    };

    let unit_timeout_ms: u64 =
        env_parse("REWARD_UNIT_TIMEOUT_MS", base.unit_timeout.as_millis() as u64)?;
    let checkin_amount: i64 = env_parse("REWARD_CHECKIN_AMOUNT", base.checkin_amount.value())?;
    let referral_amount: i64 = env_parse(
        "REWARD_REFERRAL_COMMISSION_AMOUNT",
        base.referral_commission_amount.value(),
    )?;

    Ok(RewardConfig {
        token_secret,
        unit_timeout: Duration::from_millis(unit_timeout_ms),
        checkin_amount: RewardAmount::new(checkin_amount)
            .context("REWARD_CHECKIN_AMOUNT must not be negative")?,
        referral_commission_amount: RewardAmount::new(referral_amount)
            .context("REWARD_REFERRAL_COMMISSION_AMOUNT must not be negative")?,
        ..base
    })
}

/// Read and parse an environment variable, falling back to `default` when unset
fn env_parse<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: FromStr,
    T::Err: Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{key} is invalid: {e}")),
        Err(_) => Ok(default),
    }
}
