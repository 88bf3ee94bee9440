//! Environment-backed configuration
//!
//! Every knob has a development default so `cargo run` works against a local
//! Postgres without a .env file.

use std::time::Duration;

/// Application configuration shared by the API server and the worker.
#[derive(Debug, Clone)]
pub struct Config {
    // Server settings
    pub server_host: String,
    pub server_port: u16,

    // Database settings
    pub database_url: String,
    pub db_max_connections: u32,
    pub db_connect_retries: usize,
    pub db_connect_backoff: Duration,

    // Auth
    pub jwt_secret: String,
    pub jwt_expiry_hours: i64,

    /// How often the expiration sweeper runs.
    pub sweep_interval: Duration,
    /// Upper bound for a single request or sweep pass.
    pub request_timeout: Duration,

    pub environment: String,
}

impl Config {
    /// Load configuration from the environment, reading a `.env` file first
    /// if one exists.
    pub fn from_env() -> Self {
        dotenvy::dotenv().ok();

        let db_host = env_or("DB_HOST", "localhost");
        let db_port = env_or("DB_PORT", "5432");
        let db_user = env_or("DB_USER", "postgres");
        let db_password = env_or("DB_PASSWORD", "postgres");
        let db_name = env_or("DB_NAME", "mesa");

        // DATABASE_URL wins over the individual DB_* parts
        let database_url = std::env::var("DATABASE_URL").unwrap_or_else(|_| {
            format!("postgres://{db_user}:{db_password}@{db_host}:{db_port}/{db_name}")
        });

        Self {
            server_host: env_or("HOST", "0.0.0.0"),
            server_port: parse_env("PORT", 8080),
            database_url,
            db_max_connections: parse_env("DB_MAX_CONNECTIONS", 5),
            db_connect_retries: parse_env("DB_CONNECT_RETRIES", 5),
            db_connect_backoff: Duration::from_millis(parse_env("DB_CONNECT_BACKOFF_MS", 500)),
            jwt_secret: env_or("JWT_SECRET", "dev-secret-change-me"),
            jwt_expiry_hours: parse_env("JWT_EXPIRY_HOURS", 24),
            sweep_interval: Duration::from_secs(parse_env("SWEEP_INTERVAL_HOURS", 12) * 3600),
            request_timeout: Duration::from_secs(parse_env("REQUEST_TIMEOUT_SECS", 30)),
            environment: env_or("ENVIRONMENT", "development"),
        }
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.server_host, self.server_port)
    }
}

fn env_or(key: &str, fallback: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| fallback.to_string())
}

fn parse_env<T: std::str::FromStr>(key: &str, fallback: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(fallback)
}
