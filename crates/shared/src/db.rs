//! Database pool construction with startup retry
//!
//! Both binaries connect through here so a slow-starting Postgres (docker
//! compose, fresh deploys) does not kill the process on the first attempt.

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;
use tokio_retry::strategy::{jitter, ExponentialBackoff};
use tokio_retry::Retry;

use crate::Config;

pub async fn create_pool(config: &Config) -> Result<PgPool, sqlx::Error> {
    let strategy = ExponentialBackoff::from_millis(config.db_connect_backoff.as_millis() as u64)
        .max_delay(Duration::from_secs(10))
        .map(jitter)
        .take(config.db_connect_retries);

    Retry::spawn(strategy, || async {
        PgPoolOptions::new()
            .max_connections(config.db_max_connections)
            .acquire_timeout(Duration::from_secs(30))
            .connect(&config.database_url)
            .await
            .inspect_err(|e| tracing::warn!(error = %e, "database connection attempt failed"))
    })
    .await
}
