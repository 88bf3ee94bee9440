//! Mesa background worker
//!
//! Hosts the subscription expiration sweeper. Runs separately from the API
//! server so sweep load and API load scale independently.

use mesa_billing::{BillingService, SubscriptionSweeper};
use mesa_shared::{create_pool, Config};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,mesa_worker=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!("Starting Mesa worker v{}", env!("CARGO_PKG_VERSION"));

    let config = Config::from_env();

    tracing::info!("Connecting to database...");
    let pool = create_pool(&config).await?;
    tracing::info!("Database connection established");

    let billing = BillingService::postgres(pool);
    let sweeper = SubscriptionSweeper::new(
        billing.subscriptions,
        config.sweep_interval,
        config.request_timeout,
    );
    let handle = sweeper.start();

    tokio::signal::ctrl_c().await?;
    tracing::info!("Shutdown signal received, stopping sweeper");
    handle.stop().await;

    Ok(())
}
