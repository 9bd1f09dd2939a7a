use anyhow::{Context, Result};
use dotenv::dotenv;
use std::sync::Arc;
use token_refresh_core::{ChainedMarketSource, HttpClient, RedisTokenStore};
use token_refresh_rust::{RefreshConfig, TokenRefresher};
use tokio::sync::watch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    info!("Starting token_refresh_rust...");

    // Missing store settings are fatal before anything else runs
    let config = RefreshConfig::from_env()?;

    let store = Arc::new(
        RedisTokenStore::connect(&config.store_config())
            .await
            .context("Failed to initialize token store")?,
    );
    let http = Arc::new(HttpClient::with_timeout(config.http_timeout())?);
    let source = Arc::new(ChainedMarketSource::new_default(http));

    let refresher = TokenRefresher::new(store, source, config);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Received shutdown signal");
                let _ = shutdown_tx.send(true);
            }
            Err(err) => {
                error!("Unable to listen for shutdown signal: {}", err);
                // Keep the sender alive so the refresher keeps running
                std::future::pending::<()>().await;
            }
        }
    });

    refresher.run(shutdown_rx).await
}
