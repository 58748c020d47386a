//! Marketplace server binary

use market_core::{AccountId, Config, Market};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    tracing::info!("Starting Bazaar market server");

    // Load configuration
    let config = Config::from_env()?;
    let owner = AccountId::new(
        std::env::var("MARKET_OWNER").unwrap_or_else(|_| "market-admin".to_string()),
    );

    // Open market
    let market = Market::open(config, owner).await?;
    tracing::info!(owner = %market.owner(), "Market opened successfully");

    // Mirror committed operations into the log
    let mut notifications = market.subscribe();
    let observer = tokio::spawn(async move {
        while let Ok(notification) = notifications.recv().await {
            tracing::info!(kind = ?notification.kind, "Notification");
        }
    });

    tokio::signal::ctrl_c().await?;

    tracing::info!("Shutting down market server");
    market.shutdown().await?;
    observer.await?;
    Ok(())
}
