use anyhow::Result;
use relay_core::RelayConfig;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    // 0. Initialize logging (RUST_LOG, default info)
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    // 1. Load configuration (.env + RELAY_* variables)
    let config = RelayConfig::from_env()?;
    tracing::info!(
        "Transfer timeout {:?}, high-water mark {} bytes, max {} connections",
        config.transfer_timeout,
        config.backpressure.high_water_mark,
        config.max_connections
    );

    // 2. Stop on Ctrl-C
    let shutdown = CancellationToken::new();
    let signal = shutdown.clone();
    tokio::spawn(async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Cannot listen for Ctrl-C: {}", e);
            return;
        }
        signal.cancel();
    });

    // 3. Serve until shutdown
    relay_core::server::run(config, shutdown).await
}
