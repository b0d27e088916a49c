use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use uz_scanner::booking::{BookingApi, UzClient, UzConfig};
use uz_scanner::notify::LogNotifier;
use uz_scanner::scanner::{Scanner, ScannerConfig};

/// Default delay between scan cycles, overridable via `SCAN_DELAY_SEC`.
const DEFAULT_SCAN_DELAY_SECS: u64 = 60;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let delay = std::env::var("SCAN_DELAY_SEC")
        .ok()
        .and_then(|value| value.parse().ok())
        .unwrap_or(DEFAULT_SCAN_DELAY_SECS);

    let client: Arc<dyn BookingApi> =
        Arc::new(UzClient::new(UzConfig::default()).expect("failed to create UZ client"));
    let scanner = Arc::new(Scanner::new(
        client,
        Arc::new(LogNotifier),
        ScannerConfig::default().with_delay(Duration::from_secs(delay)),
    ));

    let runner = tokio::spawn(scanner.clone().run());
    tracing::info!(delay_secs = delay, "running, press ctrl-c to stop");

    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(%error, "failed to listen for shutdown signal");
    }

    tracing::info!("shutting down, waiting for outstanding attempts");
    scanner.stop();
    if let Err(error) = runner.await {
        tracing::error!(%error, "scanner task panicked");
    }
}
