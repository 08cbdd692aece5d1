//! TuringX Wallet node driver
//!
//! Brings up the node adapter the way the desktop wallet does, logs every
//! node event and keeps the node running until Ctrl-C.

use anyhow::{anyhow, Context, Result};
use log::LevelFilter;
use std::sync::Arc;
use tokio::signal;
use tokio::sync::broadcast::error::RecvError;
use turingx_wallet_lib::{app_log_dir, Currency, DaemonNodeFactory, LoggerManager, NodeAdapter, Settings};

/// Environment variable overriding the log level
const LOG_LEVEL_ENV: &str = "TURINGX_LOG";

#[tokio::main]
async fn main() -> Result<()> {
    let level = std::env::var(LOG_LEVEL_ENV)
        .ok()
        .and_then(|value| value.parse::<LevelFilter>().ok())
        .unwrap_or(LevelFilter::Info);
    let logger = LoggerManager::init(app_log_dir(), level)
        .map_err(|e| anyhow!("failed to initialize logging: {}", e))?;
    log::info!("Logging to {} at {}", logger.log_dir().display(), logger.level());
    let logger = Arc::new(logger);

    // First run: write the defaults so they can be edited
    let settings = Settings::load();
    if !Settings::settings_path().exists() {
        if let Err(e) = settings.save() {
            log::warn!("Could not write default settings: {}", e);
        }
    }
    let currency = Currency::turingx();
    log::info!(
        "{} wallet starting (data dir {})",
        currency.name,
        settings.get_data_dir().display()
    );

    let mut adapter = NodeAdapter::new(settings, currency, logger, Arc::new(DaemonNodeFactory));

    let mut events = adapter.subscribe();
    let event_log = tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => log::info!("Node event: {:?}", event),
                Err(RecvError::Lagged(missed)) => log::warn!("Missed {} node events", missed),
                Err(RecvError::Closed) => break,
            }
        }
    });

    let kind = adapter.init().await.context("node initialization failed")?;
    log::info!("Connected to {} node", kind.as_str());

    let wallet = adapter.create_wallet();
    log::info!(
        "{} wallet synchronized to height {} ({})",
        wallet.currency().name,
        wallet.sync_height(),
        if wallet.is_synchronized() { "up to date" } else { "catching up" }
    );
    println!("{}", serde_json::to_string_pretty(&adapter.status())?);

    signal::ctrl_c().await.context("failed to wait for Ctrl-C")?;
    log::info!("Shutdown signal received");

    adapter.deinit().await;
    drop(adapter);
    let _ = event_log.await;

    Ok(())
}
