//! Receive files over QUIC into the uploads directory.

use anyhow::{Context, Result};
use clap::Parser;
use qft_core::AppConfig;
use qft_core::transfer::TransferServer;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// Takes no runtime arguments; see `QFT_CONFIG_DIR` for overrides.
#[derive(Debug, Parser)]
#[command(name = "qft-server", version, about = "Receive files over QUIC")]
struct Cli {}

#[tokio::main]
async fn main() -> Result<()> {
    let _cli = Cli::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = AppConfig::load().context("Failed to load configuration")?;

    let shutdown = CancellationToken::new();
    let server = TransferServer::bind(&config.server, shutdown.clone())?;

    tokio::spawn(async move {
        match shutdown_signal().await {
            Ok(()) => info!("Received interrupt signal, shutting down..."),
            Err(e) => error!("Signal handler failed, shutting down: {}", e),
        }
        shutdown.cancel();
    });

    server.run().await
}

/// Resolves on SIGINT, or SIGTERM on Unix
async fn shutdown_signal() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{SignalKind, signal};

        let mut terminate = signal(SignalKind::terminate())?;
        tokio::select! {
            res = tokio::signal::ctrl_c() => res,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await
    }
}
