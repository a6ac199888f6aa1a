use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use tracing::{info, warn};

use coffeeshop::{Config, MemoryStore, Server, ServerConfig};

/// How long in-flight requests get to finish after SIGINT/SIGTERM.
const SHUTDOWN_GRACE: Duration = Duration::from_secs(30);

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env if present (ignored in production where env vars are injected)
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,coffeeshop=debug".into()),
        )
        .with_target(false)
        .compact()
        .init();

    let config = Config::from_env()?;

    let store = MemoryStore::seeded();
    info!(products = store.len(), "Inventory seeded");

    let server = Server::new(
        config.addr(),
        Arc::new(store),
        ServerConfig {
            latency: config.latency,
            ..ServerConfig::default()
        },
    );
    info!(url = %server.url(), latency = ?config.latency, "Starting coffeeshop server");

    tokio::select! {
        res = server.listen_and_serve() => res.context("server failed")?,
        res = async {
            shutdown_signal().await;
            server.shutdown(SHUTDOWN_GRACE).await
        } => res.context("graceful shutdown failed")?,
    }

    Ok(())
}

/// Waits for CTRL+C or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!("Received CTRL+C, starting graceful shutdown"),
        () = terminate => info!("Received SIGTERM, starting graceful shutdown"),
    }

    warn!(grace = ?SHUTDOWN_GRACE, "Waiting for in-flight requests to complete");
}
