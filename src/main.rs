//! casecache - cache diagnostics server
//!
//! Hosts a process-wide cache with its expiry sweeper and exposes the
//! diagnostics API over it.

use std::net::SocketAddr;

use tokio::signal;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use casecache::api::{create_router, AppState};
use casecache::Config;

/// Main entry point.
///
/// # Startup Sequence
/// 1. Initialize tracing subscriber for logging
/// 2. Load configuration from environment variables
/// 3. Create the cache layer with configured parameters
/// 4. Start the expiry sweeper
/// 5. Serve the diagnostics API until SIGINT/SIGTERM
/// 6. Stop the sweeper and clear the cache
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Defaults to "info" level, can be overridden with RUST_LOG env var
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "casecache=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!("Starting casecache");

    let config = Config::from_env();
    info!(
        "Configuration loaded: max_entries={:?}, default_ttl={}s, list_ttl={}s, detail_ttl={}s, sweep_interval={}s, port={}",
        config.max_entries,
        config.default_ttl,
        config.list_ttl,
        config.detail_ttl,
        config.sweep_interval,
        config.server_port
    );

    let state = AppState::from_config(&config);
    let sweeper = state.cache.spawn_sweeper(config.sweep_interval());
    info!("Expiry sweeper started");

    let app = create_router(state.clone());

    let addr = SocketAddr::from(([0, 0, 0, 0], config.server_port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(sweeper))
        .await?;

    let removed = state.cache.clear().await;
    info!("Server shutdown complete, dropped {} cached entries", removed);
    Ok(())
}

/// Waits for shutdown signal (Ctrl+C or SIGTERM), then stops the sweeper.
async fn shutdown_signal(sweeper: JoinHandle<()>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, initiating shutdown...");
        }
        _ = terminate => {
            info!("Received SIGTERM, initiating shutdown...");
        }
    }

    sweeper.abort();
    warn!("Expiry sweeper aborted");
}
