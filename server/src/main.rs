use anyhow::Context;
use regatta_server::config::ServerConfig;
use regatta_server::game_loop::{run_game_loop, GameBroadcast, GameCommand};
use regatta_server::listener::bind_with_retry;
use regatta_server::ws::{router, AppState};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tracing::info;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::from_env().context("Failed to read server configuration")?;
    init_tracing(&config.log_level);

    // Validate configuration before starting
    config.validate().context("Invalid server configuration")?;

    let (game_tx, game_rx) = mpsc::channel::<GameCommand>(256);
    let (broadcast_tx, _) = broadcast::channel::<GameBroadcast>(64);
    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let (closing_tx, closing_rx) = watch::channel(false);

    let listener = bind_with_retry(&config.listen_addr, config.port_retry_attempts)
        .await
        .with_context(|| format!("Failed to bind {}", config.listen_addr))?;
    let local_addr = listener.local_addr()?;

    let app_state = AppState::new(
        game_tx,
        broadcast_tx.clone(),
        closing_rx,
        config.max_connections,
    );

    // Spawn game loop
    let game_loop = tokio::spawn(run_game_loop(game_rx, broadcast_tx, config, stop_rx));

    info!("Regatta server listening on {}", local_addr);

    axum::serve(listener, router(app_state))
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            // Stop ticking first so no snapshot races the close frames
            let _ = stop_tx.send(());
            if let Err(e) = game_loop.await {
                tracing::error!("Game loop ended abnormally: {}", e);
            }
            let _ = closing_tx.send(true);
        })
        .await?;

    info!("Server shutdown complete");
    Ok(())
}

/// Initialize tracing/logging
fn init_tracing(log_level: &str) {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(tracing_subscriber::fmt::layer().with_target(true))
        .init();
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
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
        _ = ctrl_c => {
            info!("Received Ctrl+C, starting graceful shutdown");
        }
        _ = terminate => {
            info!("Received terminate signal, starting graceful shutdown");
        }
    }
}
