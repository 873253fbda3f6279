//! Rehearse API server entry point.
//!
//! Initializes tracing, wires the application state, spawns the idle
//! sweeper, and serves the axum router until Ctrl+C or SIGTERM.

mod http;
mod state;

use tokio_util::sync::CancellationToken;

use rehearse_core::sweeper::IdleSweeper;
use state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let enable_otel = std::env::var("REHEARSE_OTEL")
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false);
    rehearse_observe::tracing_setup::init_tracing(enable_otel)
        .map_err(|e| anyhow::anyhow!("tracing init failed: {e}"))?;

    let state = AppState::init().await?;

    // Idle sweeper runs for the lifetime of the server.
    let sweeper_cancel = CancellationToken::new();
    let sweeper = IdleSweeper::spawn(state.registry.clone(), sweeper_cancel.clone());

    let listener = tokio::net::TcpListener::bind(&state.bind_addr).await?;
    tracing::info!(addr = %state.bind_addr, "rehearse API listening");

    let router = http::router::build_router(state);
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    sweeper_cancel.cancel();
    let _ = sweeper.await;
    rehearse_observe::tracing_setup::shutdown_tracing();
    tracing::info!("server stopped");
    Ok(())
}

/// Wait for Ctrl+C or SIGTERM for graceful shutdown.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
