//! Self-hosted relay that pairs a browser DApp with a mobile wallet over
//! WebSocket and forwards JSON frames between them.

pub mod config;
pub mod error;
pub mod http;
pub mod ids;
pub mod pages;
pub mod ratelimit;
pub mod session;
pub mod state;
pub mod ws;

use axum::Router;
use tower_http::trace::TraceLayer;

use config::Config;
use state::AppState;

/// Assemble the full HTTP+WS router over a fresh `AppState`. Used by both
/// the process entry point and integration tests.
pub fn app(state: AppState) -> Router {
    let sessions_for_ws = state.clone();
    Router::new()
        .merge(http::router(state))
        .merge(ws::router(sessions_for_ws))
        .layer(TraceLayer::new_for_http())
}

/// Spawn the sweeper background tasks for a given state. Returns their join
/// handles so callers (tests included) can abort them on teardown.
pub fn spawn_sweepers(state: &AppState) -> (tokio::task::JoinHandle<()>, tokio::task::JoinHandle<()>) {
    let session_sweeper = tokio::spawn(http::sweep_task(state.sessions.clone()));
    let ratelimit_sweeper = tokio::spawn(ratelimit::sweep_task(state.rate_limiter.clone()));
    (session_sweeper, ratelimit_sweeper)
}

pub async fn run() -> anyhow::Result<()> {
    let config = Config::from_env();
    let addr = config.socket_addr();
    let state = AppState::new(config);

    spawn_sweepers(&state);

    let sessions_for_shutdown = state.sessions.clone();
    let app = app(state);

    tracing::info!(%addr, "relay listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            sessions_for_shutdown
                .close_all(1001, "Server shutting down")
                .await;
        })
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }

    tracing::info!("shutdown signal received, draining connections");
}
