//! lazarus server entry point.
//!
//! Serves a mirror of a defunct site over HTTP, resolving each path through
//! local files, the page cache, the live mirror and finally the archive.
//! Logs are JSON on stderr.

use std::sync::Arc;

use anyhow::Result;
use lazarus_core::AppConfig;
use tracing_subscriber::EnvFilter;

mod error;
mod inflight;
mod pages;
mod router;
mod state;
mod static_files;

use error::StartupError;
use state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = AppConfig::load().map_err(StartupError::from)?;
    let addr = config.bind_addr().map_err(StartupError::from)?;

    tracing::info!(
        domain = %config.domain,
        cache_dir = %config.cache_dir.display(),
        static_dir = %config.static_dir.display(),
        remote_fetch = config.remote_fetch_enabled(),
        "starting lazarus on http://{addr}"
    );

    let state = Arc::new(AppState::build(config).await?);
    let app = router::router(state);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|source| StartupError::Bind { addr, source })?;

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("lazarus stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("failed to listen for shutdown signal: {e}");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}
