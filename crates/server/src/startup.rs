//! Server startup: registry initialization and the HTTP listener.

use std::sync::Arc;

use anyhow::Context;
use tracing::{info, warn};

use docvault_core::Config;
use docvault_registry::SqliteRegistry;

use crate::router::build_router;
use crate::state::AppState;

/// Open the on-disk registry described by `config`.
pub async fn open_registry(config: &Config) -> anyhow::Result<SqliteRegistry> {
    SqliteRegistry::connect(config)
        .await
        .with_context(|| format!("failed to open document registry ({})", config.database.url))
}

pub async fn build_app_state(config: &Config) -> anyhow::Result<Arc<AppState>> {
    let registry = open_registry(config).await?;
    info!(
        "Registry ready (uploads: {})",
        config.storage.upload_path().display()
    );
    Ok(Arc::new(AppState::new(registry)))
}

pub async fn serve(config: &Config) -> anyhow::Result<()> {
    config.log_summary();
    let state = build_app_state(config).await?;
    let app = build_router(state.clone(), &config.server);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("Server listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    state.registry.close().await;
    info!("Server stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("Shutdown signal received"),
        Err(e) => {
            warn!("Cannot listen for Ctrl-C ({}); running until killed", e);
            std::future::pending::<()>().await;
        }
    }
}
