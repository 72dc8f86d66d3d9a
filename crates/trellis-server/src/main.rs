//! Trellis server binary: wires configuration, backends, and the axum
//! router, then serves until shutdown.

use anyhow::Context;
use std::env;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;
use trellis_server::backends::{
    DryRunDataBackend, DryRunWorkflowBackend, HttpDataBackend, LogNotifier,
};
use trellis_server::{build_state, router, ServerConfig};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ServerConfig::load()?;

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new(config.log_level.clone())),
        )
        .init();

    let data: Arc<dyn trellis_engine::DataBackend> = match env::var("DATA_API_URL") {
        Ok(url) => {
            info!(%url, "Forwarding data requests upstream");
            Arc::new(HttpDataBackend::new(
                &url,
                env::var("DATA_API_AUTH_HEADER").ok(),
            ))
        }
        Err(_) => {
            info!("No DATA_API_URL configured; data requests run dry");
            Arc::new(DryRunDataBackend)
        }
    };

    let state = build_state(
        &config,
        data,
        Arc::new(DryRunWorkflowBackend),
        Arc::new(LogNotifier),
    );
    let app = router(state);

    let addr = format!("{}:{}", config.bind_address, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {addr}"))?;
    info!(%addr, "Trellis server listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    Ok(())
}

async fn shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
    info!("Shutdown signal received");
}
