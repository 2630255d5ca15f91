use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use crate::config::config;
use crate::database;
use crate::state::AppState;

/// Opens the configured store and serves the API until the process is stopped.
pub async fn handle(port: Option<u16>) -> anyhow::Result<()> {
    let config = config().clone();
    info!("Starting bootcamp API in {:?} mode", config.environment);

    if config.security.jwt_secret.is_empty() {
        anyhow::bail!("JWT_SECRET must be set outside development");
    }

    let store = database::connect(&config.database)
        .await
        .context("failed to open the data store")?;
    let port = port.unwrap_or(config.server.port);
    let app = crate::app(AppState::new(store, Arc::new(config)));

    let bind_addr = format!("0.0.0.0:{}", port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .with_context(|| format!("failed to bind {}", bind_addr))?;

    info!("Bootcamp API listening on http://{}", bind_addr);
    axum::serve(listener, app).await.context("server error")?;
    Ok(())
}
