//! HTTP transport: schema introspection and price prediction over JSON.

mod api;
mod error;
mod handlers;
mod state;

pub use api::create_router;
pub use error::ApiError;
pub use handlers::{PredictRequest, PredictResponse, SchemaResponse};
pub use state::AppState;

use std::net::SocketAddr;
use std::sync::Arc;
use tracing::info;

use crate::config::ServerConfig;

/// Serve `state` until ctrl+c
pub async fn run_server(state: Arc<AppState>, config: &ServerConfig) -> anyhow::Result<()> {
    let start_time = chrono::Utc::now();
    let app = create_router(state);

    let addr: SocketAddr = config.bind_address().parse()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(
        address = %addr,
        pid = std::process::id(),
        started_at = %start_time.to_rfc3339(),
        "Server listening and ready to accept connections"
    );
    info!(url = %format!("http://{}/schema", addr), "Schema endpoint available");
    info!(url = %format!("http://{}/predict", addr), "Prediction endpoint available");

    // Graceful shutdown on ctrl+c
    let shutdown_signal = async move {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
        let stop_time = chrono::Utc::now();
        let uptime = stop_time.signed_duration_since(start_time);
        info!(
            stopped_at = %stop_time.to_rfc3339(),
            uptime_secs = uptime.num_seconds(),
            "Shutdown signal received, stopping server gracefully"
        );
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal)
        .await?;

    info!("Server shut down cleanly");
    Ok(())
}
