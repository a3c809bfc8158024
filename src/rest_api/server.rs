//! Axum HTTP server for the REST API

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{routing::get, Router};
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::forecast::Orchestrator;
use crate::{Error, Result};

use super::handlers::{self, AppState};

/// Build the API router around a shared orchestrator
pub fn router(orchestrator: Arc<Orchestrator>) -> Router {
    let app = Router::new()
        .route("/", get(handlers::home))
        .route("/health", get(handlers::health))
        .route(
            "/forecast/optimized/{country_code}",
            get(handlers::optimized_forecast),
        )
        .route("/grid/status", get(handlers::grid_status));

    #[cfg(feature = "metrics")]
    let app = app.route("/metrics", get(handlers::metrics));

    app.layer(TraceLayer::new_for_http())
        .with_state(AppState { orchestrator })
}

/// Run the REST API server
pub async fn run_server(orchestrator: Arc<Orchestrator>, addr: SocketAddr) -> Result<()> {
    let app = router(orchestrator);

    info!("REST API server listening on {}", addr);
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .map_err(|e| Error::ServerError(format!("Failed to bind to {}: {}", addr, e)))?;

    axum::serve(listener, app)
        .await
        .map_err(|e| Error::ServerError(format!("Server error: {}", e)))?;

    Ok(())
}
