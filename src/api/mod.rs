//! REST API for registering targets and reading their history
//!
//! ## Architecture
//!
//! - **Axum** web framework with Tower middleware
//! - **Shared store** handed to handlers through [`ApiState`]
//! - **1 MB payload limit** on every request
//!
//! ## Endpoints
//!
//! - `GET /api/health` - Health check
//! - `GET /api/fetcher` - List targets
//! - `POST /api/fetcher` - Register a target (`{"url", "interval"}`)
//! - `DELETE /api/fetcher/{id}` - Delete a target
//! - `GET /api/fetcher/{id}/history` - Responses recorded for a target

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, ApiResult};
pub use state::ApiState;
pub use types::{
    CreateTargetRequest, CreatedResponse, HealthResponse, HistoryResponse, TargetResponse,
};

use axum::{
    Router,
    routing::{delete, get},
};
use std::net::SocketAddr;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::{limit::RequestBodyLimitLayer, trace::TraceLayer};
use tracing::info;

/// Largest accepted request body
pub const MAX_PAYLOAD_BYTES: usize = 1 << 20;

/// Build the router with all routes and middleware
pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/api/health", get(routes::health::health_check))
        .route(
            "/api/fetcher",
            get(routes::targets::list_targets).post(routes::targets::create_target),
        )
        .route("/api/fetcher/:id", delete(routes::targets::delete_target))
        .route(
            "/api/fetcher/:id/history",
            get(routes::targets::get_history),
        )
        .with_state(state)
        .layer(RequestBodyLimitLayer::new(MAX_PAYLOAD_BYTES))
        .layer(TraceLayer::new_for_http())
}

/// Spawn the API server
///
/// This starts an Axum HTTP server in a background task that stops
/// accepting connections once `shutdown` is cancelled.
/// Returns the server's local address and its task, which completes once
/// every in-progress request has been answered.
pub async fn spawn_api_server(
    bind_addr: SocketAddr,
    state: ApiState,
    shutdown: CancellationToken,
) -> anyhow::Result<(SocketAddr, JoinHandle<()>)> {
    info!("starting API server on {}", bind_addr);

    let app = router(state);

    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    let addr = listener.local_addr()?;

    info!("API server listening on {}", addr);

    let server = tokio::spawn(async move {
        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move { shutdown.cancelled().await })
            .await;

        if let Err(e) = result {
            tracing::error!("API server error: {}", e);
        }

        info!("API server stopped");
    });

    Ok((addr, server))
}
