use super::handlers::{health, list_cameras, list_errors, list_predictions, status};
use crate::error::StreamError;
use crate::prediction::MonitorState;
use crate::streaming::StreamProcessManager;
use axum::{routing::get, Router};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// State shared by the snapshot handlers
#[derive(Clone)]
pub struct ApiState {
    pub monitor: Arc<MonitorState>,
    pub streams: Arc<StreamProcessManager>,
    /// Host advertised in stream URLs
    pub public_host: String,
}

pub fn create_router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/cameras", get(list_cameras))
        .route("/api/predictions", get(list_predictions))
        .route("/api/status", get(status))
        .route("/api/errors", get(list_errors))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Bound snapshot API listener
pub struct ApiServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl ApiServer {
    pub async fn bind(ip: &str, port: u16) -> Result<Self, StreamError> {
        let address = format!("{}:{}", ip, port);
        let listener = TcpListener::bind(&address)
            .await
            .map_err(|source| StreamError::BindFailed {
                address: address.clone(),
                source,
            })?;
        let local_addr = listener
            .local_addr()
            .map_err(|source| StreamError::BindFailed { address, source })?;

        Ok(Self {
            listener,
            local_addr,
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until `shutdown` is cancelled
    pub async fn serve(self, state: ApiState, shutdown: CancellationToken) {
        info!("Snapshot API listening on {}", self.local_addr);

        if let Err(e) = axum::serve(self.listener, create_router(state))
            .with_graceful_shutdown(shutdown.cancelled_owned())
            .await
        {
            error!("Snapshot API server error: {}", e);
        }

        info!("Snapshot API stopped");
    }
}
