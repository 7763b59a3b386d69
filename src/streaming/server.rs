use super::handlers::mjpeg_stream_handler;
use super::state::StreamState;
use super::stats::StreamStats;
use crate::error::StreamError;
use axum::{routing::get, Router};
use bytes::Bytes;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;
use tracing::{error, info};

/// Shared state for one camera's stream router
#[derive(Clone)]
pub struct StreamContext {
    pub(crate) camera_id: u32,
    pub(crate) frames: broadcast::Sender<Bytes>,
    pub(crate) state: watch::Receiver<StreamState>,
    pub(crate) stats: Arc<StreamStats>,
    pub(crate) shutdown: CancellationToken,
}

/// HTTP listener serving `GET /stream` for one camera
pub struct StreamServer {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl StreamServer {
    /// Bind the camera's listener
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

    pub fn router(context: StreamContext) -> Router {
        Router::new()
            .route("/stream", get(mjpeg_stream_handler))
            .layer(TraceLayer::new_for_http())
            .with_state(context)
    }

    /// Serve until the context's shutdown token is cancelled
    pub fn spawn(self, context: StreamContext) -> JoinHandle<()> {
        let camera_id = context.camera_id;
        let shutdown = context.shutdown.clone();
        let app = Self::router(context);
        let local_addr = self.local_addr;

        tokio::spawn(async move {
            info!(camera_id, "MJPEG server listening on {}", local_addr);

            if let Err(e) = axum::serve(self.listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await
            {
                error!(camera_id, "MJPEG server error: {}", e);
            }

            info!(camera_id, "MJPEG server on {} closed", local_addr);
        })
    }
}
