use super::state::StreamState;
use super::stats::StreamStatsSnapshot;
use super::supervisor::StreamHandle;
use crate::backend::VideoCaptureBackend;
use crate::camera::CameraDescriptor;
use crate::config::StreamConfig;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Owns one continuous capture and MJPEG server per camera
pub struct StreamProcessManager {
    backend: Arc<dyn VideoCaptureBackend>,
    config: StreamConfig,
    handles: RwLock<HashMap<u32, Arc<StreamHandle>>>,
    shutdown: CancellationToken,
}

impl StreamProcessManager {
    pub fn new(backend: Arc<dyn VideoCaptureBackend>, config: StreamConfig) -> Self {
        Self {
            backend,
            config,
            handles: RwLock::new(HashMap::new()),
            shutdown: CancellationToken::new(),
        }
    }

    /// Start a stream for every camera that does not already have a live one.
    ///
    /// Individual failures are recorded in that camera's state and never abort
    /// the remaining cameras.
    pub async fn start_all(&self, cameras: &[CameraDescriptor]) {
        for camera in cameras {
            let existing = self.handles.read().get(&camera.id).cloned();
            if let Some(existing) = existing {
                if existing.is_live() {
                    debug!(camera_id = camera.id, "Stream already running, skipping");
                    continue;
                }
                // Release the failed stream's port before rebinding
                existing.stop().await;
            }

            let handle = StreamHandle::start(
                self.backend.as_ref(),
                camera.clone(),
                &self.config,
                self.shutdown.child_token(),
            )
            .await;

            info!(
                camera_id = camera.id,
                port = camera.port,
                state = %handle.state(),
                "Stream started"
            );

            self.handles.write().insert(camera.id, Arc::new(handle));
        }
    }

    pub fn state(&self, camera_id: u32) -> Option<StreamState> {
        self.handles.read().get(&camera_id).map(|handle| handle.state())
    }

    /// State of every managed camera, ordered by id
    pub fn states(&self) -> BTreeMap<u32, StreamState> {
        self.handles
            .read()
            .iter()
            .map(|(id, handle)| (*id, handle.state()))
            .collect()
    }

    pub fn stats(&self, camera_id: u32) -> Option<StreamStatsSnapshot> {
        self.handles
            .read()
            .get(&camera_id)
            .map(|handle| handle.stats().snapshot())
    }

    pub fn local_addr(&self, camera_id: u32) -> Option<SocketAddr> {
        self.handles
            .read()
            .get(&camera_id)
            .and_then(|handle| handle.local_addr())
    }

    /// Wait for a camera's stream to leave `Starting`
    pub async fn wait_until_settled(&self, camera_id: u32) -> Option<StreamState> {
        let handle = self.handles.read().get(&camera_id).cloned()?;
        Some(handle.wait_until_settled().await)
    }

    /// Terminate every capture process and close every server
    pub async fn shutdown(&self) {
        info!("Stopping all camera streams");
        self.shutdown.cancel();

        let handles: Vec<_> = self.handles.read().values().cloned().collect();
        for handle in handles {
            handle.stop().await;
        }

        info!("All camera streams stopped");
    }
}
