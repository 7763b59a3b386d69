use super::types::{API, DETECTION, PREDICTIONS, STREAMS};
use super::{CamwatchApp, ComponentState};
use crate::api::ApiServer;
use crate::camera::CameraDescriptor;
use crate::error::Result;
use std::sync::Arc;
use tracing::{error, info, warn};

impl CamwatchApp {
    /// Initialize all system components
    pub async fn initialize(&mut self) -> Result<()> {
        info!("Initializing camwatch components");

        let mut states = self.component_states.lock().await;
        for component in [DETECTION, STREAMS, API, PREDICTIONS] {
            states.insert(component.to_string(), ComponentState::Stopped);
        }
        drop(states);

        info!("All components initialized successfully");
        Ok(())
    }

    /// Run detection and publish the resulting camera list
    pub async fn detect_cameras(&self) -> Arc<Vec<CameraDescriptor>> {
        self.set_component_state(DETECTION, ComponentState::Starting)
            .await;

        let cameras = self.detector.detect().await;
        if cameras.is_empty() {
            warn!("No cameras detected, running without streams or predictions");
        }
        self.monitor.replace_cameras(cameras);

        self.set_component_state(DETECTION, ComponentState::Running)
            .await;
        self.monitor.cameras()
    }

    /// Start all system components.
    ///
    /// Per-camera stream failures are recorded and never abort startup; only
    /// a snapshot API bind failure does.
    pub async fn start(&mut self) -> Result<()> {
        info!("Starting camwatch");

        let cameras = self.detect_cameras().await;

        // Streams
        self.set_component_state(STREAMS, ComponentState::Starting)
            .await;
        self.streams.start_all(&cameras).await;
        self.set_component_state(STREAMS, ComponentState::Running)
            .await;
        info!("Started {} camera stream(s)", cameras.len());

        // Snapshot API
        self.set_component_state(API, ComponentState::Starting).await;
        let server = match ApiServer::bind(&self.config.api.ip, self.config.api.port).await {
            Ok(server) => server,
            Err(e) => {
                error!("Failed to start snapshot API: {}", e);
                self.set_component_state(API, ComponentState::Failed).await;
                return Err(e.into());
            }
        };
        self.api_addr = Some(server.local_addr());
        self.api_task = Some(tokio::spawn(
            server.serve(self.api_state(), self.cancellation_token.child_token()),
        ));
        self.set_component_state(API, ComponentState::Running).await;

        // Prediction loop
        self.set_component_state(PREDICTIONS, ComponentState::Starting)
            .await;
        self.prediction_task = Some(tokio::spawn(Arc::clone(&self.orchestrator).run(
            self.cancellation_token.child_token(),
            self.config.inference.interval(),
        )));
        self.set_component_state(PREDICTIONS, ComponentState::Running)
            .await;
        info!(
            "Prediction loop running every {:?} over models {:?}",
            self.config.inference.interval(),
            self.monitor.roster().models()
        );

        info!("camwatch started successfully");
        Ok(())
    }
}
