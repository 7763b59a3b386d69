use super::types::{ComponentState, ShutdownReason};
use crate::api::ApiState;
use crate::backend::{FfmpegBackend, VideoCaptureBackend};
use crate::camera::{CameraDetector, ResolutionNegotiator};
use crate::capture::FrameCaptureService;
use crate::config::CamwatchConfig;
use crate::error::Result;
use crate::inference::{Predictor, RemoteInferenceClient};
use crate::prediction::{MonitorState, PredictionOrchestrator};
use crate::streaming::StreamProcessManager;
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::{oneshot, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::info;

/// Main application coordinator owning detection, streams, the snapshot API
/// and the prediction loop
pub struct CamwatchApp {
    pub(super) config: CamwatchConfig,

    // Components
    pub(super) detector: CameraDetector,
    pub(super) monitor: Arc<MonitorState>,
    pub(super) streams: Arc<StreamProcessManager>,
    pub(super) orchestrator: Arc<PredictionOrchestrator>,
    pub(super) api_task: Option<JoinHandle<()>>,
    pub(super) api_addr: Option<SocketAddr>,
    pub(super) prediction_task: Option<JoinHandle<()>>,

    // Lifecycle management
    pub(super) component_states: Arc<Mutex<HashMap<String, ComponentState>>>,
    pub(super) shutdown_sender: Option<oneshot::Sender<ShutdownReason>>,
    pub(super) shutdown_receiver: Option<oneshot::Receiver<ShutdownReason>>,
    pub(super) cancellation_token: CancellationToken,
}

impl CamwatchApp {
    /// Create the application with the ffmpeg backend and the remote classifier
    pub fn new(config: CamwatchConfig) -> Result<Self> {
        let backend: Arc<dyn VideoCaptureBackend> =
            Arc::new(FfmpegBackend::new(config.camera.ffmpeg_path.clone()));
        info!("Using {} capture backend", backend.name());

        let predictor: Arc<dyn Predictor> = Arc::new(RemoteInferenceClient::new(
            config.inference.endpoint.clone(),
            config.inference.threshold,
            config.inference.request_timeout(),
        )?);

        Ok(Self::with_components(config, backend, predictor))
    }

    /// Create the application around an explicit backend and predictor
    pub fn with_components(
        config: CamwatchConfig,
        backend: Arc<dyn VideoCaptureBackend>,
        predictor: Arc<dyn Predictor>,
    ) -> Self {
        let negotiator = ResolutionNegotiator::new(
            Arc::clone(&backend),
            config.camera.max_resolution.into(),
            config.camera.fallback_resolution.into(),
            config.camera.probe_timeout(),
        );
        let detector = CameraDetector::new(
            Arc::clone(&backend),
            negotiator,
            config.camera.base_port,
            config.camera.fps,
        );

        let monitor = Arc::new(MonitorState::from_config(&config));
        let streams = Arc::new(StreamProcessManager::new(
            Arc::clone(&backend),
            config.stream.clone(),
        ));
        let frames = Arc::new(FrameCaptureService::new(
            Arc::clone(&backend),
            config.inference.capture_timeout(),
        ));
        let orchestrator = Arc::new(PredictionOrchestrator::new(
            frames,
            predictor,
            Arc::clone(&monitor),
        ));
        let (shutdown_sender, shutdown_receiver) = oneshot::channel();

        Self {
            config,
            detector,
            monitor,
            streams,
            orchestrator,
            api_task: None,
            api_addr: None,
            prediction_task: None,
            component_states: Arc::new(Mutex::new(HashMap::new())),
            shutdown_sender: Some(shutdown_sender),
            shutdown_receiver: Some(shutdown_receiver),
            cancellation_token: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &CamwatchConfig {
        &self.config
    }

    pub fn monitor(&self) -> &Arc<MonitorState> {
        &self.monitor
    }

    pub fn streams(&self) -> &Arc<StreamProcessManager> {
        &self.streams
    }

    /// Address the snapshot API is bound to once started
    pub fn api_addr(&self) -> Option<SocketAddr> {
        self.api_addr
    }

    pub(super) fn api_state(&self) -> ApiState {
        ApiState {
            monitor: Arc::clone(&self.monitor),
            streams: Arc::clone(&self.streams),
            public_host: self.config.stream.public_host.clone(),
        }
    }
}
