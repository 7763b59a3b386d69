pub mod api;
pub mod app;
pub mod backend;
pub mod camera;
pub mod capture;
pub mod config;
pub mod error;
pub mod inference;
pub mod prediction;
pub mod records;
pub mod ring_buffer;
pub mod streaming;

pub use app::{CamwatchApp, ComponentState, ShutdownReason};
pub use backend::{FfmpegBackend, Platform, VideoCaptureBackend};
pub use camera::{CameraDescriptor, CameraDetector, Resolution, ResolutionNegotiator};
pub use capture::{FrameCaptureService, FrameSource};
pub use config::CamwatchConfig;
pub use error::{CamwatchError, Result};
pub use inference::{Predictor, RemoteInferenceClient};
pub use prediction::{MonitorState, PredictionOrchestrator, TickOutcome};
pub use records::{ErrorRecord, PredictionRecord};
pub use ring_buffer::RingBuffer;
pub use streaming::{StreamProcessManager, StreamState};
