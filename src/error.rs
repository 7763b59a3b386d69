use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CamwatchError {
    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("Camera error: {0}")]
    Camera(#[from] CameraError),

    #[error("Capture error: {0}")]
    Capture(#[from] CaptureError),

    #[error("Inference error: {0}")]
    Inference(#[from] InferenceError),

    #[error("Stream error: {0}")]
    Stream(#[from] StreamError),

    #[error("System error: {message}")]
    System { message: String },
}

impl CamwatchError {
    pub fn system<S: Into<String>>(message: S) -> Self {
        Self::System {
            message: message.into(),
        }
    }
}

/// Device discovery and format probing failures
#[derive(Error, Debug)]
pub enum CameraError {
    #[error("Device enumeration failed: {details}")]
    Enumeration { details: String },

    #[error("Format probe for {device} timed out after {timeout:?}")]
    ProbeTimeout { device: String, timeout: Duration },

    #[error("Format probe for {device} failed: {source}")]
    Probe {
        device: String,
        #[source]
        source: std::io::Error,
    },
}

/// Single-frame capture failures
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Failed to spawn capture for {device}: {source}")]
    Spawn {
        device: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Capture for {device} timed out after {timeout:?}")]
    Timeout { device: String, timeout: Duration },

    #[error("Capture for {device} exited with {code:?}: {stderr}")]
    Exit {
        device: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Capture for {device} produced no data")]
    Empty { device: String },

    #[error("Capture for {device} failed while reading output: {source}")]
    Read {
        device: String,
        #[source]
        source: std::io::Error,
    },
}

/// Remote prediction API failures
#[derive(Error, Debug)]
pub enum InferenceError {
    #[error("Prediction request failed: {details}")]
    Request { details: String },

    #[error("Prediction API returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Prediction API returned a malformed body: {details}")]
    MalformedBody { details: String },
}

/// Per-camera stream lifecycle failures
#[derive(Error, Debug)]
pub enum StreamError {
    #[error("Failed to bind to {address}: {source}")]
    BindFailed {
        address: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to spawn stream process for camera {camera_id}: {source}")]
    SpawnFailed {
        camera_id: u32,
        #[source]
        source: std::io::Error,
    },
}

pub type Result<T> = std::result::Result<T, CamwatchError>;
