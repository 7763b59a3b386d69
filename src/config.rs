use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, info};

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CamwatchConfig {
    pub camera: CameraConfig,
    pub stream: StreamConfig,
    pub inference: InferenceConfig,
    pub api: ApiConfig,
    pub history: HistoryConfig,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct CameraConfig {
    /// Path or name of the ffmpeg executable
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: String,

    /// Stream port of camera 0; camera N listens on base_port + N
    #[serde(default = "default_base_port")]
    pub base_port: u16,

    /// Target frames per second for the continuous stream
    #[serde(default = "default_camera_fps")]
    pub fps: u32,

    /// Largest resolution the negotiator may select (width, height)
    #[serde(default = "default_max_resolution")]
    pub max_resolution: (u32, u32),

    /// Resolution used when probing yields nothing usable (width, height)
    #[serde(default = "default_fallback_resolution")]
    pub fallback_resolution: (u32, u32),

    /// Upper bound on a single format probe
    #[serde(default = "default_probe_timeout_secs")]
    pub probe_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct StreamConfig {
    /// IP address the per-camera stream listeners bind to
    #[serde(default = "default_stream_ip")]
    pub ip: String,

    /// Host name advertised in stream URLs
    #[serde(default = "default_public_host")]
    pub public_host: String,

    /// Chunks buffered per camera before a slow viewer starts skipping
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct InferenceConfig {
    /// Prediction endpoint receiving the multipart upload
    #[serde(default = "default_endpoint")]
    pub endpoint: String,

    /// Model roster, visited round-robin one model per cycle
    #[serde(default = "default_models")]
    pub models: Vec<String>,

    /// Optional confidence threshold forwarded to the API
    #[serde(default)]
    pub threshold: Option<f64>,

    /// Seconds between prediction cycles
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Upper bound on a single-frame capture
    #[serde(default = "default_capture_timeout_secs")]
    pub capture_timeout_secs: u64,

    /// Upper bound on one prediction request
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ApiConfig {
    /// IP address the snapshot API binds to
    #[serde(default = "default_api_ip")]
    pub ip: String,

    /// Port the snapshot API listens on
    #[serde(default = "default_api_port")]
    pub port: u16,
}

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct HistoryConfig {
    #[serde(default = "default_prediction_capacity")]
    pub prediction_capacity: usize,

    #[serde(default = "default_error_capacity")]
    pub error_capacity: usize,
}

impl CameraConfig {
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_secs(self.probe_timeout_secs)
    }
}

impl InferenceConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_secs(self.capture_timeout_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

impl CamwatchConfig {
    /// Load configuration from default sources (file + environment variables)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from_file("camwatch.toml")
    }

    /// Load configuration from a specific file path
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path_str = path.as_ref().to_string_lossy();
        debug!("Loading configuration from: {}", path_str);

        let settings = Config::builder()
            .set_default("camera.ffmpeg_path", default_ffmpeg_path())?
            .set_default("camera.base_port", default_base_port() as i64)?
            .set_default("camera.fps", default_camera_fps() as i64)?
            .set_default(
                "camera.max_resolution",
                vec![
                    default_max_resolution().0 as i64,
                    default_max_resolution().1 as i64,
                ],
            )?
            .set_default(
                "camera.fallback_resolution",
                vec![
                    default_fallback_resolution().0 as i64,
                    default_fallback_resolution().1 as i64,
                ],
            )?
            .set_default("camera.probe_timeout_secs", default_probe_timeout_secs() as i64)?
            .set_default("stream.ip", default_stream_ip())?
            .set_default("stream.public_host", default_public_host())?
            .set_default(
                "stream.channel_capacity",
                default_channel_capacity() as i64,
            )?
            .set_default("inference.endpoint", default_endpoint())?
            .set_default("inference.models", default_models())?
            .set_default("inference.interval_secs", default_interval_secs() as i64)?
            .set_default(
                "inference.capture_timeout_secs",
                default_capture_timeout_secs() as i64,
            )?
            .set_default(
                "inference.request_timeout_secs",
                default_request_timeout_secs() as i64,
            )?
            .set_default("api.ip", default_api_ip())?
            .set_default("api.port", default_api_port() as i64)?
            .set_default(
                "history.prediction_capacity",
                default_prediction_capacity() as i64,
            )?
            .set_default("history.error_capacity", default_error_capacity() as i64)?
            // Add configuration file (optional)
            .add_source(File::with_name(&path_str).required(false))
            // CAMWATCH_INFERENCE__MODELS=a,b,c
            .add_source(
                Environment::with_prefix("CAMWATCH")
                    .prefix_separator("_")
                    .separator("__")
                    .list_separator(",")
                    .with_list_parse_key("inference.models")
                    .try_parsing(true),
            )
            .build()?;

        let config: CamwatchConfig = settings.try_deserialize()?;

        info!("Configuration loaded successfully");
        debug!("Final configuration: {:#?}", config);

        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.camera.fps == 0 {
            return Err(ConfigError::Message(
                "Camera fps must be greater than 0".to_string(),
            ));
        }

        for (name, (width, height)) in [
            ("max_resolution", self.camera.max_resolution),
            ("fallback_resolution", self.camera.fallback_resolution),
        ] {
            if width == 0 || height == 0 {
                return Err(ConfigError::Message(format!(
                    "Camera {} must be greater than 0",
                    name
                )));
            }
        }

        if self.camera.probe_timeout_secs == 0 {
            return Err(ConfigError::Message(
                "Camera probe_timeout_secs must be greater than 0".to_string(),
            ));
        }

        if self.stream.channel_capacity == 0 {
            return Err(ConfigError::Message(
                "Stream channel_capacity must be greater than 0".to_string(),
            ));
        }

        if self.inference.endpoint.trim().is_empty() {
            return Err(ConfigError::Message(
                "Inference endpoint must not be empty".to_string(),
            ));
        }

        if self.inference.interval_secs == 0
            || self.inference.capture_timeout_secs == 0
            || self.inference.request_timeout_secs == 0
        {
            return Err(ConfigError::Message(
                "Inference interval and timeouts must be greater than 0".to_string(),
            ));
        }

        if self.history.prediction_capacity == 0 || self.history.error_capacity == 0 {
            return Err(ConfigError::Message(
                "History capacities must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for CamwatchConfig {
    fn default() -> Self {
        Self {
            camera: CameraConfig {
                ffmpeg_path: default_ffmpeg_path(),
                base_port: default_base_port(),
                fps: default_camera_fps(),
                max_resolution: default_max_resolution(),
                fallback_resolution: default_fallback_resolution(),
                probe_timeout_secs: default_probe_timeout_secs(),
            },
            stream: StreamConfig {
                ip: default_stream_ip(),
                public_host: default_public_host(),
                channel_capacity: default_channel_capacity(),
            },
            inference: InferenceConfig {
                endpoint: default_endpoint(),
                models: default_models(),
                threshold: None,
                interval_secs: default_interval_secs(),
                capture_timeout_secs: default_capture_timeout_secs(),
                request_timeout_secs: default_request_timeout_secs(),
            },
            api: ApiConfig {
                ip: default_api_ip(),
                port: default_api_port(),
            },
            history: HistoryConfig {
                prediction_capacity: default_prediction_capacity(),
                error_capacity: default_error_capacity(),
            },
        }
    }
}

// Default value functions
fn default_ffmpeg_path() -> String {
    "ffmpeg".to_string()
}
fn default_base_port() -> u16 {
    8081
}
fn default_camera_fps() -> u32 {
    30
}
fn default_max_resolution() -> (u32, u32) {
    (1920, 1080)
}
fn default_fallback_resolution() -> (u32, u32) {
    (1280, 720)
}
fn default_probe_timeout_secs() -> u64 {
    5
}

fn default_stream_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_public_host() -> String {
    "localhost".to_string()
}
fn default_channel_capacity() -> usize {
    64
}

fn default_endpoint() -> String {
    "http://localhost:8000/predict".to_string()
}
fn default_models() -> Vec<String> {
    vec![
        "resnet50".to_string(),
        "mobilenet_v3".to_string(),
        "efficientnet_b0".to_string(),
    ]
}
fn default_interval_secs() -> u64 {
    30
}
fn default_capture_timeout_secs() -> u64 {
    10
}
fn default_request_timeout_secs() -> u64 {
    30
}

fn default_api_ip() -> String {
    "0.0.0.0".to_string()
}
fn default_api_port() -> u16 {
    3000
}

fn default_prediction_capacity() -> usize {
    100
}
fn default_error_capacity() -> usize {
    50
}
