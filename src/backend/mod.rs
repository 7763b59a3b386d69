mod ffmpeg;
#[cfg(test)]
pub(crate) mod scripted;

pub use ffmpeg::{parse_avfoundation_devices, parse_dshow_devices, FfmpegBackend};

use crate::camera::CameraDescriptor;
use crate::error::CameraError;
use async_trait::async_trait;
use tokio::process::Command;

/// Capture platform the ffmpeg invocations are built for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    /// Video4Linux2 device nodes under /dev
    Linux,
    /// AVFoundation devices addressed by index
    MacOs,
    /// DirectShow devices addressed by friendly name
    Windows,
}

impl Platform {
    /// Platform of the running binary
    pub fn current() -> Self {
        if cfg!(target_os = "macos") {
            Platform::MacOs
        } else if cfg!(target_os = "windows") {
            Platform::Windows
        } else {
            Platform::Linux
        }
    }

    /// ffmpeg input format name
    pub fn input_format(&self) -> &'static str {
        match self {
            Platform::Linux => "v4l2",
            Platform::MacOs => "avfoundation",
            Platform::Windows => "dshow",
        }
    }
}

/// Capture tool capability used by detection, streaming and single-frame capture.
///
/// The command builders only set program and arguments; callers own stdio
/// configuration and process supervision.
#[async_trait]
pub trait VideoCaptureBackend: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// List device identifiers in enumeration order
    async fn enumerate_devices(&self) -> Result<Vec<String>, CameraError>;

    /// Invocation whose output lists the device's supported formats
    fn probe_formats(&self, device: &str) -> Command;

    /// Invocation writing a continuous MJPEG stream to stdout
    fn continuous_capture(&self, camera: &CameraDescriptor) -> Command;

    /// Invocation writing exactly one JPEG frame to stdout and exiting
    fn single_frame_capture(&self, camera: &CameraDescriptor) -> Command;
}
