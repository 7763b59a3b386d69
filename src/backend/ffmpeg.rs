use super::{Platform, VideoCaptureBackend};
use crate::camera::CameraDescriptor;
use crate::error::CameraError;
use async_trait::async_trait;
use regex::Regex;
use std::path::PathBuf;
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;
use tokio::process::Command;
use tracing::{debug, trace};

const LIST_DEVICES_TIMEOUT: Duration = Duration::from_secs(5);

/// ffmpeg-driven backend covering V4L2, AVFoundation and DirectShow
#[derive(Debug, Clone)]
pub struct FfmpegBackend {
    ffmpeg_path: String,
    platform: Platform,
    device_root: PathBuf,
}

impl FfmpegBackend {
    /// Create a backend for the running platform
    pub fn new(ffmpeg_path: impl Into<String>) -> Self {
        Self::for_platform(ffmpeg_path, Platform::current())
    }

    /// Create a backend for an explicit platform
    pub fn for_platform(ffmpeg_path: impl Into<String>, platform: Platform) -> Self {
        Self {
            ffmpeg_path: ffmpeg_path.into(),
            platform,
            device_root: PathBuf::from("/dev"),
        }
    }

    /// Directory scanned for `videoN` nodes on Linux
    pub fn with_device_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.device_root = root.into();
        self
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    fn base_command(&self) -> Command {
        let mut command = Command::new(&self.ffmpeg_path);
        command.arg("-hide_banner");
        command
    }

    /// Input arguments shared by continuous and single-frame capture
    fn input_args(&self, camera: &CameraDescriptor) -> Vec<String> {
        vec![
            "-f".to_string(),
            self.platform.input_format().to_string(),
            "-framerate".to_string(),
            camera.fps.to_string(),
            "-video_size".to_string(),
            camera.resolution.to_string(),
            "-i".to_string(),
            camera.device.clone(),
        ]
    }

    async fn scan_device_nodes(&self) -> Result<Vec<String>, CameraError> {
        let mut entries = tokio::fs::read_dir(&self.device_root).await.map_err(|e| {
            CameraError::Enumeration {
                details: format!("Cannot read {}: {}", self.device_root.display(), e),
            }
        })?;

        let mut nodes: Vec<(u32, String)> = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| {
            CameraError::Enumeration {
                details: format!("Cannot list {}: {}", self.device_root.display(), e),
            }
        })? {
            let name = entry.file_name().to_string_lossy().into_owned();
            let Some(index) = video_node_index(&name) else {
                continue;
            };

            match entry.file_type().await {
                Ok(file_type) if !file_type.is_dir() => {
                    nodes.push((index, entry.path().to_string_lossy().into_owned()));
                }
                Ok(_) => trace!("Skipping directory {}", name),
                Err(e) => debug!("Skipping {}: {}", name, e),
            }
        }

        nodes.sort_by_key(|(index, _)| *index);
        Ok(nodes.into_iter().map(|(_, path)| path).collect())
    }

    async fn list_devices_output(&self, args: &[&str]) -> Result<String, CameraError> {
        let mut command = self.base_command();
        command.args(args);

        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|e| CameraError::Enumeration {
            details: format!("Failed to spawn {}: {}", self.ffmpeg_path, e),
        })?;

        // ffmpeg exits non-zero after printing the listing, so only the text matters
        match tokio::time::timeout(LIST_DEVICES_TIMEOUT, child.wait_with_output()).await {
            Ok(Ok(output)) => Ok(String::from_utf8_lossy(&output.stderr).into_owned()),
            Ok(Err(e)) => Err(CameraError::Enumeration {
                details: format!("Device listing failed: {}", e),
            }),
            Err(_) => Err(CameraError::Enumeration {
                details: format!("Device listing timed out after {:?}", LIST_DEVICES_TIMEOUT),
            }),
        }
    }
}

#[async_trait]
impl VideoCaptureBackend for FfmpegBackend {
    fn name(&self) -> &'static str {
        self.platform.input_format()
    }

    async fn enumerate_devices(&self) -> Result<Vec<String>, CameraError> {
        let devices = match self.platform {
            Platform::Linux => self.scan_device_nodes().await?,
            Platform::MacOs => {
                let output = self
                    .list_devices_output(&["-f", "avfoundation", "-list_devices", "true", "-i", ""])
                    .await?;
                parse_avfoundation_devices(&output)
            }
            Platform::Windows => {
                let output = self
                    .list_devices_output(&["-list_devices", "true", "-f", "dshow", "-i", "dummy"])
                    .await?;
                parse_dshow_devices(&output)
            }
        };

        debug!("{} backend enumerated {} devices", self.name(), devices.len());
        Ok(devices)
    }

    fn probe_formats(&self, device: &str) -> Command {
        let mut command = self.base_command();
        match self.platform {
            Platform::Linux => {
                command.args(["-f", "v4l2", "-list_formats", "all", "-i", device]);
            }
            Platform::MacOs => {
                // An unsupported size makes AVFoundation print the supported modes
                command.args(["-f", "avfoundation", "-video_size", "1x1", "-i", device]);
            }
            Platform::Windows => {
                command.args(["-f", "dshow", "-list_options", "true", "-i", device]);
            }
        }
        command
    }

    fn continuous_capture(&self, camera: &CameraDescriptor) -> Command {
        let mut command = self.base_command();
        command
            .args(["-loglevel", "error"])
            .args(self.input_args(camera))
            .args(["-f", "mjpeg", "-q:v", "5", "pipe:1"]);
        command
    }

    fn single_frame_capture(&self, camera: &CameraDescriptor) -> Command {
        let mut command = self.base_command();
        command
            .args(["-loglevel", "error"])
            .args(self.input_args(camera))
            .args(["-frames:v", "1", "-f", "image2pipe", "-vcodec", "mjpeg", "pipe:1"]);
        command
    }
}

fn video_node_index(name: &str) -> Option<u32> {
    name.strip_prefix("video")
        .filter(|suffix| !suffix.is_empty() && suffix.bytes().all(|b| b.is_ascii_digit()))
        .and_then(|suffix| suffix.parse().ok())
}

/// Extract AVFoundation video device indices from `-list_devices` output
pub fn parse_avfoundation_devices(output: &str) -> Vec<String> {
    static DEVICE_LINE: OnceLock<Regex> = OnceLock::new();
    let pattern = DEVICE_LINE.get_or_init(|| {
        Regex::new(r"\]\s*\[(\d+)\]\s+(.+)$").expect("valid avfoundation device pattern")
    });

    let mut devices = Vec::new();
    let mut in_video_section = false;

    for line in output.lines() {
        if line.contains("AVFoundation video devices") {
            in_video_section = true;
            continue;
        }
        if line.contains("AVFoundation audio devices") {
            break;
        }
        if !in_video_section {
            continue;
        }
        if let Some(captures) = pattern.captures(line) {
            let name = captures[2].trim();
            // Screen capture inputs are listed alongside real cameras
            if name.starts_with("Capture screen") {
                continue;
            }
            devices.push(captures[1].to_string());
        }
    }

    devices
}

/// Extract DirectShow video device names from `-list_devices` output
pub fn parse_dshow_devices(output: &str) -> Vec<String> {
    static QUOTED_NAME: OnceLock<Regex> = OnceLock::new();
    let pattern =
        QUOTED_NAME.get_or_init(|| Regex::new(r#""([^"]+)""#).expect("valid dshow device pattern"));

    let mut devices = Vec::new();
    let mut in_video_section = false;

    for line in output.lines() {
        if line.contains("DirectShow video devices") {
            in_video_section = true;
            continue;
        }
        if line.contains("DirectShow audio devices") {
            in_video_section = false;
            continue;
        }
        if line.contains("Alternative name") {
            continue;
        }

        let tagged_video = line.contains("(video)");
        if !(tagged_video || in_video_section) {
            continue;
        }
        if let Some(captures) = pattern.captures(line) {
            let device = format!("video={}", &captures[1]);
            if !devices.contains(&device) {
                devices.push(device);
            }
        }
    }

    devices
}
