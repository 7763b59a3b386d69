//! Shell-script backend standing in for ffmpeg in tests.

use super::VideoCaptureBackend;
use crate::camera::CameraDescriptor;
use crate::error::CameraError;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::process::Command;

/// Runs `sh -c` snippets; `{device}` in a script is replaced by the device id
#[derive(Debug, Default)]
pub(crate) struct ScriptedBackend {
    pub devices: Option<Vec<String>>,
    pub probe_script: String,
    pub continuous_script: String,
    pub capture_script: String,
    pub spawned: AtomicUsize,
}

impl ScriptedBackend {
    pub fn with_devices(devices: &[&str]) -> Self {
        Self {
            devices: Some(devices.iter().map(|d| d.to_string()).collect()),
            ..Self::default()
        }
    }

    pub fn probe(mut self, script: &str) -> Self {
        self.probe_script = script.to_string();
        self
    }

    pub fn continuous(mut self, script: &str) -> Self {
        self.continuous_script = script.to_string();
        self
    }

    pub fn capture(mut self, script: &str) -> Self {
        self.capture_script = script.to_string();
        self
    }

    /// Number of commands handed out so far
    pub fn spawn_count(&self) -> usize {
        self.spawned.load(Ordering::SeqCst)
    }

    fn shell(&self, script: &str, device: &str) -> Command {
        self.spawned.fetch_add(1, Ordering::SeqCst);
        let mut command = Command::new("sh");
        command.arg("-c").arg(script.replace("{device}", device));
        command
    }
}

#[async_trait]
impl VideoCaptureBackend for ScriptedBackend {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn enumerate_devices(&self) -> Result<Vec<String>, CameraError> {
        self.devices.clone().ok_or_else(|| CameraError::Enumeration {
            details: "scripted enumeration failure".to_string(),
        })
    }

    fn probe_formats(&self, device: &str) -> Command {
        self.shell(&self.probe_script, device)
    }

    fn continuous_capture(&self, camera: &CameraDescriptor) -> Command {
        self.shell(&self.continuous_script, &camera.device)
    }

    fn single_frame_capture(&self, camera: &CameraDescriptor) -> Command {
        self.shell(&self.capture_script, &camera.device)
    }
}
