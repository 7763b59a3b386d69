use super::FrameSource;
use crate::backend::VideoCaptureBackend;
use crate::camera::CameraDescriptor;
use crate::error::CaptureError;
use async_trait::async_trait;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

const STDERR_EXCERPT_CHARS: usize = 200;

/// Bounded-time single-frame capture, independent of the continuous stream.
///
/// Callers must keep at most one capture outstanding per camera.
pub struct FrameCaptureService {
    backend: Arc<dyn VideoCaptureBackend>,
    timeout: Duration,
}

impl FrameCaptureService {
    pub fn new(backend: Arc<dyn VideoCaptureBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Capture one frame; succeeds only on a zero exit with non-empty output
    pub async fn capture(&self, camera: &CameraDescriptor) -> Result<Vec<u8>, CaptureError> {
        let started = Instant::now();
        let mut command = self.backend.single_frame_capture(camera);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            // Dropping the child on timeout kills the process
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| CaptureError::Spawn {
            device: camera.device.clone(),
            source,
        })?;

        let output = match tokio::time::timeout(self.timeout, child.wait_with_output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(source)) => {
                return Err(CaptureError::Read {
                    device: camera.device.clone(),
                    source,
                })
            }
            Err(_) => {
                warn!(
                    camera_id = camera.id,
                    device = %camera.device,
                    timeout = ?self.timeout,
                    "Frame capture timed out, process killed"
                );
                return Err(CaptureError::Timeout {
                    device: camera.device.clone(),
                    timeout: self.timeout,
                });
            }
        };

        if !output.status.success() {
            return Err(CaptureError::Exit {
                device: camera.device.clone(),
                code: output.status.code(),
                stderr: stderr_excerpt(&output.stderr),
            });
        }

        if output.stdout.is_empty() {
            return Err(CaptureError::Empty {
                device: camera.device.clone(),
            });
        }

        debug!(
            camera_id = camera.id,
            bytes = output.stdout.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "Captured frame"
        );

        Ok(output.stdout)
    }
}

#[async_trait]
impl FrameSource for FrameCaptureService {
    async fn capture_frame(&self, camera: &CameraDescriptor) -> Result<Vec<u8>, CaptureError> {
        self.capture(camera).await
    }
}

/// Last few hundred characters of stderr, where ffmpeg puts the actual error
fn stderr_excerpt(stderr: &[u8]) -> String {
    let text = String::from_utf8_lossy(stderr);
    let trimmed = text.trim();
    let count = trimmed.chars().count();
    if count <= STDERR_EXCERPT_CHARS {
        return trimmed.to_string();
    }
    trimmed.chars().skip(count - STDERR_EXCERPT_CHARS).collect()
}
