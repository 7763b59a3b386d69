mod service;

pub use service::FrameCaptureService;

use crate::camera::CameraDescriptor;
use crate::error::CaptureError;
use async_trait::async_trait;

/// Source of single still frames for inference
#[async_trait]
pub trait FrameSource: Send + Sync {
    /// Capture one encoded frame from the camera
    async fn capture_frame(&self, camera: &CameraDescriptor) -> Result<Vec<u8>, CaptureError>;
}
