use super::resolution::ResolutionNegotiator;
use super::types::CameraDescriptor;
use crate::backend::VideoCaptureBackend;
use futures::future::join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// Assign contiguous ids and `base_port + id` ports in enumeration order.
///
/// Devices whose port would overflow are dropped from the tail so ids stay
/// contiguous.
pub fn assign_ports(base_port: u16, devices: Vec<String>) -> Vec<(u32, String, u16)> {
    let total = devices.len();
    let assigned: Vec<(u32, String, u16)> = devices
        .into_iter()
        .enumerate()
        .map_while(|(index, device)| {
            let id = u32::try_from(index).ok()?;
            let port = u16::try_from(index)
                .ok()
                .and_then(|offset| base_port.checked_add(offset))?;
            Some((id, device, port))
        })
        .collect();

    if assigned.len() < total {
        warn!(
            "Port range starting at {} fits only {} of {} devices",
            base_port,
            assigned.len(),
            total
        );
    }

    assigned
}

/// Enumerates capture devices once and turns them into camera descriptors
pub struct CameraDetector {
    backend: Arc<dyn VideoCaptureBackend>,
    negotiator: ResolutionNegotiator,
    base_port: u16,
    fps: u32,
}

impl CameraDetector {
    pub fn new(
        backend: Arc<dyn VideoCaptureBackend>,
        negotiator: ResolutionNegotiator,
        base_port: u16,
        fps: u32,
    ) -> Self {
        Self {
            backend,
            negotiator,
            base_port,
            fps,
        }
    }

    /// Detect cameras; enumeration failures yield an empty list
    pub async fn detect(&self) -> Vec<CameraDescriptor> {
        let devices = match self.backend.enumerate_devices().await {
            Ok(devices) => devices,
            Err(e) => {
                warn!(
                    "Camera detection failed on {} backend, continuing without cameras: {}",
                    self.backend.name(),
                    e
                );
                return Vec::new();
            }
        };

        let assigned = assign_ports(self.base_port, devices);
        let resolutions = join_all(
            assigned
                .iter()
                .map(|(_, device, _)| self.negotiator.negotiate(device)),
        )
        .await;

        let cameras: Vec<CameraDescriptor> = assigned
            .into_iter()
            .zip(resolutions)
            .map(|((id, device, port), resolution)| CameraDescriptor {
                id,
                device,
                port,
                resolution,
                fps: self.fps,
            })
            .collect();

        info!("Detected {} cameras", cameras.len());
        for camera in &cameras {
            info!(
                camera_id = camera.id,
                device = %camera.device,
                port = camera.port,
                resolution = %camera.resolution,
                "Camera available"
            );
        }

        cameras
    }
}
