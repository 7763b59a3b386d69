use super::types::Resolution;
use crate::backend::VideoCaptureBackend;
use crate::error::CameraError;
use regex::Regex;
use std::process::Stdio;
use std::sync::{Arc, OnceLock};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Extract every distinct `WIDTHxHEIGHT` token, largest pixel count first
pub fn parse_resolutions(text: &str) -> Vec<Resolution> {
    static TOKEN: OnceLock<Regex> = OnceLock::new();
    let pattern = TOKEN
        .get_or_init(|| Regex::new(r"\b(\d{2,5})x(\d{2,5})\b").expect("valid resolution pattern"));

    let mut candidates: Vec<Resolution> = Vec::new();
    for captures in pattern.captures_iter(text) {
        let (Ok(width), Ok(height)) = (captures[1].parse::<u32>(), captures[2].parse::<u32>()) else {
            continue;
        };
        let resolution = Resolution::new(width, height);
        if !candidates.contains(&resolution) {
            candidates.push(resolution);
        }
    }

    // Stable sort keeps first-seen order between equal pixel counts
    candidates.sort_by(|a, b| b.pixels().cmp(&a.pixels()));
    candidates
}

/// Picks a capture resolution per device from the backend's format probe
pub struct ResolutionNegotiator {
    backend: Arc<dyn VideoCaptureBackend>,
    max_resolution: Resolution,
    fallback: Resolution,
    probe_timeout: Duration,
}

impl ResolutionNegotiator {
    pub fn new(
        backend: Arc<dyn VideoCaptureBackend>,
        max_resolution: Resolution,
        fallback: Resolution,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            backend,
            max_resolution,
            fallback,
            probe_timeout,
        }
    }

    pub fn fallback(&self) -> Resolution {
        self.fallback
    }

    /// Highest-ranked probe candidate within the bound, else the fallback
    pub fn select(&self, probe_output: &str) -> Resolution {
        parse_resolutions(probe_output)
            .into_iter()
            .find(|candidate| candidate.fits_within(self.max_resolution))
            .unwrap_or(self.fallback)
    }

    /// Probe the device and select its resolution; never fails
    pub async fn negotiate(&self, device: &str) -> Resolution {
        match self.probe(device).await {
            Ok(output) => {
                let resolution = self.select(&output);
                info!(device = %device, %resolution, "Negotiated capture resolution");
                resolution
            }
            Err(e) => {
                warn!(
                    device = %device,
                    fallback = %self.fallback,
                    "Format probe failed, using fallback resolution: {}",
                    e
                );
                self.fallback
            }
        }
    }

    /// Run the format probe and return its combined stdout and stderr text
    async fn probe(&self, device: &str) -> Result<String, CameraError> {
        let mut command = self.backend.probe_formats(device);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let child = command.spawn().map_err(|source| CameraError::Probe {
            device: device.to_string(),
            source,
        })?;

        let output = tokio::time::timeout(self.probe_timeout, child.wait_with_output())
            .await
            .map_err(|_| CameraError::ProbeTimeout {
                device: device.to_string(),
                timeout: self.probe_timeout,
            })?
            .map_err(|source| CameraError::Probe {
                device: device.to_string(),
                source,
            })?;

        // Listing tools exit non-zero after printing formats; the text is still usable
        debug!(
            device = %device,
            status = ?output.status,
            "Format probe finished"
        );

        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push('\n');
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Ok(text)
    }
}
