use serde::{Deserialize, Serialize};
use std::fmt;

/// Capture resolution in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }

    pub fn pixels(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    /// True when neither dimension exceeds the bound
    pub fn fits_within(&self, bound: Resolution) -> bool {
        self.width <= bound.width && self.height <= bound.height
    }
}

impl From<(u32, u32)> for Resolution {
    fn from((width, height): (u32, u32)) -> Self {
        Self::new(width, height)
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// A detected camera. Immutable once detection has produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CameraDescriptor {
    /// Contiguous id assigned in enumeration order
    pub id: u32,
    /// Platform device handle (node path, AVFoundation index, DirectShow name)
    pub device: String,
    /// Port the camera's `/stream` endpoint listens on
    pub port: u16,
    pub resolution: Resolution,
    pub fps: u32,
}
