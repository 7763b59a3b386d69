mod detector;
mod resolution;
mod types;

pub use detector::{assign_ports, CameraDetector};
pub use resolution::{parse_resolutions, ResolutionNegotiator};
pub use types::{CameraDescriptor, Resolution};
