//! Per-camera continuous capture fanned out to MJPEG viewers.
//!
//! Each camera gets one capture process, one broadcast channel and one HTTP
//! listener on the camera's port. Every chunk the process writes is framed as
//! a multipart part and delivered to all connected viewers.

mod handlers;
mod manager;
mod server;
mod state;
mod stats;
mod supervisor;
#[cfg(test)]
mod tests;

pub use handlers::{encode_part, mjpeg_stream_handler, BOUNDARY};
pub use manager::StreamProcessManager;
pub use server::{StreamContext, StreamServer};
pub use state::StreamState;
pub use stats::{StreamStats, StreamStatsSnapshot};
pub use supervisor::StreamHandle;
