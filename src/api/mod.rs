//! Read-only snapshot API polled by the dashboard.

mod handlers;
mod server;
#[cfg(test)]
mod tests;

pub use handlers::{CameraView, StatusView};
pub use server::{create_router, ApiServer, ApiState};
