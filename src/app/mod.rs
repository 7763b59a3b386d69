mod orchestrator;
mod runtime;
mod shutdown;
mod startup;
mod state;
mod types;


pub use orchestrator::CamwatchApp;
pub use types::{ComponentState, ShutdownReason};
