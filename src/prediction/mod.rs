mod orchestrator;
mod roster;
mod state;

pub use orchestrator::{PredictionOrchestrator, TickOutcome};
pub use roster::ModelRoster;
pub use state::MonitorState;
