use std::fmt;

/// Lifecycle of one camera's continuous capture.
///
/// `Stopped → Starting → Streaming → Failed`; there is no transition out of
/// `Failed`. `Stopped` is also the state after a requested shutdown.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamState {
    Stopped,
    Starting,
    Streaming,
    Failed(String),
}

impl StreamState {
    pub fn label(&self) -> &'static str {
        match self {
            StreamState::Stopped => "stopped",
            StreamState::Starting => "starting",
            StreamState::Streaming => "streaming",
            StreamState::Failed(_) => "failed",
        }
    }

    /// Whether viewers may attach
    pub fn is_serving(&self) -> bool {
        matches!(self, StreamState::Starting | StreamState::Streaming)
    }

    /// Whether the state has left `Starting` (first output, exit or failure)
    pub fn is_settled(&self) -> bool {
        !matches!(self, StreamState::Starting)
    }
}

impl fmt::Display for StreamState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamState::Failed(reason) => write!(f, "failed: {}", reason),
            other => f.write_str(other.label()),
        }
    }
}
