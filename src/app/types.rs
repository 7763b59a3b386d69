/// Component lifecycle states
#[derive(Debug, Clone, PartialEq)]
pub enum ComponentState {
    Stopped,
    Starting,
    Running,
    Stopping,
    Failed,
}

/// System shutdown reason
#[derive(Debug, Clone)]
pub enum ShutdownReason {
    Signal(String),
    Error(String),
    UserRequest,
}

/// Component names registered with the lifecycle tracker
pub(crate) const DETECTION: &str = "detection";
pub(crate) const STREAMS: &str = "streams";
pub(crate) const API: &str = "api";
pub(crate) const PREDICTIONS: &str = "predictions";
