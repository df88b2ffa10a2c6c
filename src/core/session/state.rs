use serde::{Deserialize, Serialize};

/// Lifecycle of a serial session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionStatus {
    /// Constructed, never opened
    Unconnected,
    /// Transport open
    Connected,
    /// Transport released
    Closed,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionStatus::Unconnected => write!(f, "Unconnected"),
            SessionStatus::Connected => write!(f, "Connected"),
            SessionStatus::Closed => write!(f, "Closed"),
        }
    }
}

/// Why a streaming loop returned
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopReason {
    Interrupted,
    SessionClosed,
    DeadlineReached,
}

/// Result of running the console loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSummary {
    pub lines: u64,
    pub reason: StopReason,
}
