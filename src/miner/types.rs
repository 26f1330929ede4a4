use chrono::{DateTime, Utc};
use serde::Serialize;

/// Lifecycle of the supervised miner process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", content = "detail")]
pub enum SupervisorState {
    Stopped,
    Starting,
    Running { pid: u32 },
    Stopping,
    Failed(String),
}

impl SupervisorState {
    /// Whether a child process is associated with this state.
    pub fn has_child(&self) -> bool {
        matches!(self, Self::Starting | Self::Running { .. })
    }
}

/// Coarse reason attached to an error notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ProcessError {
    FailedToStart,
    Crashed,
    Timeout,
    ReadError,
    WriteError,
    Unknown,
}

impl ProcessError {
    pub fn message(&self) -> &'static str {
        match self {
            Self::FailedToStart => "Miner executable could not be started",
            Self::Crashed => "Miner crashed",
            Self::Timeout => "Miner did not exit in time",
            Self::ReadError => "Failed to read miner output",
            Self::WriteError => "Failed to write miner log",
            Self::Unknown => "Unknown miner error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputStream {
    Stdout,
    Stderr,
}

/// One line of miner output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputLine {
    pub stream: OutputStream,
    pub line: String,
    pub at: DateTime<Utc>,
}

/// Notifications for the presentation layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", content = "data")]
pub enum SupervisorEvent {
    StateChanged(SupervisorState),
    Output(OutputLine),
    ErrorOccurred(ProcessError),
    Exited { code: Option<i32> },
}
