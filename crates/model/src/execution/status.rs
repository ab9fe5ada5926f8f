use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle of a step execution.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BatchStatus {
    Starting,
    Started,
    Completed,
    Failed,
    /// A stop request was honoured between chunks.
    Stopped,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BatchStatus::Starting => "STARTING",
            BatchStatus::Started => "STARTED",
            BatchStatus::Completed => "COMPLETED",
            BatchStatus::Failed => "FAILED",
            BatchStatus::Stopped => "STOPPED",
        }
    }

    /// Every status except COMPLETED may be resumed. A persisted STARTED means
    /// the previous process died mid-step.
    pub fn is_restartable(&self) -> bool {
        !matches!(self, BatchStatus::Completed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            BatchStatus::Completed | BatchStatus::Failed | BatchStatus::Stopped
        )
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Category of a step failure.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// Source query failed or returned undecodable rows.
    Query,
    /// The transformer rejected a record under the abort policy.
    Transform,
    /// The sink failed to persist the chunk.
    Write,
    /// The step cannot be resumed from its stored state.
    Restart,
    /// A chunk exceeded its deadline.
    Timeout,
    /// Execution state could not be persisted.
    State,
}

impl ErrorKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ErrorKind::Query => "QueryError",
            ErrorKind::Transform => "TransformError",
            ErrorKind::Write => "WriteError",
            ErrorKind::Restart => "RestartError",
            ErrorKind::Timeout => "TimeoutError",
            ErrorKind::State => "StateError",
        }
    }
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
