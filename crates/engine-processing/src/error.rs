use engine_core::error::{SinkError, SourceError, TransformError};
use model::execution::status::ErrorKind;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum StepError {
    #[error("Source error: {0}")]
    Source(#[from] SourceError),

    #[error("Transform error: {0}")]
    Transform(#[from] TransformError),

    #[error("Skip limit of {limit} exceeded: {source}")]
    SkipLimitExceeded {
        limit: u64,
        #[source]
        source: TransformError,
    },

    #[error("Write error: {0}")]
    Sink(#[from] SinkError),

    #[error("Chunk {chunk_index} did not finish within {after:?}")]
    Timeout { chunk_index: u64, after: Duration },

    #[error("State error: {0}")]
    State(#[from] StateError),

    #[error("Restart refused: {0}")]
    Restart(#[from] RestartError),
}

impl StepError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StepError::Source(SourceError::IncompatiblePosition { .. }) => ErrorKind::Restart,
            StepError::Source(_) => ErrorKind::Query,
            StepError::Transform(_) | StepError::SkipLimitExceeded { .. } => ErrorKind::Transform,
            StepError::Sink(_) => ErrorKind::Write,
            StepError::Timeout { .. } => ErrorKind::Timeout,
            StepError::State(_) => ErrorKind::State,
            StepError::Restart(_) => ErrorKind::Restart,
        }
    }

    /// Offending record, when the failure can be pinned to one.
    pub fn record_id(&self) -> Option<String> {
        match self {
            StepError::Transform(e) | StepError::SkipLimitExceeded { source: e, .. } => {
                Some(e.record_id().to_string())
            }
            StepError::Sink(e) => e.record_id().map(str::to_string),
            _ => None,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RestartError {
    #[error("Step '{step}' already completed for instance '{instance}'")]
    AlreadyCompleted { step: String, instance: String },

    #[error("Job '{job}' already completed for instance '{instance}'")]
    JobAlreadyCompleted { job: String, instance: String },

    #[error("Step '{step}' cannot resume its source from position {position}")]
    IncompatiblePosition { step: String, position: String },
}

#[derive(Debug, Error)]
pub enum StateError {
    #[error("Execution load failed: {0}")]
    Load(String),

    #[error("Execution save failed: {0}")]
    Save(String),

    #[error("WAL operation failed: {0}")]
    WalOperation(String),
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum BuildError {
    #[error("Step '{0}' has no source")]
    MissingSource(String),

    #[error("Step '{0}' has no transformer")]
    MissingTransformer(String),

    #[error("Step '{0}' has no sink")]
    MissingSink(String),

    #[error("Step '{0}' needs a positive chunk size")]
    InvalidChunkSize(String),
}
