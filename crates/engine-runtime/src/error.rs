use engine_core::error::StateStoreError;
use engine_processing::error::{BuildError, RestartError, StepError};
use thiserror::Error;

/// Top-level errors for launching and inspecting jobs.
#[derive(Debug, Error)]
pub enum JobError {
    #[error("Initialization error: {0}")]
    Initialization(String),

    #[error("Job '{0}' has no steps")]
    NoSteps(String),

    #[error("Duplicate step '{step}' in job '{job}'")]
    DuplicateStep { job: String, step: String },

    #[error("Step build error: {0}")]
    Build(#[from] BuildError),

    #[error("Step error: {0}")]
    Step(#[from] StepError),

    #[error("Restart refused: {0}")]
    Restart(#[from] RestartError),

    #[error("State store error: {0}")]
    State(#[from] StateStoreError),
}
