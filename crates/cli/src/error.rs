use engine_runtime::error::JobError;
use jobs::error::JobsError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No database URL: pass --database-url or set DATABASE_URL")]
    MissingDatabaseUrl,

    #[error("Unknown job '{0}', see `batch jobs`")]
    UnknownJob(String),

    #[error("Failed to build the job: {0}")]
    Jobs(#[from] JobsError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),

    #[error("Failed to serialize data to JSON: {0}")]
    JsonSerialize(#[from] serde_json::Error),
}
