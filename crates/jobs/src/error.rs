use connectors::sql::base::error::ConnectorError;
use engine_processing::error::BuildError;
use engine_runtime::error::JobError;
use model::execution::errors::ParameterError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum JobsError {
    #[error("Unknown job '{0}'")]
    UnknownJob(String),

    #[error("Connection error: {0}")]
    Connector(#[from] ConnectorError),

    #[error("Parameter error: {0}")]
    Parameter(#[from] ParameterError),

    #[error("Step build error: {0}")]
    Build(#[from] BuildError),

    #[error("Job error: {0}")]
    Job(#[from] JobError),
}
