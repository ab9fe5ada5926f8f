use connectors::sql::base::error::DbError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum SourceError {
    #[error("Query failed for source '{source_name}': {message}")]
    Query { source_name: String, message: String },

    #[error("Source '{source_name}' cannot resume from position {position}")]
    IncompatiblePosition {
        source_name: String,
        position: String,
    },

    #[error("Source '{0}' was read before being opened")]
    NotOpen(String),
}

impl SourceError {
    pub fn from_db(source_name: &str, err: DbError) -> Self {
        match err {
            DbError::IncompatibleCursor(position) => SourceError::IncompatiblePosition {
                source_name: source_name.to_string(),
                position,
            },
            other => SourceError::Query {
                source_name: source_name.to_string(),
                message: other.to_string(),
            },
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransformError {
    #[error("Record {record_id} rejected: {reason}")]
    Rejected { record_id: String, reason: String },
}

impl TransformError {
    pub fn rejected(record_id: impl Into<String>, reason: impl Into<String>) -> Self {
        TransformError::Rejected {
            record_id: record_id.into(),
            reason: reason.into(),
        }
    }

    pub fn record_id(&self) -> &str {
        match self {
            TransformError::Rejected { record_id, .. } => record_id,
        }
    }
}

#[derive(Error, Debug)]
pub enum SinkError {
    #[error("Database error: {0}")]
    Db(#[from] DbError),

    #[error("Statement for record {record_id} affected {actual} rows, expected {expected}")]
    RowCountMismatch {
        record_id: String,
        expected: u64,
        actual: u64,
    },

    #[error("Record {record_id} rejected by sink: {reason}")]
    Rejected { record_id: String, reason: String },

    #[error("Sink transaction already closed")]
    Closed,
}

impl SinkError {
    /// Offending record, when the failure can be pinned to one.
    pub fn record_id(&self) -> Option<&str> {
        match self {
            SinkError::RowCountMismatch { record_id, .. } | SinkError::Rejected { record_id, .. } => {
                Some(record_id)
            }
            SinkError::Db(_) | SinkError::Closed => None,
        }
    }
}

#[derive(Error, Debug)]
pub enum StateStoreError {
    #[error("Failed to save execution: {0}")]
    SaveExecution(String),

    #[error("Failed to load execution: {0}")]
    LoadExecution(String),

    #[error("Failed to append WAL entry: {0}")]
    AppendWal(String),

    #[error("Failed to iterate WAL entries: {0}")]
    IterateWal(String),

    #[error("Failed to prune WAL entries: {0}")]
    PruneWal(String),

    #[error("Failed to open state store: {0}")]
    Open(String),
}
