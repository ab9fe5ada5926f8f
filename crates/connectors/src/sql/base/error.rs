use thiserror::Error;

/// All errors coming from the database/query layer.
#[derive(Debug, Error)]
pub enum DbError {
    /// Any driver-level failure.
    #[error("Postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// A row could not be mapped onto its record type.
    #[error("Failed to decode column '{column}': {message}")]
    Decode { column: String, message: String },

    /// A paging query was asked to resume from a cursor it cannot interpret.
    #[error("Cursor {0} is not compatible with this query")]
    IncompatibleCursor(String),

    /// An error occurred while building a SQL query.
    #[error("Query build error: {0}")]
    QueryBuild(String),

    /// The server-side cursor or transaction was used after being closed.
    #[error("Session already closed: {0}")]
    Closed(String),
}

impl DbError {
    pub fn decode(column: &str, err: impl std::fmt::Display) -> Self {
        DbError::Decode {
            column: column.to_string(),
            message: err.to_string(),
        }
    }
}

/// Errors happening during connection setup.
#[derive(Debug, Error)]
pub enum ConnectorError {
    #[error("Invalid connection URL: {0}")]
    InvalidUrl(String),

    #[error("Failed to connect to Postgres: {0}")]
    Connection(#[from] tokio_postgres::Error),

    #[error("TLS configuration error: {0}")]
    TlsConfig(#[from] native_tls::Error),
}
