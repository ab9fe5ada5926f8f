use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParameterError {
    #[error("missing job parameter '{0}'")]
    Missing(String),

    #[error("job parameter '{key}' has invalid value '{value}': {reason}")]
    Invalid {
        key: String,
        value: String,
        reason: String,
    },

    #[error("malformed job parameter '{0}', expected KEY=VALUE")]
    Malformed(String),
}
