use thiserror::Error;

/// Errors from mixture construction, estimation, scoring, and IO.
#[derive(Debug, Error)]
pub enum GmmError {
    #[error("dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },

    #[error("invalid model: {0}")]
    InvalidModel(String),

    #[error("not enough frames")]
    InsufficientData,

    #[error("invalid format: {0}")]
    InvalidFormat(String),

    #[error("io error: {0}")]
    Io(String),
}
