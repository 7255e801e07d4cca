/// Domain-specific error types for the curvature experiment.
/// Precondition failures in the core are fatal for the run; the
/// peripheral collaborators (feed, cache, server) map their own
/// failures into the same enum.
#[derive(Debug, thiserror::Error)]
pub enum LabError {
    #[error("network error: {0}")]
    Network(String),

    #[error("parse error: {0}")]
    Parse(String),

    #[error("price feed error: {0}")]
    Feed(String),

    #[error("insufficient data: {0}")]
    InsufficientData(String),

    #[error("invalid price at index {index}: {value}")]
    InvalidPrice { index: usize, value: f64 },

    #[error("series length mismatch: {left} vs {right}")]
    LengthMismatch { left: usize, right: usize },

    #[error("correlation undefined: {0}")]
    DegenerateCorrelation(String),

    #[error("ensemble exhausted: {rejected} of {members} members produced non-finite paths")]
    EnsembleExhausted { members: usize, rejected: usize },

    #[error("calibration sweep produced no usable candidate")]
    EmptySweep,

    #[error("database error: {0}")]
    Database(String),

    #[error("config error: {0}")]
    Config(String),
}

impl From<reqwest::Error> for LabError {
    fn from(e: reqwest::Error) -> Self {
        LabError::Network(e.to_string())
    }
}

impl From<rusqlite::Error> for LabError {
    fn from(e: rusqlite::Error) -> Self {
        LabError::Database(e.to_string())
    }
}

pub type LabResult<T> = Result<T, LabError>;
