//! Error types for the ATSP solver.

use thiserror::Error;

/// Main error type for solver operations
#[derive(Debug, Error)]
pub enum TspError {
    /// Malformed cost matrix, label mismatch, non-numeric cell or bad parameters
    #[error("validation error: {0}")]
    Validation(String),

    /// Node index outside `[0, n)`
    #[error("index {index} out of range: must be between 0 and {n} (exclusive)")]
    Range { index: usize, n: usize },

    /// Label not present in the graph
    #[error("unknown label: {0:?}")]
    UnknownLabel(String),

    /// Tour is not a permutation of the graph's nodes
    #[error("invalid tour: {0}")]
    InvalidTour(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Result type alias for solver operations
pub type Result<T> = std::result::Result<T, TspError>;
