//! Error types for the forecast_eval crate

use thiserror::Error;

/// Custom error types for the forecast_eval crate
#[derive(Debug, Error)]
pub enum EvalError {
    /// Malformed or incomplete source data
    #[error("Data error: {0}")]
    DataError(String),

    /// Arithmetic that cannot be carried out, e.g. a percentage of a zero price
    #[error("Computation error: {0}")]
    ComputationError(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// A value that could not be parsed (dates, prices)
    #[error("Parse error: {0}")]
    ParseError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from the CSV reader
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, EvalError>;

impl From<std::num::ParseFloatError> for EvalError {
    fn from(err: std::num::ParseFloatError) -> Self {
        EvalError::ParseError(err.to_string())
    }
}

impl From<chrono::ParseError> for EvalError {
    fn from(err: chrono::ParseError) -> Self {
        EvalError::ParseError(err.to_string())
    }
}
