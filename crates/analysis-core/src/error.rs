use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid method name, missing companion object or out-of-range parameter.
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Numerical failure of an underlying fit or solve.
    #[error("Calculation error: {0}")]
    CalculationError(String),

    #[error("Provider error: {0}")]
    ProviderError(String),
}

pub type AnalysisResult<T> = Result<T, AnalysisError>;
