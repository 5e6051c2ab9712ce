//! Error types for the sales_forecast crate

use polars::prelude::PolarsError;
use thiserror::Error;

/// Custom error types for the sales_forecast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A required column is absent from one of the input tables
    #[error("Missing column '{column}' in {table} table")]
    MissingColumn { table: String, column: String },

    /// A cell could not be interpreted as the type its column requires
    #[error("Invalid value {value:?} in {table}.{column} at row {row}")]
    InvalidValue {
        table: String,
        column: String,
        row: usize,
        value: String,
    },

    /// Prediction input does not match the trained feature space
    #[error("Feature mismatch: {0}")]
    FeatureMismatch(String),

    /// A ratio metric hit a zero denominator
    #[error("Division by zero: {0}")]
    DivisionByZero(String),

    /// Not enough rows to carry out the operation
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error while reading or validating configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from Polars operations
    #[error("Polars error: {0}")]
    PolarsError(String),

    /// Error from delimited text reading or writing
    #[error("CSV error: {0}")]
    CsvError(String),

    /// Error from panel calculations
    #[error("Math error: {0}")]
    MathError(#[from] panel_math::MathError),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

impl ForecastError {
    pub(crate) fn missing_column(table: &str, column: &str) -> Self {
        ForecastError::MissingColumn {
            table: table.to_string(),
            column: column.to_string(),
        }
    }
}

impl From<PolarsError> for ForecastError {
    fn from(err: PolarsError) -> Self {
        ForecastError::PolarsError(err.to_string())
    }
}

impl From<csv::Error> for ForecastError {
    fn from(err: csv::Error) -> Self {
        ForecastError::CsvError(err.to_string())
    }
}

impl From<toml::de::Error> for ForecastError {
    fn from(err: toml::de::Error) -> Self {
        ForecastError::Config(err.to_string())
    }
}
