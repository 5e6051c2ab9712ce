//! # Panel Math
//!
//! Numeric building blocks for monthly sales panels.
//! This crate provides the lag windows and expanding statistics used to derive
//! model features, plus the descriptive statistics used by reporting.

use thiserror::Error;

pub mod stats;
pub mod windows;

/// Errors that can occur in panel calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Calculation error: {0}")]
    CalculationError(String),
}

/// Result type for panel math operations
pub type Result<T> = std::result::Result<T, MathError>;
