//! Error types for ticker-core.

use thiserror::Error;

/// Conversion errors for upstream amounts and prices.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Invalid amount: {0}")]
    InvalidAmount(String),

    #[error("Invalid price: {n}/{d}")]
    InvalidPrice { n: i64, d: i64 },
}

/// Result type alias for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;
