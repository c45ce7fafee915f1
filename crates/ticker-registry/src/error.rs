//! Registry error types.

use thiserror::Error;
use ticker_horizon::HorizonError;

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] HorizonError),

    #[error("Asset scrape cancelled")]
    Cancelled,
}

pub type RegistryResult<T> = Result<T, RegistryError>;
