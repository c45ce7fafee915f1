//! Feed error types.

use thiserror::Error;
use ticker_horizon::HorizonError;
use ticker_persistence::PersistenceError;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("Upstream error: {0}")]
    Upstream(#[from] HorizonError),

    #[error("Storage error: {0}")]
    Storage(#[from] PersistenceError),

    #[error("Trade backfill cancelled")]
    Cancelled,

    #[error("Stream task failed: {0}")]
    Task(String),
}

pub type FeedResult<T> = Result<T, FeedError>;
