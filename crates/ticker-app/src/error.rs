//! Application error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum AppError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Upstream error: {0}")]
    Horizon(#[from] ticker_horizon::HorizonError),

    #[error("Registry error: {0}")]
    Registry(#[from] ticker_registry::RegistryError),

    #[error("Feed error: {0}")]
    Feed(#[from] ticker_feed::FeedError),

    #[error("Persistence error: {0}")]
    Persistence(#[from] ticker_persistence::PersistenceError),

    #[error("Telemetry error: {0}")]
    Telemetry(#[from] ticker_telemetry::TelemetryError),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type AppResult<T> = Result<T, AppError>;
