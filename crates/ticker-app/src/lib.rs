//! Market-data ticker.
//!
//! Orchestrates the pipeline:
//! - Asset refresh: scrape, verify trust, upsert into storage
//! - Trade backfill and live streaming
//! - Market, partial-market and asset summary files

pub mod app;
pub mod config;
pub mod error;
pub mod issuers;
pub mod summary;

pub use app::{Application, AssetRefreshReport};
pub use config::AppConfig;
pub use error::{AppError, AppResult};
