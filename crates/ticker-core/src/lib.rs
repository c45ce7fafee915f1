//! Core domain types for the ledger market-data ticker.
//!
//! This crate provides the types shared by every ingestion stage:
//! - `AssetStat`, `IssuerMetadata`, `EnrichedAsset`: the asset-trust pipeline
//! - `RawTrade`, `StoredTrade`, `TradePrice`: the trade pipeline
//! - `parse_amount`, `rational_to_f64`: exact numeric conversion
//! - `RetryPolicy`: bounded retry shared by page and metadata fetches

pub mod asset;
pub mod decimal;
pub mod error;
pub mod market;
pub mod retry;
pub mod trade;

use std::pin::Pin;

/// Boxed future for dyn-compatible async trait methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn std::future::Future<Output = T> + Send + 'a>>;

pub use asset::{
    AccountCounts, AssetFlags, AssetLinks, AssetRecord, AssetStat, AssetType, CurrencyEntry, EnrichedAsset,
    IssuerMetadata, Link, OrgDocumentation, NATIVE_ASSET_CODE, NATIVE_ASSET_ISSUER,
};
pub use decimal::{is_zero_amount, parse_amount, rational_to_f64};
pub use error::{CoreError, Result};
pub use market::{MarketRow, PartialMarketRow};
pub use retry::{Backoff, RetryPolicy};
pub use trade::{normalize_trade_assets, trade_id_key, RawTrade, StoredTrade, TradePrice};
