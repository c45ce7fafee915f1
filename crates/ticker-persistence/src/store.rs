//! Storage seam.

use crate::error::PersistenceResult;
use chrono::{DateTime, Utc};
use std::sync::Arc;
use ticker_core::{AssetRecord, BoxFuture, MarketRow, PartialMarketRow, StoredTrade};

/// Storage operations required by ingestion and summary generation.
pub trait TickerStore: Send + Sync {
    /// Internal id of the asset `code` issued by `issuer`, if stored.
    fn asset_id<'a>(&'a self, code: &'a str, issuer: &'a str) -> BoxFuture<'a, PersistenceResult<Option<i32>>>;

    /// Most recent trade by ledger close time.
    fn last_trade(&self) -> BoxFuture<'_, PersistenceResult<Option<StoredTrade>>>;

    /// Insert trades, skipping ids already stored. Returns the number inserted.
    fn bulk_insert_trades(&self, trades: Vec<StoredTrade>) -> BoxFuture<'_, PersistenceResult<usize>>;

    /// Insert or replace an asset keyed by code and issuer. Returns its id.
    fn upsert_asset(&self, asset: AssetRecord) -> BoxFuture<'_, PersistenceResult<i32>>;

    fn list_assets(&self) -> BoxFuture<'_, PersistenceResult<Vec<AssetRecord>>>;

    /// 24h and 7d statistics per trade pair as of `now`.
    fn market_rows(&self, now: DateTime<Utc>) -> BoxFuture<'_, PersistenceResult<Vec<MarketRow>>>;

    /// Statistics over the last `hours` for pairs with a leg issued by `issuer`.
    fn partial_markets_by_issuer<'a>(
        &'a self,
        issuer: &'a str,
        hours: i64,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, PersistenceResult<Vec<PartialMarketRow>>>;
}

pub type DynTickerStore = Arc<dyn TickerStore>;
