//! In-process store.

use crate::aggregate;
use crate::error::PersistenceResult;
use crate::store::TickerStore;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use std::collections::HashSet;
use ticker_core::{AssetRecord, BoxFuture, MarketRow, PartialMarketRow, StoredTrade};

#[derive(Debug, Default)]
struct StoreState {
    assets: Vec<AssetRecord>,
    trades: Vec<StoredTrade>,
    trade_ids: HashSet<String>,
}

/// Store holding every row in memory.
///
/// Also the working set behind [`crate::JsonLinesStore`].
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a store from previously persisted rows.
    pub fn from_rows(assets: Vec<AssetRecord>, trades: Vec<StoredTrade>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state.write();
            state.assets = assets;
        }
        store.insert_trades(trades);
        store
    }

    pub fn find_asset_id(&self, code: &str, issuer: &str) -> Option<i32> {
        self.state
            .read()
            .assets
            .iter()
            .find(|a| a.matches(code, issuer))
            .map(|a| a.id)
    }

    /// Trades whose ids are neither stored nor repeated earlier in `trades`.
    pub fn unseen_trades(&self, trades: Vec<StoredTrade>) -> Vec<StoredTrade> {
        let state = self.state.read();
        let mut batch = HashSet::new();
        trades
            .into_iter()
            .filter(|t| !state.trade_ids.contains(&t.horizon_id) && batch.insert(t.horizon_id.clone()))
            .collect()
    }

    /// Insert trades whose ids are not yet stored; returns the inserted rows.
    pub fn insert_trades(&self, trades: Vec<StoredTrade>) -> Vec<StoredTrade> {
        let mut state = self.state.write();
        let mut inserted = Vec::with_capacity(trades.len());
        for trade in trades {
            if state.trade_ids.insert(trade.horizon_id.clone()) {
                state.trades.push(trade.clone());
                inserted.push(trade);
            }
        }
        inserted
    }

    /// Insert or replace by code and issuer. Existing rows keep their id;
    /// new rows get the next free id starting at 1.
    pub fn upsert(&self, asset: AssetRecord) -> AssetRecord {
        upsert_row(&mut self.state.write().assets, asset)
    }

    /// Swap in a whole asset table.
    pub fn replace_assets(&self, assets: Vec<AssetRecord>) {
        self.state.write().assets = assets;
    }

    pub fn assets(&self) -> Vec<AssetRecord> {
        self.state.read().assets.clone()
    }

    pub fn trades(&self) -> Vec<StoredTrade> {
        self.state.read().trades.clone()
    }

    pub fn trade_count(&self) -> usize {
        self.state.read().trades.len()
    }

    pub fn latest_trade(&self) -> Option<StoredTrade> {
        self.state
            .read()
            .trades
            .iter()
            .max_by(|a, b| a.ledger_order().cmp(&b.ledger_order()))
            .cloned()
    }

    pub fn compute_market_rows(&self, now: DateTime<Utc>) -> Vec<MarketRow> {
        let state = self.state.read();
        aggregate::market_rows(&state.assets, &state.trades, now)
    }

    pub fn compute_partial_markets(&self, issuer: &str, hours: i64, now: DateTime<Utc>) -> Vec<PartialMarketRow> {
        let state = self.state.read();
        aggregate::partial_markets(&state.assets, &state.trades, issuer, hours, now)
    }
}

pub(crate) fn upsert_row(assets: &mut Vec<AssetRecord>, mut asset: AssetRecord) -> AssetRecord {
    if let Some(existing) = assets
        .iter_mut()
        .find(|a| a.matches(&asset.code, &asset.issuer_account))
    {
        asset.id = existing.id;
        *existing = asset.clone();
        return asset;
    }

    asset.id = assets.iter().map(|a| a.id).max().unwrap_or(0) + 1;
    assets.push(asset.clone());
    asset
}

impl TickerStore for MemoryStore {
    fn asset_id<'a>(&'a self, code: &'a str, issuer: &'a str) -> BoxFuture<'a, PersistenceResult<Option<i32>>> {
        Box::pin(async move { Ok(self.find_asset_id(code, issuer)) })
    }

    fn last_trade(&self) -> BoxFuture<'_, PersistenceResult<Option<StoredTrade>>> {
        Box::pin(async move { Ok(self.latest_trade()) })
    }

    fn bulk_insert_trades(&self, trades: Vec<StoredTrade>) -> BoxFuture<'_, PersistenceResult<usize>> {
        Box::pin(async move { Ok(self.insert_trades(trades).len()) })
    }

    fn upsert_asset(&self, asset: AssetRecord) -> BoxFuture<'_, PersistenceResult<i32>> {
        Box::pin(async move { Ok(self.upsert(asset).id) })
    }

    fn list_assets(&self) -> BoxFuture<'_, PersistenceResult<Vec<AssetRecord>>> {
        Box::pin(async move { Ok(self.assets()) })
    }

    fn market_rows(&self, now: DateTime<Utc>) -> BoxFuture<'_, PersistenceResult<Vec<MarketRow>>> {
        Box::pin(async move { Ok(self.compute_market_rows(now)) })
    }

    fn partial_markets_by_issuer<'a>(
        &'a self,
        issuer: &'a str,
        hours: i64,
        now: DateTime<Utc>,
    ) -> BoxFuture<'a, PersistenceResult<Vec<PartialMarketRow>>> {
        Box::pin(async move { Ok(self.compute_partial_markets(issuer, hours, now)) })
    }
}
