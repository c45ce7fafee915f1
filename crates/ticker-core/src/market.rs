//! Aggregated market rows produced by a store.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Rolling 24h/7d statistics for one trade pair.
///
/// Orderbook fields stay zero until orderbook ingestion exists.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MarketRow {
    /// `BASE_COUNTER`, e.g. `XLM_USD`.
    pub trade_pair: String,
    pub base_volume_24h: f64,
    pub counter_volume_24h: f64,
    pub trade_count_24h: i64,
    pub open_price_24h: f64,
    pub lowest_price_24h: f64,
    pub highest_price_24h: f64,
    pub price_change_24h: f64,
    pub base_volume_7d: f64,
    pub counter_volume_7d: f64,
    pub trade_count_7d: i64,
    pub open_price_7d: f64,
    pub lowest_price_7d: f64,
    pub highest_price_7d: f64,
    pub price_change_7d: f64,
    pub last_price: f64,
    pub last_price_close_time: Option<DateTime<Utc>>,
    pub num_bids: i64,
    pub bid_volume: f64,
    pub highest_bid: f64,
    pub num_asks: i64,
    pub ask_volume: f64,
    pub lowest_ask: f64,
}

/// Statistics for one trade pair over a caller-chosen window, with the
/// asset details of both legs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PartialMarketRow {
    pub trade_pair: String,
    pub base_asset_id: i32,
    pub base_asset_code: String,
    pub base_asset_issuer: String,
    pub base_asset_type: String,
    pub counter_asset_id: i32,
    pub counter_asset_code: String,
    pub counter_asset_issuer: String,
    pub counter_asset_type: String,
    pub base_volume: f64,
    pub counter_volume: f64,
    pub trade_count: i64,
    pub open: f64,
    pub low: f64,
    pub high: f64,
    pub change: f64,
    pub close: f64,
    pub num_bids: i64,
    pub bid_volume: f64,
    pub highest_bid: f64,
    pub num_asks: i64,
    pub ask_volume: f64,
    pub lowest_ask: f64,
}
