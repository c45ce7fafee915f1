//! Summary documents written by the `generate` commands.

use crate::error::AppResult;
use chrono::{DateTime, SecondsFormat, Utc};
use serde::Serialize;
use std::path::Path;
use ticker_core::{AssetRecord, MarketRow, PartialMarketRow};
use tracing::info;

/// Relative spread and mid-point of the best bid and ask.
///
/// Both are zero when either side of the book is empty.
pub fn calc_spread(highest_bid: f64, lowest_ask: f64) -> (f64, f64) {
    if highest_bid == 0.0 || lowest_ask == 0.0 {
        return (0.0, 0.0);
    }
    let spread = (lowest_ask - highest_bid) / lowest_ask;
    let mid_point = (highest_bid + lowest_ask) / 2.0;
    (spread, mid_point)
}

fn rfc3339(time: DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MarketStats {
    pub name: String,
    pub base_volume: f64,
    pub counter_volume: f64,
    pub trade_count: i64,
    pub open: f64,
    pub low: f64,
    pub high: f64,
    pub change: f64,
    pub base_volume_7d: f64,
    pub counter_volume_7d: f64,
    pub trade_count_7d: i64,
    pub open_7d: f64,
    pub low_7d: f64,
    pub high_7d: f64,
    pub change_7d: f64,
    pub price: f64,
    pub close: f64,
    pub close_time: String,
    pub bid_count: i64,
    pub bid_volume: f64,
    pub bid_max: f64,
    pub ask_count: i64,
    pub ask_volume: f64,
    pub ask_min: f64,
    pub spread: f64,
    pub spread_mid_point: f64,
}

impl From<&MarketRow> for MarketStats {
    fn from(row: &MarketRow) -> Self {
        let (spread, spread_mid_point) = calc_spread(row.highest_bid, row.lowest_ask);
        Self {
            name: row.trade_pair.clone(),
            base_volume: row.base_volume_24h,
            counter_volume: row.counter_volume_24h,
            trade_count: row.trade_count_24h,
            open: row.open_price_24h,
            low: row.lowest_price_24h,
            high: row.highest_price_24h,
            change: row.price_change_24h,
            base_volume_7d: row.base_volume_7d,
            counter_volume_7d: row.counter_volume_7d,
            trade_count_7d: row.trade_count_7d,
            open_7d: row.open_price_7d,
            low_7d: row.lowest_price_7d,
            high_7d: row.highest_price_7d,
            change_7d: row.price_change_7d,
            price: row.last_price,
            close: row.last_price,
            close_time: row.last_price_close_time.map(rfc3339).unwrap_or_default(),
            bid_count: row.num_bids,
            bid_volume: row.bid_volume,
            bid_max: row.highest_bid,
            ask_count: row.num_asks,
            ask_volume: row.ask_volume,
            ask_min: row.lowest_ask,
            spread,
            spread_mid_point,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MarketSummary {
    /// Unix milliseconds.
    pub generated_at: i64,
    pub generated_at_rfc3339: String,
    pub pairs: Vec<MarketStats>,
}

impl MarketSummary {
    pub fn new(rows: &[MarketRow], now: DateTime<Utc>) -> Self {
        Self {
            generated_at: now.timestamp_millis(),
            generated_at_rfc3339: rfc3339(now),
            pairs: rows.iter().map(MarketStats::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PartialMarketStats {
    pub name: String,
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
    pub spread: f64,
    pub spread_mid_point: f64,
}

impl From<&PartialMarketRow> for PartialMarketStats {
    fn from(row: &PartialMarketRow) -> Self {
        let (spread, spread_mid_point) = calc_spread(row.highest_bid, row.lowest_ask);
        Self {
            name: row.trade_pair.clone(),
            base_asset_id: row.base_asset_id,
            base_asset_code: row.base_asset_code.clone(),
            base_asset_issuer: row.base_asset_issuer.clone(),
            base_asset_type: row.base_asset_type.clone(),
            counter_asset_id: row.counter_asset_id,
            counter_asset_code: row.counter_asset_code.clone(),
            counter_asset_issuer: row.counter_asset_issuer.clone(),
            counter_asset_type: row.counter_asset_type.clone(),
            base_volume: row.base_volume,
            counter_volume: row.counter_volume,
            trade_count: row.trade_count,
            open: row.open,
            low: row.low,
            high: row.high,
            change: row.change,
            close: row.close,
            num_bids: row.num_bids,
            bid_volume: row.bid_volume,
            highest_bid: row.highest_bid,
            num_asks: row.num_asks,
            ask_volume: row.ask_volume,
            lowest_ask: row.lowest_ask,
            spread,
            spread_mid_point,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct PartialMarketSummary {
    pub generated_at: i64,
    pub generated_at_rfc3339: String,
    pub pairs: Vec<PartialMarketStats>,
}

impl PartialMarketSummary {
    pub fn new(rows: &[PartialMarketRow], now: DateTime<Utc>) -> Self {
        Self {
            generated_at: now.timestamp_millis(),
            generated_at_rfc3339: rfc3339(now),
            pairs: rows.iter().map(PartialMarketStats::from).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct IssuerDetail {
    pub public_key: String,
    pub name: String,
    pub url: String,
    pub toml_url: String,
    pub federation_server: String,
    pub auth_server: String,
    pub transfer_server: String,
    pub web_auth_endpoint: String,
    pub deposit_server: String,
    pub org_twitter: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssetEntry {
    pub code: String,
    pub issuer: String,
    #[serde(rename = "type")]
    pub asset_type: String,
    pub num_accounts: i32,
    pub auth_required: bool,
    pub auth_revocable: bool,
    pub amount: f64,
    pub asset_controlled_by_domain: bool,
    pub anchor_asset: String,
    pub anchor_asset_type: String,
    pub display_decimals: i64,
    pub name: String,
    pub desc: String,
    pub conditions: String,
    pub is_asset_anchored: bool,
    pub fixed_number: i64,
    pub max_number: i64,
    pub is_unlimited: bool,
    pub redemption_instructions: String,
    pub status: String,
    pub issuer_detail: IssuerDetail,
    pub last_valid: String,
}

impl From<&AssetRecord> for AssetEntry {
    fn from(asset: &AssetRecord) -> Self {
        Self {
            code: asset.code.clone(),
            issuer: asset.issuer_account.clone(),
            asset_type: asset.asset_type.as_str().to_string(),
            num_accounts: asset.num_accounts,
            auth_required: asset.auth_required,
            auth_revocable: asset.auth_revocable,
            amount: asset.amount,
            asset_controlled_by_domain: asset.controlled_by_domain,
            anchor_asset: asset.anchor_asset_code.clone(),
            anchor_asset_type: asset.anchor_asset_type.clone(),
            display_decimals: asset.display_decimals,
            name: asset.name.clone(),
            desc: asset.desc.clone(),
            conditions: asset.conditions.clone(),
            is_asset_anchored: asset.is_asset_anchored,
            fixed_number: asset.fixed_number,
            max_number: asset.max_number,
            is_unlimited: asset.is_unlimited,
            redemption_instructions: asset.redemption_instructions.clone(),
            status: asset.status.clone(),
            issuer_detail: IssuerDetail {
                public_key: asset.issuer_account.clone(),
                name: asset.org_name.clone(),
                url: asset.org_url.clone(),
                toml_url: asset.toml_url.clone(),
                federation_server: asset.federation_server.clone(),
                auth_server: asset.auth_server.clone(),
                transfer_server: asset.transfer_server.clone(),
                web_auth_endpoint: asset.web_auth_endpoint.clone(),
                deposit_server: asset.deposit_server.clone(),
                org_twitter: asset.org_twitter.clone(),
            },
            last_valid: asset.last_valid.map(rfc3339).unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AssetSummary {
    pub generated_at: i64,
    pub generated_at_rfc3339: String,
    pub assets: Vec<AssetEntry>,
}

impl AssetSummary {
    /// Summary of the valid assets among `assets`.
    pub fn new(assets: &[AssetRecord], now: DateTime<Utc>) -> Self {
        Self {
            generated_at: now.timestamp_millis(),
            generated_at_rfc3339: rfc3339(now),
            assets: assets
                .iter()
                .filter(|asset| asset.is_valid)
                .map(AssetEntry::from)
                .collect(),
        }
    }
}

/// Serialize with four-space indentation.
pub fn to_indented_json<T: Serialize>(value: &T) -> AppResult<Vec<u8>> {
    let mut out = Vec::new();
    let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
    let mut serializer = serde_json::Serializer::with_formatter(&mut out, formatter);
    value.serialize(&mut serializer)?;
    Ok(out)
}

/// Write `value` as indented JSON to `path`, returning the byte count.
pub fn write_json_file<T: Serialize>(path: impl AsRef<Path>, value: &T) -> AppResult<usize> {
    let path = path.as_ref();
    let bytes = to_indented_json(value)?;
    std::fs::write(path, &bytes)?;
    info!(path = %path.display(), bytes = bytes.len(), "Wrote summary file");
    Ok(bytes.len())
}
