//! Trade types and trade-pair normalization.

use crate::asset::{AssetType, NATIVE_ASSET_CODE, NATIVE_ASSET_ISSUER};
use crate::decimal::{parse_amount, rational_to_f64};
use crate::error::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

/// Exact rational price as published upstream.
///
/// Upstream serializes `n`/`d` either as JSON numbers or as strings
/// depending on the server version; both are accepted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradePrice {
    #[serde(deserialize_with = "int_or_string")]
    pub n: i64,
    #[serde(deserialize_with = "int_or_string")]
    pub d: i64,
}

fn int_or_string<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum IntOrString {
        Int(i64),
        Str(String),
    }

    match IntOrString::deserialize(deserializer)? {
        IntOrString::Int(v) => Ok(v),
        IntOrString::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

/// Upstream trade record.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawTrade {
    /// Ledger-ordered identifier, e.g. `"107449584845914113-0"`.
    pub id: String,
    #[serde(default)]
    pub paging_token: String,
    pub ledger_close_time: DateTime<Utc>,
    #[serde(default)]
    pub offer_id: String,
    #[serde(default)]
    pub base_offer_id: String,
    #[serde(default)]
    pub base_account: String,
    #[serde(default)]
    pub base_amount: String,
    #[serde(default)]
    pub base_asset_type: AssetType,
    #[serde(default)]
    pub base_asset_code: String,
    #[serde(default)]
    pub base_asset_issuer: String,
    #[serde(default)]
    pub counter_offer_id: String,
    #[serde(default)]
    pub counter_account: String,
    #[serde(default)]
    pub counter_amount: String,
    #[serde(default)]
    pub counter_asset_type: AssetType,
    #[serde(default)]
    pub counter_asset_code: String,
    #[serde(default)]
    pub counter_asset_issuer: String,
    #[serde(default)]
    pub base_is_seller: bool,
    #[serde(default)]
    pub price: TradePrice,
}

impl RawTrade {
    /// Cursor that resumes a trade listing right after this record.
    pub fn cursor(&self) -> &str {
        if self.paging_token.is_empty() {
            &self.id
        } else {
            &self.paging_token
        }
    }

    fn base_asset_string(&self) -> String {
        format!(
            "{}:{}:{}",
            self.base_asset_type, self.base_asset_code, self.base_asset_issuer
        )
    }

    fn counter_asset_string(&self) -> String {
        format!(
            "{}:{}:{}",
            self.counter_asset_type, self.counter_asset_code, self.counter_asset_issuer
        )
    }

    /// Fill in code and issuer for native legs.
    fn add_native_data(&mut self) {
        if self.base_asset_type.is_native() {
            self.base_asset_code = NATIVE_ASSET_CODE.to_string();
            self.base_asset_issuer = NATIVE_ASSET_ISSUER.to_string();
        }
        if self.counter_asset_type.is_native() {
            self.counter_asset_code = NATIVE_ASSET_CODE.to_string();
            self.counter_asset_issuer = NATIVE_ASSET_ISSUER.to_string();
        }
    }

    /// Swap the base and counter legs.
    ///
    /// Offer ids are left in place; the price rational is inverted.
    fn reverse_assets(&mut self) {
        std::mem::swap(&mut self.base_amount, &mut self.counter_amount);
        std::mem::swap(&mut self.base_account, &mut self.counter_account);
        std::mem::swap(&mut self.base_asset_code, &mut self.counter_asset_code);
        std::mem::swap(&mut self.base_asset_type, &mut self.counter_asset_type);
        std::mem::swap(&mut self.base_asset_issuer, &mut self.counter_asset_issuer);
        self.base_is_seller = !self.base_is_seller;
        std::mem::swap(&mut self.price.n, &mut self.price.d);
    }
}

/// Normalize the trade pair in place.
///
/// 1. Native legs use the `XLM` code and the `native` issuer marker.
/// 2. A native leg is always the base.
/// 3. Between two credit assets, the base is the one whose
///    `type:code:issuer` string sorts first.
pub fn normalize_trade_assets(trade: &mut RawTrade) {
    trade.add_native_data();

    if trade.base_asset_type.is_native() {
        return;
    }

    if trade.counter_asset_type.is_native() {
        trade.reverse_assets();
        return;
    }

    if trade.base_asset_string() > trade.counter_asset_string() {
        trade.reverse_assets();
    }
}

/// Numeric ordering key for an upstream trade id `<operation>-<index>`.
///
/// Ids that do not have that shape sort before every well-formed id, by text.
pub fn trade_id_key(id: &str) -> (u64, u32, &str) {
    let parsed = id
        .split_once('-')
        .and_then(|(op, index)| Some((op.parse().ok()?, index.parse().ok()?)));
    match parsed {
        Some((op, index)) => (op, index, ""),
        None => (0, 0, id),
    }
}

/// Storage row for a trade with resolved asset ids.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredTrade {
    pub horizon_id: String,
    pub ledger_close_time: DateTime<Utc>,
    pub offer_id: String,
    pub base_offer_id: String,
    pub base_account: String,
    pub base_amount: f64,
    pub base_asset_id: i32,
    pub counter_offer_id: String,
    pub counter_account: String,
    pub counter_amount: f64,
    pub counter_asset_id: i32,
    pub base_is_seller: bool,
    pub price: f64,
}

impl StoredTrade {
    /// Ledger order: close time, then the numeric trade id.
    pub fn ledger_order(&self) -> (DateTime<Utc>, (u64, u32, &str)) {
        (self.ledger_close_time, trade_id_key(&self.horizon_id))
    }

    /// Convert an upstream trade once both asset ids are known.
    ///
    /// The stored price is `d / n` of the upstream rational.
    pub fn from_raw(raw: &RawTrade, base_asset_id: i32, counter_asset_id: i32) -> Result<Self> {
        let base_amount = parse_amount(&raw.base_amount)?;
        let counter_amount = parse_amount(&raw.counter_amount)?;
        let price = rational_to_f64(raw.price.d, raw.price.n)?;

        Ok(Self {
            horizon_id: raw.id.clone(),
            ledger_close_time: raw.ledger_close_time,
            offer_id: raw.offer_id.clone(),
            base_offer_id: raw.base_offer_id.clone(),
            base_account: raw.base_account.clone(),
            base_amount,
            base_asset_id,
            counter_offer_id: raw.counter_offer_id.clone(),
            counter_account: raw.counter_account.clone(),
            counter_amount,
            counter_asset_id,
            base_is_seller: raw.base_is_seller,
            price,
        })
    }
}
