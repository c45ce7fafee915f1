//! Asset types for the trust pipeline.
//!
//! `AssetStat` is the upstream asset-listing record, `IssuerMetadata` the
//! parsed issuer-hosted metadata document, and `EnrichedAsset` the result of
//! running both through trust verification. `AssetRecord` is the storage row.

use crate::decimal::parse_amount;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code used for the ledger's native asset once normalized.
pub const NATIVE_ASSET_CODE: &str = "XLM";

/// Synthetic issuer marker for the native asset.
pub const NATIVE_ASSET_ISSUER: &str = "native";

/// Upstream asset type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    Native,
    #[default]
    CreditAlphanum4,
    CreditAlphanum12,
    LiquidityPoolShares,
}

impl AssetType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Native => "native",
            Self::CreditAlphanum4 => "credit_alphanum4",
            Self::CreditAlphanum12 => "credit_alphanum12",
            Self::LiquidityPoolShares => "liquidity_pool_shares",
        }
    }

    pub fn is_native(&self) -> bool {
        matches!(self, Self::Native)
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Hypermedia link.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Link {
    #[serde(default)]
    pub href: String,
}

/// Links attached to an asset record.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetLinks {
    #[serde(default)]
    pub toml: Link,
}

/// Issuer authorization flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetFlags {
    #[serde(default)]
    pub auth_required: bool,
    #[serde(default)]
    pub auth_revocable: bool,
    #[serde(default)]
    pub auth_immutable: bool,
}

/// Per-authorization-state account counts (newer upstream versions).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountCounts {
    #[serde(default)]
    pub authorized: i32,
}

/// Candidate asset from the upstream asset listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetStat {
    #[serde(rename = "_links", default)]
    pub links: AssetLinks,
    #[serde(default)]
    pub asset_type: AssetType,
    #[serde(default)]
    pub asset_code: String,
    #[serde(default)]
    pub asset_issuer: String,
    #[serde(default)]
    pub paging_token: String,
    /// Holder count. Older upstream versions only report this field.
    #[serde(default)]
    pub num_accounts: i32,
    #[serde(default)]
    pub accounts: Option<AccountCounts>,
    /// Circulating amount as a fixed-point decimal string.
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub flags: AssetFlags,
}

impl AssetStat {
    /// Holder count, preferring the legacy field when populated.
    pub fn holder_count(&self) -> i32 {
        if self.num_accounts > 0 {
            return self.num_accounts;
        }
        self.accounts.map(|a| a.authorized).unwrap_or(0)
    }

    /// Metadata document URL, empty when absent.
    pub fn toml_url(&self) -> &str {
        &self.links.toml.href
    }

    /// Stable identity: `type:code:issuer`.
    pub fn key(&self) -> String {
        format!(
            "{}:{}:{}",
            self.asset_type, self.asset_code, self.asset_issuer
        )
    }
}

/// Organization fields from the metadata document's `[DOCUMENTATION]` table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct OrgDocumentation {
    #[serde(rename = "ORG_NAME", default)]
    pub org_name: String,
    #[serde(rename = "ORG_URL", default)]
    pub org_url: String,
    #[serde(rename = "ORG_TWITTER", default)]
    pub org_twitter: String,
}

/// One `[[CURRENCIES]]` entry of the metadata document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct CurrencyEntry {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub issuer: String,
    #[serde(default)]
    pub display_decimals: Option<i64>,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub desc: String,
    #[serde(default)]
    pub conditions: String,
    #[serde(default)]
    pub image: String,
    #[serde(default)]
    pub status: String,
    #[serde(default)]
    pub is_asset_anchored: Option<bool>,
    #[serde(default)]
    pub anchor_asset: String,
    #[serde(default)]
    pub anchor_asset_type: String,
    #[serde(default)]
    pub fixed_number: Option<i64>,
    #[serde(default)]
    pub max_number: Option<i64>,
    #[serde(default)]
    pub is_unlimited: Option<bool>,
    #[serde(default)]
    pub redemption_instructions: String,
}

/// Parsed issuer metadata document.
///
/// Keyed by document URL in the metadata cache and never mutated once cached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IssuerMetadata {
    #[serde(rename = "SIGNING_KEY", default)]
    pub signing_key: String,
    #[serde(rename = "FEDERATION_SERVER", default)]
    pub federation_server: String,
    #[serde(rename = "AUTH_SERVER", default)]
    pub auth_server: String,
    #[serde(rename = "TRANSFER_SERVER", default)]
    pub transfer_server: String,
    #[serde(rename = "WEB_AUTH_ENDPOINT", default)]
    pub web_auth_endpoint: String,
    #[serde(rename = "DEPOSIT_SERVER", default)]
    pub deposit_server: String,
    #[serde(rename = "DOCUMENTATION", default)]
    pub documentation: OrgDocumentation,
    #[serde(rename = "CURRENCIES", default)]
    pub currencies: Vec<CurrencyEntry>,
}

impl IssuerMetadata {
    /// Find the currency entry listing `code` issued by `issuer`.
    pub fn currency(&self, code: &str, issuer: &str) -> Option<&CurrencyEntry> {
        self.currencies
            .iter()
            .find(|c| c.code == code && c.issuer == issuer)
    }
}

/// Candidate asset after trust verification.
#[derive(Debug, Clone)]
pub struct EnrichedAsset {
    pub asset: AssetStat,
    pub metadata: IssuerMetadata,
    /// Currency entry matching the asset's code and issuer, if listed.
    pub currency: Option<CurrencyEntry>,
    /// Whether the metadata document's domain verifies the asset.
    pub controlled_by_domain: bool,
    pub checked_at: DateTime<Utc>,
    /// Non-fatal problems met while enriching (e.g. metadata fetch failure).
    pub error: Option<String>,
}

/// Storage row for an asset, including issuer details.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AssetRecord {
    /// Storage-internal id. Zero until the store assigns one.
    #[serde(default)]
    pub id: i32,
    pub code: String,
    pub issuer_account: String,
    pub asset_type: AssetType,
    pub num_accounts: i32,
    pub auth_required: bool,
    pub auth_revocable: bool,
    pub amount: f64,
    pub controlled_by_domain: bool,
    pub anchor_asset_code: String,
    pub anchor_asset_type: String,
    pub is_valid: bool,
    pub validation_error: String,
    pub last_valid: Option<DateTime<Utc>>,
    pub last_checked: Option<DateTime<Utc>>,
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
    pub toml_url: String,
    pub signing_key: String,
    pub org_name: String,
    pub org_url: String,
    pub org_twitter: String,
    pub federation_server: String,
    pub auth_server: String,
    pub transfer_server: String,
    pub web_auth_endpoint: String,
    pub deposit_server: String,
}

impl AssetRecord {
    /// The ledger's native asset, normalized.
    pub fn native(now: DateTime<Utc>) -> Self {
        Self {
            code: NATIVE_ASSET_CODE.to_string(),
            issuer_account: NATIVE_ASSET_ISSUER.to_string(),
            asset_type: AssetType::Native,
            is_valid: true,
            controlled_by_domain: true,
            display_decimals: 7,
            name: "Lumens".to_string(),
            is_unlimited: true,
            last_valid: Some(now),
            last_checked: Some(now),
            ..Default::default()
        }
    }

    /// Identity used by storage lookups.
    pub fn matches(&self, code: &str, issuer: &str) -> bool {
        self.code == code && self.issuer_account == issuer
    }
}

impl From<&EnrichedAsset> for AssetRecord {
    fn from(enriched: &EnrichedAsset) -> Self {
        let asset = &enriched.asset;
        let meta = &enriched.metadata;
        let currency = enriched.currency.clone().unwrap_or_default();
        let is_valid = enriched.error.is_none();

        Self {
            id: 0,
            code: asset.asset_code.clone(),
            issuer_account: asset.asset_issuer.clone(),
            asset_type: asset.asset_type,
            num_accounts: asset.holder_count(),
            auth_required: asset.flags.auth_required,
            auth_revocable: asset.flags.auth_revocable,
            amount: parse_amount(&asset.amount).unwrap_or(0.0),
            controlled_by_domain: enriched.controlled_by_domain,
            anchor_asset_code: currency.anchor_asset,
            anchor_asset_type: currency.anchor_asset_type,
            is_valid,
            validation_error: enriched.error.clone().unwrap_or_default(),
            last_valid: is_valid.then_some(enriched.checked_at),
            last_checked: Some(enriched.checked_at),
            display_decimals: currency.display_decimals.unwrap_or(0),
            name: currency.name,
            desc: currency.desc,
            conditions: currency.conditions,
            is_asset_anchored: currency.is_asset_anchored.unwrap_or(false),
            fixed_number: currency.fixed_number.unwrap_or(0),
            max_number: currency.max_number.unwrap_or(0),
            is_unlimited: currency.is_unlimited.unwrap_or(false),
            redemption_instructions: currency.redemption_instructions,
            status: currency.status,
            toml_url: asset.toml_url().to_string(),
            signing_key: meta.signing_key.clone(),
            org_name: meta.documentation.org_name.clone(),
            org_url: meta.documentation.org_url.clone(),
            org_twitter: meta.documentation.org_twitter.clone(),
            federation_server: meta.federation_server.clone(),
            auth_server: meta.auth_server.clone(),
            transfer_server: meta.transfer_server.clone(),
            web_auth_endpoint: meta.web_auth_endpoint.clone(),
            deposit_server: meta.deposit_server.clone(),
        }
    }
}
