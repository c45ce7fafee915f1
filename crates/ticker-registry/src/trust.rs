//! Spam heuristics and issuer domain verification.

use reqwest::Url;
use std::fmt;
use ticker_core::{is_zero_amount, AssetStat};

/// Assets with fewer holders are discarded.
pub const LOW_HOLDER_FLOOR: i32 = 10;

/// Assets with at least this many holders need no metadata link.
pub const HIGH_HOLDER_FLOOR: i32 = 100;

/// Codes that are always discarded.
pub const BLACKLISTED_CODES: &[&str] = &["REMOVE"];

/// Why an asset was dropped before or during verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiscardReason {
    /// Circulating amount empty, unparseable or zero.
    ZeroSupply,
    TooFewHolders(i32),
    Blacklisted,
    /// Mid-range holder count without an `https` metadata link.
    InsecureMetadataLink,
    /// Metadata document could not be fetched or decoded.
    MetadataUnavailable(String),
}

impl fmt::Display for DiscardReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiscardReason::ZeroSupply => write!(f, "zero supply"),
            DiscardReason::TooFewHolders(n) => write!(f, "too few holders ({n})"),
            DiscardReason::Blacklisted => write!(f, "blacklisted code"),
            DiscardReason::InsecureMetadataLink => write!(f, "missing or insecure metadata link"),
            DiscardReason::MetadataUnavailable(e) => write!(f, "metadata unavailable: {e}"),
        }
    }
}

/// Apply the discard heuristic, returning the first rule that rejects the
/// asset.
///
/// With `check_trust == false` the metadata link rule is skipped.
pub fn discard_reason(asset: &AssetStat, check_trust: bool) -> Option<DiscardReason> {
    if is_zero_amount(&asset.amount) {
        return Some(DiscardReason::ZeroSupply);
    }

    let holders = asset.holder_count();
    if holders < LOW_HOLDER_FLOOR {
        return Some(DiscardReason::TooFewHolders(holders));
    }

    if BLACKLISTED_CODES.contains(&asset.asset_code.as_str()) {
        return Some(DiscardReason::Blacklisted);
    }

    if holders >= HIGH_HOLDER_FLOOR {
        return None;
    }

    if check_trust && !asset.toml_url().starts_with("https://") {
        return Some(DiscardReason::InsecureMetadataLink);
    }

    None
}

pub fn should_discard(asset: &AssetStat, check_trust: bool) -> bool {
    discard_reason(asset, check_trust).is_some()
}

/// True when `org_host` equals `toml_host` or is a subdomain of it.
///
/// The metadata document's host is the anchor: a metadata document hosted
/// on a subdomain never vouches for its parent domain.
pub fn domains_match(toml_host: &str, org_host: &str) -> bool {
    if toml_host == org_host {
        return true;
    }
    org_host
        .strip_suffix(toml_host)
        .map(|prefix| prefix.ends_with('.') && prefix.len() > 1)
        .unwrap_or(false)
}

/// Decide whether the metadata document at `toml_url` may vouch for an
/// asset whose organization claims `org_url`.
pub fn is_domain_verified(org_url: &str, toml_url: &str, has_currency: bool) -> bool {
    if toml_url.is_empty() || !has_currency {
        return false;
    }

    let Ok(toml) = Url::parse(toml_url) else {
        return false;
    };
    if toml.scheme() != "https" {
        return false;
    }

    if org_url.is_empty() {
        return true;
    }

    let Ok(org) = Url::parse(org_url) else {
        return false;
    };
    if org.scheme() != "https" {
        return false;
    }

    match (toml.host_str(), org.host_str()) {
        (Some(toml_host), Some(org_host)) => domains_match(toml_host, org_host),
        _ => false,
    }
}
