//! Asset discovery and trust verification.
//!
//! Pages the upstream asset listing, drops spam with a holder-count and
//! supply heuristic, and verifies issuer domain ownership against the
//! issuer-hosted metadata document. Metadata documents are cached per URL
//! for the life of the process.

pub mod asset_scraper;
pub mod error;
pub mod metadata_cache;
pub mod trust;

pub use asset_scraper::{AssetScrapeReport, AssetScraper, AssetScraperConfig, DiscardedAsset};
pub use error::{RegistryError, RegistryResult};
pub use metadata_cache::MetadataCache;
pub use trust::{
    discard_reason, domains_match, is_domain_verified, should_discard, DiscardReason,
    BLACKLISTED_CODES, HIGH_HOLDER_FLOOR, LOW_HOLDER_FLOOR,
};
