//! Application configuration.

use crate::error::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use ticker_core::{Backoff, RetryPolicy};
use ticker_feed::{BackfillConfig, DEFAULT_BATCH_CEILING};
use ticker_horizon::DEFAULT_PAGE_LIMIT;
use ticker_registry::AssetScraperConfig;

/// Environment variable naming the config file.
pub const CONFIG_ENV: &str = "TICKER_CONFIG";

pub const DEFAULT_CONFIG_PATH: &str = "config/default.toml";

/// Upstream API endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HorizonConfig {
    #[serde(default = "default_public_url")]
    pub url: String,
    #[serde(default = "default_testnet_url")]
    pub testnet_url: String,
    /// Records per listing page (upstream maximum is 200).
    #[serde(default = "default_page_limit")]
    pub page_limit: u32,
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_public_url() -> String {
    "https://horizon.stellar.org".to_string()
}

fn default_testnet_url() -> String {
    "https://horizon-testnet.stellar.org".to_string()
}

fn default_page_limit() -> u32 {
    DEFAULT_PAGE_LIMIT
}

fn default_request_timeout_secs() -> u64 {
    30
}

impl Default for HorizonConfig {
    fn default() -> Self {
        Self {
            url: default_public_url(),
            testnet_url: default_testnet_url(),
            page_limit: default_page_limit(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

/// Retry budgets for upstream calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per listing page. Default: 5.
    #[serde(default = "default_page_attempts")]
    pub page_attempts: usize,
    /// Fixed delay between page attempts (ms). Default: 5000.
    #[serde(default = "default_page_delay_ms")]
    pub page_delay_ms: u64,
    /// Attempts per metadata document. Default: 3.
    #[serde(default = "default_metadata_attempts")]
    pub metadata_attempts: usize,
    /// Initial metadata retry delay (ms), doubled per retry. Default: 1000.
    #[serde(default = "default_metadata_delay_ms")]
    pub metadata_delay_ms: u64,
    /// Cap on the metadata retry delay (ms). Default: 4000.
    #[serde(default = "default_metadata_max_delay_ms")]
    pub metadata_max_delay_ms: u64,
}

fn default_page_attempts() -> usize {
    5
}

fn default_page_delay_ms() -> u64 {
    5_000
}

fn default_metadata_attempts() -> usize {
    3
}

fn default_metadata_delay_ms() -> u64 {
    1_000
}

fn default_metadata_max_delay_ms() -> u64 {
    4_000
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            page_attempts: default_page_attempts(),
            page_delay_ms: default_page_delay_ms(),
            metadata_attempts: default_metadata_attempts(),
            metadata_delay_ms: default_metadata_delay_ms(),
            metadata_max_delay_ms: default_metadata_max_delay_ms(),
        }
    }
}

impl RetryConfig {
    pub fn page_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.page_attempts,
            Duration::from_millis(self.page_delay_ms),
            Backoff::Fixed,
        )
    }

    pub fn metadata_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.metadata_attempts,
            Duration::from_millis(self.metadata_delay_ms),
            Backoff::Exponential {
                max_delay: Duration::from_millis(self.metadata_max_delay_ms),
            },
        )
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AssetsConfig {
    /// Concurrent metadata verifications. Default: 20.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Require an `https` metadata link for mid-range holder counts.
    #[serde(default = "default_check_trust")]
    pub check_trust: bool,
}

fn default_concurrency() -> usize {
    20
}

fn default_check_trust() -> bool {
    true
}

impl Default for AssetsConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            check_trust: default_check_trust(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TradesConfig {
    /// Backfill window (hours). Default: 24.
    #[serde(default = "default_backfill_hours")]
    pub backfill_hours: i64,
    /// Trades held in memory before a flush. Default: 100,000.
    #[serde(default = "default_batch_ceiling")]
    pub batch_ceiling: usize,
    /// Maximum trades per backfill run (0 = unbounded).
    #[serde(default)]
    pub limit: usize,
}

fn default_backfill_hours() -> i64 {
    24
}

fn default_batch_ceiling() -> usize {
    DEFAULT_BATCH_CEILING
}

impl Default for TradesConfig {
    fn default() -> Self {
        Self {
            backfill_hours: default_backfill_hours(),
            batch_ceiling: default_batch_ceiling(),
            limit: 0,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PersistenceConfig {
    /// Directory holding `assets.json` and `trades.jsonl`.
    #[serde(default = "default_data_dir")]
    pub data_dir: String,
}

fn default_data_dir() -> String {
    "./data/ticker".to_string()
}

impl Default for PersistenceConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub horizon: HorizonConfig,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub trades: TradesConfig,
    #[serde(default)]
    pub persistence: PersistenceConfig,
}

impl AppConfig {
    /// Load configuration.
    ///
    /// Path order: `cli_path`, then `TICKER_CONFIG`, then
    /// `config/default.toml`. An explicitly named file must exist; a missing
    /// default file falls back to built-in defaults.
    pub fn load(cli_path: Option<&str>) -> AppResult<Self> {
        let explicit = cli_path
            .map(str::to_string)
            .or_else(|| std::env::var(CONFIG_ENV).ok());

        match explicit {
            Some(path) => Self::from_file(&path),
            None if Path::new(DEFAULT_CONFIG_PATH).exists() => Self::from_file(DEFAULT_CONFIG_PATH),
            None => {
                tracing::warn!(path = DEFAULT_CONFIG_PATH, "Config file not found, using defaults");
                Ok(Self::default())
            }
        }
    }

    /// Load from a specific file.
    pub fn from_file(path: &str) -> AppResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("Failed to read config {path}: {e}")))?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> AppResult<Self> {
        toml::from_str(content).map_err(|e| AppError::Config(format!("Failed to parse config: {e}")))
    }

    pub fn horizon_url(&self, testnet: bool) -> &str {
        if testnet {
            &self.horizon.testnet_url
        } else {
            &self.horizon.url
        }
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.horizon.request_timeout_secs)
    }

    pub fn asset_scraper_config(&self) -> AssetScraperConfig {
        AssetScraperConfig {
            concurrency: self.assets.concurrency,
            check_trust: self.assets.check_trust,
            page_limit: self.horizon.page_limit,
            page_retry: self.retry.page_policy(),
            metadata_retry: self.retry.metadata_policy(),
        }
    }

    /// Backfill settings; `limit` overrides the configured limit when set.
    pub fn backfill_config(&self, limit: Option<usize>) -> BackfillConfig {
        BackfillConfig {
            batch_ceiling: self.trades.batch_ceiling,
            limit: limit.unwrap_or(self.trades.limit),
            page_limit: self.horizon.page_limit,
            page_retry: self.retry.page_policy(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.horizon.page_limit, 200);
        assert_eq!(config.assets.concurrency, 20);
        assert!(config.assets.check_trust);
        assert_eq!(config.trades.backfill_hours, 24);
        assert_eq!(config.trades.batch_ceiling, 100_000);
        assert_eq!(config.trades.limit, 0);

        let page = config.retry.page_policy();
        assert_eq!(page.max_attempts, 5);
        assert_eq!(page.delay, Duration::from_secs(5));
        assert_eq!(page.backoff, Backoff::Fixed);
    }

    #[test]
    fn test_partial_toml_keeps_defaults() {
        let config = AppConfig::from_toml(
            r#"
            [assets]
            concurrency = 4

            [persistence]
            data_dir = "/var/lib/ticker"
            "#,
        )
        .unwrap();

        assert_eq!(config.assets.concurrency, 4);
        assert!(config.assets.check_trust);
        assert_eq!(config.persistence.data_dir, "/var/lib/ticker");
        assert_eq!(config.horizon.url, "https://horizon.stellar.org");
    }

    #[test]
    fn test_shipped_config_matches_defaults() {
        let config = AppConfig::from_toml(include_str!("../../../config/default.toml")).unwrap();
        let defaults = AppConfig::default();

        assert_eq!(config.horizon.url, defaults.horizon.url);
        assert_eq!(config.horizon.page_limit, defaults.horizon.page_limit);
        assert_eq!(config.retry.page_delay_ms, defaults.retry.page_delay_ms);
        assert_eq!(config.assets.concurrency, defaults.assets.concurrency);
        assert_eq!(config.trades.batch_ceiling, defaults.trades.batch_ceiling);
        assert_eq!(config.persistence.data_dir, defaults.persistence.data_dir);
    }

    #[test]
    fn test_horizon_url_selection() {
        let config = AppConfig::default();
        assert_eq!(config.horizon_url(false), "https://horizon.stellar.org");
        assert_eq!(config.horizon_url(true), "https://horizon-testnet.stellar.org");
    }

    #[test]
    fn test_backfill_limit_override() {
        let config = AppConfig::default();
        assert_eq!(config.backfill_config(None).limit, 0);
        assert_eq!(config.backfill_config(Some(500)).limit, 500);
    }

    #[test]
    fn test_invalid_toml_is_config_error() {
        let err = AppConfig::from_toml("[assets\nconcurrency = 1").unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }

    #[test]
    fn test_missing_explicit_file_fails() {
        let err = AppConfig::load(Some("/nonexistent/ticker.toml")).unwrap_err();
        assert!(matches!(err, AppError::Config(_)));
    }
}
