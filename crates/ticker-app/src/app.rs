//! Application wiring.

use crate::config::AppConfig;
use crate::error::AppResult;
use crate::summary::{AssetSummary, MarketSummary, PartialMarketSummary};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use ticker_core::AssetRecord;
use ticker_feed::{BackfillReport, StreamEvent, TradeScraper, TradeStreamer};
use ticker_horizon::{DynHorizonApi, DynMetadataSource, HorizonClient, HttpMetadataSource};
use ticker_persistence::{DynTickerStore, JsonLinesStore, Persister};
use ticker_registry::{AssetScraper, MetadataCache};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const OUTCOME_BUFFER: usize = 256;

/// Window covered by partial market summaries.
pub const PARTIAL_MARKET_HOURS: i64 = 24;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AssetRefreshReport {
    pub trusted: usize,
    pub discarded: usize,
    /// Rows written, including the native asset.
    pub upserted: usize,
}

pub struct Application {
    config: AppConfig,
    api: DynHorizonApi,
    metadata: DynMetadataSource,
    store: DynTickerStore,
    cache: Arc<MetadataCache>,
    cancel: CancellationToken,
}

impl Application {
    /// Build the application against the live upstream and the file store.
    pub fn new(config: AppConfig, testnet: bool) -> AppResult<Self> {
        let url = config.horizon_url(testnet).to_string();
        info!(horizon = %url, testnet, data_dir = %config.persistence.data_dir, "Initializing ticker");

        let api: DynHorizonApi = Arc::new(HorizonClient::with_timeout(url, config.request_timeout())?);
        let metadata: DynMetadataSource = Arc::new(HttpMetadataSource::new()?);
        let store: DynTickerStore = Arc::new(JsonLinesStore::open(&config.persistence.data_dir)?);

        Ok(Self::with_parts(config, api, metadata, store))
    }

    pub fn with_parts(
        config: AppConfig,
        api: DynHorizonApi,
        metadata: DynMetadataSource,
        store: DynTickerStore,
    ) -> Self {
        Self {
            config,
            api,
            metadata,
            store,
            cache: Arc::new(MetadataCache::new()),
            cancel: CancellationToken::new(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn store(&self) -> &DynTickerStore {
        &self.store
    }

    /// Token that stops in-flight ingestion when cancelled.
    pub fn cancel_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Scrape and verify assets, then upsert the trusted ones.
    ///
    /// With an empty `issuers` list the whole listing is scraped; otherwise
    /// each issuer is scraped in turn. The native asset is always upserted.
    pub async fn refresh_assets(&self, issuers: &[String]) -> AppResult<AssetRefreshReport> {
        let mut report = AssetRefreshReport::default();

        self.store.upsert_asset(AssetRecord::native(Utc::now())).await?;
        report.upserted += 1;

        let scraper = AssetScraper::new(
            self.api.clone(),
            self.metadata.clone(),
            self.cache.clone(),
            self.config.asset_scraper_config(),
        );

        let scopes: Vec<Option<&str>> = if issuers.is_empty() {
            vec![None]
        } else {
            issuers.iter().map(|issuer| Some(issuer.as_str())).collect()
        };

        for issuer in scopes {
            if let Some(issuer) = issuer {
                info!(issuer = %issuer, "Refreshing assets for issuer");
            }
            let scraped = scraper.scrape(issuer, 0, &self.cancel).await?;
            report.trusted += scraped.trusted.len();
            report.discarded += scraped.discarded.len();

            for enriched in &scraped.trusted {
                let record = AssetRecord::from(enriched);
                let id = self.store.upsert_asset(record).await?;
                debug!(asset = %enriched.asset.key(), id, "Upserted asset");
                report.upserted += 1;
            }
        }

        info!(
            trusted = report.trusted,
            discarded = report.discarded,
            upserted = report.upserted,
            "Asset refresh complete"
        );
        Ok(report)
    }

    /// Backfill trades from the last `hours` hours.
    pub async fn backfill_trades(
        &self,
        issuers: &[String],
        hours: i64,
        limit: Option<usize>,
    ) -> AppResult<BackfillReport> {
        let since = Utc::now() - Duration::hours(hours);
        info!(
            hours,
            days = hours as f64 / 24.0,
            since = %since,
            "Backfilling trade data"
        );

        let sink = Arc::new(Persister::new(self.store.clone(), "backfill"));
        let scraper = TradeScraper::new(self.api.clone(), sink, self.config.backfill_config(limit));

        let report = if issuers.is_empty() {
            scraper.backfill(None, since, &self.cancel).await?
        } else {
            scraper.backfill_issuers(issuers, since, &self.cancel).await?
        };
        Ok(report)
    }

    /// Stream live trades until cancelled or the transport fails.
    pub async fn stream_trades(&self) -> AppResult<()> {
        info!("Streaming new trades (continuous)");
        let streamer = TradeStreamer::new(self.api.clone(), self.store.clone());
        let (tx, mut rx) = mpsc::channel::<StreamEvent>(OUTCOME_BUFFER);

        let reporter = tokio::spawn(async move {
            let mut persisted = 0u64;
            let mut skipped = 0u64;
            while let Some(event) = rx.recv().await {
                match event {
                    StreamEvent::Persisted { .. } => persisted += 1,
                    StreamEvent::Skipped { trade_id, reason } => {
                        skipped += 1;
                        warn!(trade_id = %trade_id, reason = %reason, "Streamed trade skipped");
                    }
                }
            }
            info!(persisted, skipped, "Trade stream outcomes");
        });

        let result = streamer.run(self.cancel.clone(), tx).await;
        let _ = reporter.await;
        Ok(result?)
    }

    pub async fn market_summary(&self, now: DateTime<Utc>) -> AppResult<MarketSummary> {
        let rows = self.store.market_rows(now).await?;
        info!(pairs = rows.len(), "Generated market data");
        Ok(MarketSummary::new(&rows, now))
    }

    /// Markets of the given issuers over the last 24 hours.
    pub async fn partial_market_summary(
        &self,
        issuers: &[String],
        now: DateTime<Utc>,
    ) -> AppResult<PartialMarketSummary> {
        let mut rows = Vec::new();
        for issuer in issuers {
            rows.extend(self.store.partial_markets_by_issuer(issuer, PARTIAL_MARKET_HOURS, now).await?);
        }
        info!(issuers = issuers.len(), pairs = rows.len(), "Generated partial market data");
        Ok(PartialMarketSummary::new(&rows, now))
    }

    pub async fn asset_summary(&self, now: DateTime<Utc>) -> AppResult<AssetSummary> {
        let assets = self.store.list_assets().await?;
        let summary = AssetSummary::new(&assets, now);
        info!(stored = assets.len(), valid = summary.assets.len(), "Generated asset data");
        Ok(summary)
    }
}
