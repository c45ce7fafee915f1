//! Paginated trade backfill.
//!
//! Trades are listed newest first. Each page is scanned until the first
//! trade closed at or before the lower bound, which ends the run. Kept trades
//! are normalized and accumulated; the accumulator is handed to the sink
//! whenever it reaches the batch ceiling, and once more at the end.

use crate::error::{FeedError, FeedResult};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::{Duration, Instant};
use ticker_core::{normalize_trade_assets, RawTrade, RetryPolicy};
use ticker_horizon::{
    next_cursor, DynHorizonApi, HorizonError, HorizonResult, Page, TradeRequest, DEFAULT_PAGE_LIMIT,
};
use ticker_persistence::{PersistReport, TradeSink};
use ticker_telemetry::Metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Trades held in memory before a flush.
pub const DEFAULT_BATCH_CEILING: usize = 100_000;

const PROGRESS_INTERVAL: Duration = Duration::from_secs(60);

#[derive(Debug, Clone)]
pub struct BackfillConfig {
    pub batch_ceiling: usize,
    /// Maximum trades kept per run (0 = unbounded).
    pub limit: usize,
    /// Records requested per listing page.
    pub page_limit: u32,
    pub page_retry: RetryPolicy,
}

impl Default for BackfillConfig {
    fn default() -> Self {
        Self {
            batch_ceiling: DEFAULT_BATCH_CEILING,
            limit: 0,
            page_limit: DEFAULT_PAGE_LIMIT,
            page_retry: RetryPolicy::pages(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BackfillReport {
    pub pages: usize,
    /// Trades inside the window handed to the sink.
    pub kept: usize,
    pub flushes: usize,
    pub inserted: usize,
    pub unresolved: usize,
    pub malformed: usize,
}

impl BackfillReport {
    fn absorb(&mut self, persisted: PersistReport) {
        self.flushes += 1;
        self.inserted += persisted.inserted;
        self.unresolved += persisted.unresolved;
        self.malformed += persisted.malformed;
    }

    fn merge(&mut self, other: BackfillReport) {
        self.pages += other.pages;
        self.kept += other.kept;
        self.flushes += other.flushes;
        self.inserted += other.inserted;
        self.unresolved += other.unresolved;
        self.malformed += other.malformed;
    }
}

/// Keep trades closed strictly after `since`, normalized.
///
/// Returns the kept trades and whether a trade at or before `since` was
/// reached; records after that one are dropped.
pub fn check_records(records: Vec<RawTrade>, since: DateTime<Utc>) -> (Vec<RawTrade>, bool) {
    let mut kept = Vec::with_capacity(records.len());
    for mut trade in records {
        if trade.ledger_close_time <= since {
            return (kept, true);
        }
        normalize_trade_assets(&mut trade);
        kept.push(trade);
    }
    (kept, false)
}

pub struct TradeScraper {
    api: DynHorizonApi,
    sink: Arc<dyn TradeSink>,
    config: BackfillConfig,
}

impl TradeScraper {
    pub fn new(api: DynHorizonApi, sink: Arc<dyn TradeSink>, config: BackfillConfig) -> Self {
        Self { api, sink, config }
    }

    /// Backfill each issuer in turn. One issuer's run completes before the
    /// next starts; the first failure ends the whole call.
    pub async fn backfill_issuers(
        &self,
        issuers: &[String],
        since: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> FeedResult<BackfillReport> {
        let mut total = BackfillReport::default();
        for issuer in issuers {
            let report = self.backfill(Some(issuer), since, cancel).await?;
            total.merge(report);
        }
        Ok(total)
    }

    /// Backfill trades closed after `since`, optionally only those whose
    /// base asset is issued by `issuer`.
    pub async fn backfill(
        &self,
        issuer: Option<&str>,
        since: DateTime<Utc>,
        cancel: &CancellationToken,
    ) -> FeedResult<BackfillReport> {
        let mut report = BackfillReport::default();
        let mut batch: Vec<RawTrade> = Vec::new();
        let mut request = TradeRequest {
            base_asset_issuer: issuer.map(str::to_string),
            limit: self.config.page_limit,
            ..Default::default()
        };
        let limit = self.config.limit;
        let ceiling = self.config.batch_ceiling.max(1);
        let mut last_progress = Instant::now();

        info!(issuer = ?issuer, since = %since, limit, "Backfilling trades");

        loop {
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(FeedError::Cancelled),
                page = self.fetch_page(request.clone()) => page?,
            };
            report.pages += 1;

            let is_last = page.is_last() || page.records().is_empty();
            let next_href = page.links.next.href.clone();

            let (mut kept, reached_bound) = check_records(page.into_records(), since);
            let mut limit_reached = false;
            if limit != 0 {
                let remaining = limit - report.kept;
                if kept.len() >= remaining {
                    kept.truncate(remaining);
                    limit_reached = true;
                }
            }
            report.kept += kept.len();
            batch.extend(kept);

            while batch.len() >= ceiling {
                let rest = batch.split_off(ceiling);
                let full = std::mem::replace(&mut batch, rest);
                self.flush(full, &mut report).await?;
            }

            if last_progress.elapsed() >= PROGRESS_INTERVAL {
                info!(
                    issuer = ?issuer,
                    pages = report.pages,
                    kept = report.kept,
                    inserted = report.inserted,
                    "Backfill progress"
                );
                last_progress = Instant::now();
            }

            if reached_bound || limit_reached || is_last {
                debug!(reached_bound, limit_reached, is_last, "Backfill pagination finished");
                break;
            }
            request.cursor = Some(next_cursor(&next_href)?);
        }

        if !batch.is_empty() {
            self.flush(batch, &mut report).await?;
        }

        info!(
            issuer = ?issuer,
            pages = report.pages,
            kept = report.kept,
            inserted = report.inserted,
            unresolved = report.unresolved,
            malformed = report.malformed,
            "Backfill complete"
        );
        Ok(report)
    }

    async fn flush(&self, batch: Vec<RawTrade>, report: &mut BackfillReport) -> FeedResult<()> {
        debug!(count = batch.len(), "Flushing trade batch");
        let persisted = self.sink.persist(batch).await?;
        report.absorb(persisted);
        Ok(())
    }

    async fn fetch_page(&self, request: TradeRequest) -> HorizonResult<Page<RawTrade>> {
        self.config
            .page_retry
            .retry_async(HorizonError::is_retryable, |attempt| {
                if attempt > 0 {
                    Metrics::upstream_retry("trades");
                }
                self.api.trades(request.clone())
            })
            .await
    }
}
