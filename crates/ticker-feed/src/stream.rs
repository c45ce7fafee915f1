//! Live trade streaming.
//!
//! A producer task reads the upstream event stream into a bounded channel;
//! the consumer normalizes and persists each trade on its own. Per-trade
//! outcomes go to the caller's outcome channel and never stop the stream;
//! once the caller drops its receiver, trades are still persisted.

use crate::error::{FeedError, FeedResult};
use ticker_core::{normalize_trade_assets, RawTrade};
use ticker_horizon::{DynHorizonApi, STREAM_FROM_NOW};
use ticker_persistence::{DynTickerStore, Persister, TradeSink};
use ticker_telemetry::Metrics;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const STREAM_BUFFER: usize = 1024;

/// Outcome for one streamed trade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    Persisted { trade_id: String },
    Skipped { trade_id: String, reason: String },
}

impl StreamEvent {
    pub fn trade_id(&self) -> &str {
        match self {
            StreamEvent::Persisted { trade_id } | StreamEvent::Skipped { trade_id, .. } => trade_id,
        }
    }

    pub fn is_persisted(&self) -> bool {
        matches!(self, StreamEvent::Persisted { .. })
    }
}

pub struct TradeStreamer {
    api: DynHorizonApi,
    store: DynTickerStore,
    persister: Persister,
}

impl TradeStreamer {
    pub fn new(api: DynHorizonApi, store: DynTickerStore) -> Self {
        let persister = Persister::new(store.clone(), "stream");
        Self { api, store, persister }
    }

    /// Cursor to resume from: the newest stored trade, or the ledger head.
    pub async fn resume_cursor(&self) -> FeedResult<String> {
        Ok(self
            .store
            .last_trade()
            .await?
            .map(|trade| trade.horizon_id)
            .unwrap_or_else(|| STREAM_FROM_NOW.to_string()))
    }

    /// Stream trades until `cancel` fires (`Ok`) or the transport fails.
    pub async fn run(&self, cancel: CancellationToken, outcomes: mpsc::Sender<StreamEvent>) -> FeedResult<()> {
        let cursor = self.resume_cursor().await?;
        info!(cursor = %cursor, "Starting trade stream");

        let (tx, mut rx) = mpsc::channel::<RawTrade>(STREAM_BUFFER);
        let api = self.api.clone();
        let producer_cancel = cancel.clone();
        let producer = tokio::spawn(async move { api.stream_trades(cursor, tx, producer_cancel).await });

        let mut reporting = true;
        loop {
            let trade = tokio::select! {
                biased;
                _ = cancel.cancelled() => break,
                trade = rx.recv() => trade,
            };
            let Some(trade) = trade else {
                break;
            };

            let event = self.handle(trade).await;
            if reporting && outcomes.send(event).await.is_err() {
                debug!("Outcome receiver dropped, no longer reporting outcomes");
                reporting = false;
            }
        }
        drop(rx);

        match producer.await {
            Ok(Ok(())) => {
                info!("Trade stream stopped");
                Ok(())
            }
            Ok(Err(e)) => {
                warn!(error = %e, "Trade stream failed");
                Err(e.into())
            }
            Err(e) => Err(FeedError::Task(e.to_string())),
        }
    }

    async fn handle(&self, mut trade: RawTrade) -> StreamEvent {
        normalize_trade_assets(&mut trade);
        let trade_id = trade.id.clone();

        let event = match self.persister.persist(vec![trade]).await {
            Ok(report) if report.inserted > 0 => StreamEvent::Persisted { trade_id },
            Ok(report) if report.unresolved > 0 => StreamEvent::Skipped {
                trade_id,
                reason: "unknown asset".to_string(),
            },
            Ok(report) if report.malformed > 0 => StreamEvent::Skipped {
                trade_id,
                reason: "malformed trade".to_string(),
            },
            Ok(_) => StreamEvent::Skipped {
                trade_id,
                reason: "already stored".to_string(),
            },
            Err(e) => {
                warn!(trade_id = %trade_id, error = %e, "Failed to persist streamed trade");
                StreamEvent::Skipped {
                    trade_id,
                    reason: e.to_string(),
                }
            }
        };

        match &event {
            StreamEvent::Persisted { trade_id } => {
                Metrics::stream_event("persisted");
                debug!(trade_id = %trade_id, "Persisted streamed trade");
            }
            StreamEvent::Skipped { .. } => Metrics::stream_event("skipped"),
        }
        event
    }
}
