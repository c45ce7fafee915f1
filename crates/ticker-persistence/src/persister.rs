//! Converts upstream trades into storage rows.
//!
//! Asset references are resolved against the store by code and issuer.
//! A trade referencing an unknown asset, or one whose lookup fails, is
//! dropped; the rest of its batch is still written in a single bulk insert.
//! Only a failed bulk insert fails the batch.

use crate::error::PersistenceResult;
use crate::store::DynTickerStore;
use std::collections::HashMap;
use ticker_core::{BoxFuture, RawTrade, StoredTrade};
use ticker_telemetry::Metrics;
use tracing::{debug, warn};

/// Outcome of persisting one batch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PersistReport {
    pub received: usize,
    /// Rows written; ids already stored are not counted.
    pub inserted: usize,
    /// Dropped because an asset was not in storage or its lookup failed.
    pub unresolved: usize,
    /// Dropped because amounts or price could not be converted.
    pub malformed: usize,
}

impl PersistReport {
    pub fn dropped(&self) -> usize {
        self.unresolved + self.malformed
    }
}

/// Destination for normalized trades.
pub trait TradeSink: Send + Sync {
    fn persist(&self, trades: Vec<RawTrade>) -> BoxFuture<'_, PersistenceResult<PersistReport>>;
}

pub struct Persister {
    store: DynTickerStore,
    /// Metrics label, e.g. "backfill" or "stream".
    source: &'static str,
}

impl Persister {
    pub fn new(store: DynTickerStore, source: &'static str) -> Self {
        Self { store, source }
    }

    pub fn store(&self) -> &DynTickerStore {
        &self.store
    }

    /// Asset id for `code`/`issuer`, memoized per batch. A failed lookup is
    /// logged, not memoized, and resolves to `None`.
    async fn resolve(
        &self,
        ids: &mut HashMap<(String, String), Option<i32>>,
        code: &str,
        issuer: &str,
    ) -> Option<i32> {
        let key = (code.to_string(), issuer.to_string());
        if let Some(id) = ids.get(&key) {
            return *id;
        }
        match self.store.asset_id(code, issuer).await {
            Ok(id) => {
                ids.insert(key, id);
                id
            }
            Err(e) => {
                warn!(code, issuer, error = %e, "Asset lookup failed");
                None
            }
        }
    }

    async fn persist_batch(&self, trades: Vec<RawTrade>) -> PersistenceResult<PersistReport> {
        let mut report = PersistReport {
            received: trades.len(),
            ..Default::default()
        };
        let mut ids = HashMap::new();
        let mut rows = Vec::with_capacity(trades.len());

        for trade in &trades {
            let base = self
                .resolve(&mut ids, &trade.base_asset_code, &trade.base_asset_issuer)
                .await;
            let counter = self
                .resolve(&mut ids, &trade.counter_asset_code, &trade.counter_asset_issuer)
                .await;

            let (Some(base), Some(counter)) = (base, counter) else {
                warn!(
                    trade_id = %trade.id,
                    base = %format!("{}:{}", trade.base_asset_code, trade.base_asset_issuer),
                    counter = %format!("{}:{}", trade.counter_asset_code, trade.counter_asset_issuer),
                    "Dropping trade with unresolved asset"
                );
                report.unresolved += 1;
                continue;
            };

            match StoredTrade::from_raw(trade, base, counter) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    warn!(trade_id = %trade.id, error = %e, "Dropping malformed trade");
                    report.malformed += 1;
                }
            }
        }

        if !rows.is_empty() {
            report.inserted = self.store.bulk_insert_trades(rows).await?;
        }

        Metrics::trades_persisted(self.source, report.inserted);
        Metrics::trades_dropped("unresolved_asset", report.unresolved);
        Metrics::trades_dropped("malformed", report.malformed);
        debug!(source = self.source, ?report, "Persisted trade batch");

        Ok(report)
    }
}

impl TradeSink for Persister {
    fn persist(&self, trades: Vec<RawTrade>) -> BoxFuture<'_, PersistenceResult<PersistReport>> {
        Box::pin(self.persist_batch(trades))
    }
}
