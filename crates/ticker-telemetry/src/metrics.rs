//! Prometheus metrics for the market-data ticker.
//!
//! # Panics
//!
//! Metric registration uses `unwrap()`. A failure means duplicate metric
//! names, which only happens at static initialization.

use crate::error::TelemetryResult;
use once_cell::sync::Lazy;
use prometheus::{register_counter_vec, register_int_counter, CounterVec, Encoder, IntCounter, TextEncoder};

/// Assets processed by the asset scraper.
/// Labels: outcome (trusted/discarded)
pub static ASSETS_SCRAPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ticker_assets_scraped_total",
        "Assets processed by the asset scraper",
        &["outcome"]
    )
    .unwrap()
});

/// Metadata cache lookups.
/// Labels: result (hit/miss)
pub static METADATA_CACHE_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ticker_metadata_cache_total",
        "Issuer metadata cache lookups",
        &["result"]
    )
    .unwrap()
});

/// Metadata document fetches that failed after retries.
pub static METADATA_FETCH_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    register_int_counter!(
        "ticker_metadata_fetch_failures_total",
        "Issuer metadata fetches that failed after retries"
    )
    .unwrap()
});

/// Trades written to storage.
/// Labels: source (backfill/stream)
pub static TRADES_PERSISTED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ticker_trades_persisted_total",
        "Trades written to storage",
        &["source"]
    )
    .unwrap()
});

/// Trades dropped before storage.
/// Labels: reason (unresolved/malformed)
pub static TRADES_DROPPED_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ticker_trades_dropped_total",
        "Trades dropped before storage",
        &["reason"]
    )
    .unwrap()
});

/// Upstream retries.
/// Labels: endpoint (assets/trades/metadata)
pub static UPSTREAM_RETRIES_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ticker_upstream_retries_total",
        "Retried upstream requests",
        &["endpoint"]
    )
    .unwrap()
});

/// Stream events handled.
/// Labels: outcome (persisted/skipped)
pub static STREAM_EVENTS_TOTAL: Lazy<CounterVec> = Lazy::new(|| {
    register_counter_vec!(
        "ticker_stream_events_total",
        "Trade stream events by outcome",
        &["outcome"]
    )
    .unwrap()
});

/// Metrics facade.
pub struct Metrics;

impl Metrics {
    pub fn asset_trusted() {
        ASSETS_SCRAPED_TOTAL.with_label_values(&["trusted"]).inc();
    }

    pub fn asset_discarded() {
        ASSETS_SCRAPED_TOTAL.with_label_values(&["discarded"]).inc();
    }

    pub fn metadata_cache_hit() {
        METADATA_CACHE_TOTAL.with_label_values(&["hit"]).inc();
    }

    pub fn metadata_cache_miss() {
        METADATA_CACHE_TOTAL.with_label_values(&["miss"]).inc();
    }

    pub fn metadata_fetch_failed() {
        METADATA_FETCH_FAILURES.inc();
    }

    pub fn trades_persisted(source: &str, count: usize) {
        TRADES_PERSISTED_TOTAL
            .with_label_values(&[source])
            .inc_by(count as f64);
    }

    pub fn trades_dropped(reason: &str, count: usize) {
        TRADES_DROPPED_TOTAL
            .with_label_values(&[reason])
            .inc_by(count as f64);
    }

    pub fn upstream_retry(endpoint: &str) {
        UPSTREAM_RETRIES_TOTAL.with_label_values(&[endpoint]).inc();
    }

    pub fn stream_event(outcome: &str) {
        STREAM_EVENTS_TOTAL.with_label_values(&[outcome]).inc();
    }

    /// Encode every registered metric in the Prometheus text format.
    pub fn render() -> TelemetryResult<String> {
        let encoder = TextEncoder::new();
        let mut buffer = Vec::new();
        encoder.encode(&prometheus::gather(), &mut buffer)?;
        Ok(String::from_utf8(buffer)?)
    }
}
