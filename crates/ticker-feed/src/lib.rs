//! Trade ingestion.
//!
//! - `TradeScraper`: paginated backfill bounded by a close-time window,
//!   flushed to a `TradeSink` in batches
//! - `TradeStreamer`: live trades from the event stream, persisted one by one

pub mod backfill;
pub mod error;
pub mod stream;

pub use backfill::{BackfillConfig, BackfillReport, TradeScraper, DEFAULT_BATCH_CEILING};
pub use error::{FeedError, FeedResult};
pub use stream::{StreamEvent, TradeStreamer};
