//! Trade and asset storage for the market-data ticker.
//!
//! - `TickerStore`: the storage seam used by ingestion and summaries
//! - `MemoryStore`: in-process store for tests and dry runs
//! - `JsonLinesStore`: `assets.json` plus append-only `trades.jsonl`
//! - `Persister`: resolves asset references, converts and bulk-writes trades
//! - `aggregate`: 24h/7d market statistics over stored rows

pub mod aggregate;
pub mod error;
pub mod jsonl;
pub mod memory;
pub mod persister;
pub mod store;

pub use error::{PersistenceError, PersistenceResult};
pub use jsonl::JsonLinesStore;
pub use memory::MemoryStore;
pub use persister::{PersistReport, Persister, TradeSink};
pub use store::{DynTickerStore, TickerStore};
