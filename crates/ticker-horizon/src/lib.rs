//! Upstream ledger API client.
//!
//! - `HorizonClient`: paginated `/assets` and `/trades`, SSE trade stream
//! - `HttpMetadataSource`: issuer metadata documents (TOML over HTTPS)
//! - `MockHorizon`, `MockMetadataSource`: scripted doubles for tests
//!   (`test-util` feature)

pub mod api;
pub mod client;
pub mod error;
pub mod metadata;
#[cfg(any(test, feature = "test-util"))]
pub mod mock;
pub mod page;
pub mod request;
pub mod sse;

pub use api::{DynHorizonApi, DynMetadataSource, HorizonApi, MetadataSource};
pub use client::{HorizonClient, STREAM_FROM_NOW};
pub use error::{HorizonError, HorizonResult};
pub use metadata::{parse_metadata, HttpMetadataSource, MAX_METADATA_BYTES, METADATA_TIMEOUT};
#[cfg(any(test, feature = "test-util"))]
pub use mock::{mock_page, MockHorizon, MockMetadataSource};
pub use page::{next_cursor, Page, PageLinks};
pub use request::{AssetRequest, Order, TradeRequest, DEFAULT_PAGE_LIMIT};
pub use sse::{SseDecoder, SseEvent};
