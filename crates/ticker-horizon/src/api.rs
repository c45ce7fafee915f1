//! Upstream seams.
//!
//! Scrapers depend on these traits rather than on `HorizonClient` directly so
//! tests can substitute the recorders in the `mock` module.

use crate::error::HorizonResult;
use crate::page::Page;
use crate::request::{AssetRequest, TradeRequest};
use std::sync::Arc;
use ticker_core::{AssetStat, BoxFuture, IssuerMetadata, RawTrade};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// Ledger API listing and streaming endpoints.
pub trait HorizonApi: Send + Sync {
    /// Fetch one page of the asset listing.
    fn assets(&self, request: AssetRequest) -> BoxFuture<'_, HorizonResult<Page<AssetStat>>>;

    /// Fetch one page of the trade listing.
    fn trades(&self, request: TradeRequest) -> BoxFuture<'_, HorizonResult<Page<RawTrade>>>;

    /// Push every new trade after `cursor` into `sink`.
    ///
    /// Resolves `Ok(())` when `cancel` fires or the receiver goes away, and
    /// `Err` when the transport fails.
    fn stream_trades(
        &self,
        cursor: String,
        sink: mpsc::Sender<RawTrade>,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, HorizonResult<()>>;
}

/// Source of issuer metadata documents.
pub trait MetadataSource: Send + Sync {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, HorizonResult<IssuerMetadata>>;
}

pub type DynHorizonApi = Arc<dyn HorizonApi>;
pub type DynMetadataSource = Arc<dyn MetadataSource>;
