//! Recording doubles for the upstream traits.

use crate::api::{HorizonApi, MetadataSource};
use crate::error::{HorizonError, HorizonResult};
use crate::page::Page;
use crate::request::{AssetRequest, TradeRequest};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};
use ticker_core::{AssetStat, BoxFuture, IssuerMetadata, RawTrade};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

const MOCK_ROOT: &str = "https://horizon.test";

/// Build a listing page whose `next` link carries `next_cursor`.
///
/// With `last == true` the `next` link equals `self`.
pub fn mock_page<T>(path: &str, records: Vec<T>, cursor: &str, next_cursor: &str, last: bool) -> Page<T> {
    let self_href = format!("{MOCK_ROOT}/{path}?cursor={cursor}&limit=200");
    let next_href = if last {
        self_href.clone()
    } else {
        format!("{MOCK_ROOT}/{path}?cursor={next_cursor}&limit=200")
    };
    Page::new(records, self_href, next_href)
}

/// Scripted upstream.
///
/// Pages are served in push order; an exhausted queue answers with an empty
/// final page. The stream replays `stream_trades` and then either fails with
/// `stream_error` or waits for cancellation.
#[derive(Default)]
pub struct MockHorizon {
    asset_pages: Mutex<VecDeque<HorizonResult<Page<AssetStat>>>>,
    trade_pages: Mutex<VecDeque<HorizonResult<Page<RawTrade>>>>,
    stream_trades: Mutex<Vec<RawTrade>>,
    stream_error: Mutex<Option<String>>,
    asset_requests: Mutex<Vec<AssetRequest>>,
    trade_requests: Mutex<Vec<TradeRequest>>,
    stream_cursors: Mutex<Vec<String>>,
}

impl MockHorizon {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push_asset_page(&self, page: HorizonResult<Page<AssetStat>>) {
        self.asset_pages.lock().push_back(page);
    }

    pub fn push_trade_page(&self, page: HorizonResult<Page<RawTrade>>) {
        self.trade_pages.lock().push_back(page);
    }

    pub fn set_stream(&self, trades: Vec<RawTrade>, error: Option<String>) {
        *self.stream_trades.lock() = trades;
        *self.stream_error.lock() = error;
    }

    pub fn asset_requests(&self) -> Vec<AssetRequest> {
        self.asset_requests.lock().clone()
    }

    pub fn trade_requests(&self) -> Vec<TradeRequest> {
        self.trade_requests.lock().clone()
    }

    pub fn stream_cursors(&self) -> Vec<String> {
        self.stream_cursors.lock().clone()
    }
}

impl HorizonApi for MockHorizon {
    fn assets(&self, request: AssetRequest) -> BoxFuture<'_, HorizonResult<Page<AssetStat>>> {
        Box::pin(async move {
            self.asset_requests.lock().push(request);
            self.asset_pages
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(mock_page("assets", Vec::new(), "end", "end", true)))
        })
    }

    fn trades(&self, request: TradeRequest) -> BoxFuture<'_, HorizonResult<Page<RawTrade>>> {
        Box::pin(async move {
            self.trade_requests.lock().push(request);
            self.trade_pages
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(mock_page("trades", Vec::new(), "end", "end", true)))
        })
    }

    fn stream_trades(
        &self,
        cursor: String,
        sink: mpsc::Sender<RawTrade>,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, HorizonResult<()>> {
        Box::pin(async move {
            self.stream_cursors.lock().push(cursor);
            let trades = self.stream_trades.lock().clone();
            for trade in trades {
                if sink.send(trade).await.is_err() {
                    return Ok(());
                }
            }
            if let Some(message) = self.stream_error.lock().clone() {
                return Err(HorizonError::Stream(message));
            }
            cancel.cancelled().await;
            Ok(())
        })
    }
}

/// Metadata source serving canned documents by URL and counting fetches.
#[derive(Default)]
pub struct MockMetadataSource {
    documents: Mutex<HashMap<String, IssuerMetadata>>,
    failures: Mutex<HashMap<String, u16>>,
    fetches: Mutex<Vec<String>>,
}

impl MockMetadataSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, url: impl Into<String>, metadata: IssuerMetadata) {
        self.documents.lock().insert(url.into(), metadata);
    }

    /// Make `url` answer with the given HTTP status.
    pub fn fail(&self, url: impl Into<String>, status: u16) {
        self.failures.lock().insert(url.into(), status);
    }

    pub fn fetches(&self) -> Vec<String> {
        self.fetches.lock().clone()
    }

    pub fn fetch_count(&self, url: &str) -> usize {
        self.fetches.lock().iter().filter(|u| u.as_str() == url).count()
    }
}

impl MetadataSource for MockMetadataSource {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, HorizonResult<IssuerMetadata>> {
        Box::pin(async move {
            self.fetches.lock().push(url.to_string());
            // Yield so concurrent callers interleave like real requests.
            tokio::task::yield_now().await;

            if let Some(status) = self.failures.lock().get(url).copied() {
                return Err(HorizonError::Status {
                    status,
                    body: String::new(),
                });
            }
            self.documents
                .lock()
                .get(url)
                .cloned()
                .ok_or_else(|| HorizonError::Status {
                    status: 404,
                    body: String::new(),
                })
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_exhausted_queue_serves_final_page() {
        let api = MockHorizon::new();
        api.push_asset_page(Ok(mock_page("assets", Vec::new(), "", "c1", false)));

        let first = api.assets(AssetRequest::default()).await.unwrap();
        assert_eq!(first.next_cursor().unwrap(), "c1");
        assert!(!first.is_last());

        let second = api.assets(AssetRequest::default()).await.unwrap();
        assert!(second.is_last());
        assert_eq!(api.asset_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_metadata_failures_and_counts() {
        let source = MockMetadataSource::new();
        source.insert("https://a.test/toml", IssuerMetadata::default());
        source.fail("https://b.test/toml", 503);

        assert!(source.fetch("https://a.test/toml").await.is_ok());
        let err = source.fetch("https://b.test/toml").await.unwrap_err();
        assert!(err.is_retryable());
        assert!(matches!(
            source.fetch("https://c.test/toml").await,
            Err(HorizonError::Status { status: 404, .. })
        ));
        assert_eq!(source.fetch_count("https://a.test/toml"), 1);
        assert_eq!(source.fetches().len(), 3);
    }
}
