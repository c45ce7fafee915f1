//! HTTP client for the ledger API.
//!
//! Listing endpoints return HAL pages; `/trades` additionally streams new
//! records as server-sent events when asked for `text/event-stream`.

use crate::api::HorizonApi;
use crate::error::{HorizonError, HorizonResult};
use crate::page::Page;
use crate::request::{AssetRequest, TradeRequest};
use crate::sse::SseDecoder;
use futures_util::StreamExt;
use reqwest::header::ACCEPT;
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use std::time::Duration;
use ticker_core::{AssetStat, BoxFuture, RawTrade};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Default timeout for listing requests.
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Connect timeout for the long-lived event stream.
const STREAM_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Pause before reopening a stream the server closed.
const STREAM_REOPEN_DELAY: Duration = Duration::from_secs(1);

/// Cursor asking the stream to start at the ledger head.
pub const STREAM_FROM_NOW: &str = "now";

/// Client for the ledger API.
#[derive(Clone)]
pub struct HorizonClient {
    /// Client for paginated requests (total timeout applies).
    client: Client,
    /// Client for the event stream (connect timeout only).
    stream_client: Client,
    base_url: String,
}

impl HorizonClient {
    /// Create a new client.
    ///
    /// # Arguments
    /// * `base_url` - API root, e.g. "https://horizon.stellar.org"
    pub fn new(base_url: impl Into<String>) -> HorizonResult<Self> {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> HorizonResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HorizonError::HttpClient(format!("Failed to create HTTP client: {e}")))?;

        let stream_client = Client::builder()
            .connect_timeout(STREAM_CONNECT_TIMEOUT)
            .build()
            .map_err(|e| HorizonError::HttpClient(format!("Failed to create stream client: {e}")))?;

        Ok(Self {
            client,
            stream_client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn get_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: Vec<(&'static str, String)>,
    ) -> HorizonResult<Page<T>> {
        let url = format!("{}/{}", self.base_url, path);
        debug!(url = %url, ?query, "Fetching page");

        let response = self.client.get(&url).query(&query).send().await?;
        let response = check_status(response).await?;
        let body = response.bytes().await?;
        Ok(serde_json::from_slice(&body)?)
    }

    async fn run_trade_stream(
        &self,
        mut cursor: String,
        sink: mpsc::Sender<RawTrade>,
        cancel: CancellationToken,
    ) -> HorizonResult<()> {
        let url = format!("{}/trades", self.base_url);

        loop {
            info!(cursor = %cursor, "Opening trade stream");
            let request = self
                .stream_client
                .get(&url)
                .query(&[("cursor", cursor.as_str())])
                .header(ACCEPT, "text/event-stream");

            let response = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                response = request.send() => response?,
            };
            let response = check_status(response).await?;

            let mut body = response.bytes_stream();
            let mut decoder = SseDecoder::new();

            loop {
                let chunk = tokio::select! {
                    biased;
                    _ = cancel.cancelled() => return Ok(()),
                    chunk = body.next() => chunk,
                };
                let Some(chunk) = chunk else {
                    break;
                };
                let chunk = chunk.map_err(|e| HorizonError::Stream(e.to_string()))?;

                for event in decoder.push(&chunk) {
                    if event.is_control() {
                        continue;
                    }
                    let trade: RawTrade = match serde_json::from_str(&event.data) {
                        Ok(trade) => trade,
                        Err(e) => {
                            warn!(error = %e, id = ?event.id, "Skipping undecodable stream event");
                            continue;
                        }
                    };
                    cursor = trade.cursor().to_string();

                    tokio::select! {
                        biased;
                        _ = cancel.cancelled() => return Ok(()),
                        sent = sink.send(trade) => {
                            if sent.is_err() {
                                debug!("Trade receiver dropped, closing stream");
                                return Ok(());
                            }
                        }
                    }
                }
            }

            info!(cursor = %cursor, "Trade stream closed by server, reopening");
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Ok(()),
                _ = tokio::time::sleep(STREAM_REOPEN_DELAY) => {}
            }
        }
    }
}

async fn check_status(response: Response) -> HorizonResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(HorizonError::Status {
        status: status.as_u16(),
        body,
    })
}

impl HorizonApi for HorizonClient {
    fn assets(&self, request: AssetRequest) -> BoxFuture<'_, HorizonResult<Page<AssetStat>>> {
        Box::pin(async move { self.get_page("assets", request.query()).await })
    }

    fn trades(&self, request: TradeRequest) -> BoxFuture<'_, HorizonResult<Page<RawTrade>>> {
        Box::pin(async move { self.get_page("trades", request.query()).await })
    }

    fn stream_trades(
        &self,
        cursor: String,
        sink: mpsc::Sender<RawTrade>,
        cancel: CancellationToken,
    ) -> BoxFuture<'_, HorizonResult<()>> {
        Box::pin(self.run_trade_stream(cursor, sink, cancel))
    }
}
