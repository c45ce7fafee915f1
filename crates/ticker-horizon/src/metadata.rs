//! Issuer metadata document fetch.

use crate::api::MetadataSource;
use crate::error::{HorizonError, HorizonResult};
use reqwest::Client;
use std::time::Duration;
use ticker_core::{BoxFuture, IssuerMetadata};
use tracing::debug;

/// Fetch deadline for one metadata document.
pub const METADATA_TIMEOUT: Duration = Duration::from_secs(10);

/// Largest metadata document body accepted.
pub const MAX_METADATA_BYTES: usize = 100 * 1024;

/// Fetches issuer-hosted TOML documents over HTTP.
#[derive(Clone)]
pub struct HttpMetadataSource {
    client: Client,
}

impl HttpMetadataSource {
    pub fn new() -> HorizonResult<Self> {
        Self::with_timeout(METADATA_TIMEOUT)
    }

    pub fn with_timeout(timeout: Duration) -> HorizonResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| HorizonError::HttpClient(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client })
    }

    async fn fetch_document(&self, url: &str) -> HorizonResult<IssuerMetadata> {
        debug!(url = %url, "Fetching issuer metadata");

        let mut response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(HorizonError::Status {
                status: status.as_u16(),
                body,
            });
        }

        if let Some(len) = response.content_length() {
            if len > MAX_METADATA_BYTES as u64 {
                return Err(HorizonError::MetadataTooLarge(MAX_METADATA_BYTES));
            }
        }

        let mut body = Vec::new();
        while let Some(chunk) = response.chunk().await? {
            if body.len() + chunk.len() > MAX_METADATA_BYTES {
                return Err(HorizonError::MetadataTooLarge(MAX_METADATA_BYTES));
            }
            body.extend_from_slice(&chunk);
        }

        let body = String::from_utf8(body).map_err(|e| HorizonError::MetadataParse(e.to_string()))?;
        parse_metadata(&body)
    }
}

/// Decode a metadata document body.
pub fn parse_metadata(body: &str) -> HorizonResult<IssuerMetadata> {
    toml::from_str(body).map_err(|e| HorizonError::MetadataParse(e.to_string()))
}

impl MetadataSource for HttpMetadataSource {
    fn fetch<'a>(&'a self, url: &'a str) -> BoxFuture<'a, HorizonResult<IssuerMetadata>> {
        Box::pin(self.fetch_document(url))
    }
}
