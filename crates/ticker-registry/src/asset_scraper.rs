//! Asset listing scraper.
//!
//! Pages through the upstream asset listing, applies the discard heuristic
//! and verifies the survivors against their issuer metadata documents with a
//! bounded number of concurrent fetches.

use crate::error::{RegistryError, RegistryResult};
use crate::metadata_cache::MetadataCache;
use crate::trust::{discard_reason, is_domain_verified, DiscardReason};
use chrono::Utc;
use futures_util::stream::{self, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use ticker_core::{AssetStat, EnrichedAsset, IssuerMetadata, RetryPolicy};
use ticker_horizon::{
    AssetRequest, DynHorizonApi, DynMetadataSource, HorizonError, HorizonResult, Page,
    DEFAULT_PAGE_LIMIT,
};
use ticker_telemetry::Metrics;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

#[derive(Debug, Clone)]
pub struct AssetScraperConfig {
    /// Concurrent metadata verifications.
    pub concurrency: usize,
    /// Require an `https` metadata link for mid-range holder counts.
    pub check_trust: bool,
    /// Records requested per listing page.
    pub page_limit: u32,
    pub page_retry: RetryPolicy,
    pub metadata_retry: RetryPolicy,
}

impl Default for AssetScraperConfig {
    fn default() -> Self {
        Self {
            concurrency: 20,
            check_trust: true,
            page_limit: DEFAULT_PAGE_LIMIT,
            page_retry: RetryPolicy::pages(),
            metadata_retry: RetryPolicy::metadata(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct DiscardedAsset {
    pub asset: AssetStat,
    pub reason: DiscardReason,
}

/// Outcome of one scrape.
///
/// `trusted` assets passed the discard heuristic and, when they carry a
/// metadata link, had their document retrieved. Domain ownership is
/// reported per asset in `controlled_by_domain`.
#[derive(Debug, Default)]
pub struct AssetScrapeReport {
    pub trusted: Vec<EnrichedAsset>,
    pub discarded: Vec<DiscardedAsset>,
}

impl AssetScrapeReport {
    pub fn total(&self) -> usize {
        self.trusted.len() + self.discarded.len()
    }
}

pub struct AssetScraper {
    api: DynHorizonApi,
    metadata: DynMetadataSource,
    cache: Arc<MetadataCache>,
    config: AssetScraperConfig,
}

impl AssetScraper {
    pub fn new(
        api: DynHorizonApi,
        metadata: DynMetadataSource,
        cache: Arc<MetadataCache>,
        config: AssetScraperConfig,
    ) -> Self {
        Self {
            api,
            metadata,
            cache,
            config,
        }
    }

    /// Scrape every listed asset, optionally only those of `issuer`.
    ///
    /// `limit` caps the number of candidate assets considered (0 = no cap).
    /// Each `type:code:issuer` is processed at most once.
    pub async fn scrape(
        &self,
        issuer: Option<&str>,
        limit: usize,
        cancel: &CancellationToken,
    ) -> RegistryResult<AssetScrapeReport> {
        let mut report = AssetScrapeReport::default();
        let mut seen: HashSet<String> = HashSet::new();
        let mut request = AssetRequest {
            for_issuer: issuer.map(str::to_string),
            limit: self.config.page_limit,
            ..Default::default()
        };

        info!(issuer = ?issuer, limit, "Scraping assets");

        loop {
            let page = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RegistryError::Cancelled),
                page = self.fetch_page(request.clone()) => page?,
            };
            let is_last = page.is_last() || page.records().is_empty();
            let next_cursor = if is_last {
                None
            } else {
                Some(page.next_cursor()?)
            };

            let mut candidates = Vec::new();
            let mut limit_reached = false;
            for asset in page.into_records() {
                if limit != 0 && seen.len() >= limit {
                    limit_reached = true;
                    break;
                }
                if !seen.insert(asset.key()) {
                    continue;
                }
                match discard_reason(&asset, self.config.check_trust) {
                    Some(reason) => {
                        debug!(asset = %asset.key(), %reason, "Discarding asset");
                        Metrics::asset_discarded();
                        report.discarded.push(DiscardedAsset { asset, reason });
                    }
                    None => candidates.push(asset),
                }
            }

            let verified = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(RegistryError::Cancelled),
                verified = self.verify_all(candidates) => verified,
            };
            for outcome in verified {
                match outcome {
                    Ok(enriched) => {
                        Metrics::asset_trusted();
                        report.trusted.push(enriched);
                    }
                    Err(discarded) => {
                        Metrics::asset_discarded();
                        report.discarded.push(discarded);
                    }
                }
            }

            debug!(
                trusted = report.trusted.len(),
                discarded = report.discarded.len(),
                "Asset page processed"
            );

            if limit_reached || (limit != 0 && seen.len() >= limit) {
                break;
            }
            match next_cursor {
                Some(cursor) => request.cursor = Some(cursor),
                None => break,
            }
        }

        info!(
            trusted = report.trusted.len(),
            discarded = report.discarded.len(),
            cached_documents = self.cache.len(),
            "Asset scrape complete"
        );
        Ok(report)
    }

    async fn fetch_page(&self, request: AssetRequest) -> HorizonResult<Page<AssetStat>> {
        self.config
            .page_retry
            .retry_async(HorizonError::is_retryable, |attempt| {
                if attempt > 0 {
                    Metrics::upstream_retry("assets");
                }
                self.api.assets(request.clone())
            })
            .await
    }

    async fn verify_all(&self, candidates: Vec<AssetStat>) -> Vec<Result<EnrichedAsset, DiscardedAsset>> {
        stream::iter(candidates)
            .map(|asset| self.verify(asset))
            .buffer_unordered(self.config.concurrency.max(1))
            .collect()
            .await
    }

    /// Fetch the asset's metadata document and evaluate domain ownership.
    async fn verify(&self, asset: AssetStat) -> Result<EnrichedAsset, DiscardedAsset> {
        let toml_url = asset.toml_url().to_string();

        if toml_url.is_empty() {
            return Ok(EnrichedAsset {
                asset,
                metadata: IssuerMetadata::default(),
                currency: None,
                controlled_by_domain: false,
                checked_at: Utc::now(),
                error: None,
            });
        }

        let metadata = match self
            .cache
            .get_or_fetch(&toml_url, || self.fetch_metadata(&toml_url))
            .await
        {
            Ok(metadata) => metadata,
            Err(e) => {
                warn!(asset = %asset.key(), url = %toml_url, error = %e, "Metadata fetch failed");
                Metrics::metadata_fetch_failed();
                return Err(DiscardedAsset {
                    asset,
                    reason: DiscardReason::MetadataUnavailable(e.to_string()),
                });
            }
        };

        let currency = metadata
            .currency(&asset.asset_code, &asset.asset_issuer)
            .cloned();
        let controlled_by_domain = is_domain_verified(
            &metadata.documentation.org_url,
            &toml_url,
            currency.is_some(),
        );
        let error = currency.is_none().then(|| {
            format!(
                "no currency entry for {}:{}",
                asset.asset_code, asset.asset_issuer
            )
        });

        Ok(EnrichedAsset {
            asset,
            metadata,
            currency,
            controlled_by_domain,
            checked_at: Utc::now(),
            error,
        })
    }

    async fn fetch_metadata(&self, url: &str) -> HorizonResult<IssuerMetadata> {
        self.config
            .metadata_retry
            .retry_async(HorizonError::is_retryable, |attempt| {
                if attempt > 0 {
                    Metrics::upstream_retry("metadata");
                }
                self.metadata.fetch(url)
            })
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use ticker_core::{AssetLinks, Backoff, CurrencyEntry, Link, OrgDocumentation};
    use ticker_horizon::{mock_page, MockHorizon, MockMetadataSource};

    const ISSUER: &str = "GISSUER";

    fn asset(code: &str, holders: i32, toml: &str) -> AssetStat {
        AssetStat {
            asset_code: code.to_string(),
            asset_issuer: ISSUER.to_string(),
            amount: "1000.0".to_string(),
            num_accounts: holders,
            links: AssetLinks {
                toml: Link {
                    href: toml.to_string(),
                },
            },
            ..Default::default()
        }
    }

    fn document(org_url: &str, codes: &[&str]) -> IssuerMetadata {
        IssuerMetadata {
            documentation: OrgDocumentation {
                org_url: org_url.to_string(),
                ..Default::default()
            },
            currencies: codes
                .iter()
                .map(|code| CurrencyEntry {
                    code: code.to_string(),
                    issuer: ISSUER.to_string(),
                    ..Default::default()
                })
                .collect(),
            ..Default::default()
        }
    }

    fn quick_config() -> AssetScraperConfig {
        AssetScraperConfig {
            concurrency: 4,
            check_trust: true,
            page_limit: DEFAULT_PAGE_LIMIT,
            page_retry: RetryPolicy::new(2, Duration::from_millis(1), Backoff::Fixed),
            metadata_retry: RetryPolicy::new(2, Duration::from_millis(1), Backoff::Fixed),
        }
    }

    fn scraper(
        api: Arc<MockHorizon>,
        source: Arc<MockMetadataSource>,
        cache: Arc<MetadataCache>,
    ) -> AssetScraper {
        AssetScraper::new(api, source, cache, quick_config())
    }

    #[tokio::test]
    async fn test_scrape_splits_trusted_and_discarded() {
        let toml = "https://example.com/.well-known/stellar.toml";
        let api = Arc::new(MockHorizon::new());
        api.push_asset_page(Ok(mock_page(
            "assets",
            vec![
                asset("USD", 40, toml),
                asset("EUR", 40, toml),
                asset("SPAM", 3, toml),
                asset("REMOVE", 500, ""),
                asset("BIG", 150, ""),
            ],
            "",
            "p2",
            false,
        )));

        let source = Arc::new(MockMetadataSource::new());
        source.insert(toml, document("https://example.com", &["USD"]));
        let cache = Arc::new(MetadataCache::new());

        let report = scraper(api.clone(), source.clone(), cache.clone())
            .scrape(None, 0, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.total(), 5);
        assert_eq!(report.discarded.len(), 2);
        assert_eq!(report.trusted.len(), 3);

        let usd = report.trusted.iter().find(|a| a.asset.asset_code == "USD").unwrap();
        assert!(usd.controlled_by_domain);
        assert!(usd.currency.is_some());

        let eur = report.trusted.iter().find(|a| a.asset.asset_code == "EUR").unwrap();
        assert!(!eur.controlled_by_domain);
        assert!(eur.error.is_some());

        let big = report.trusted.iter().find(|a| a.asset.asset_code == "BIG").unwrap();
        assert!(!big.controlled_by_domain);

        assert!(source.fetch_count(toml) >= 1);
        assert!(cache.get(toml).is_some());
        let requests = api.asset_requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[1].cursor.as_deref(), Some("p2"));
    }

    #[tokio::test]
    async fn test_cached_document_not_refetched() {
        let toml = "https://example.com/.well-known/stellar.toml";
        let api = Arc::new(MockHorizon::new());
        api.push_asset_page(Ok(mock_page("assets", vec![asset("USD", 40, toml)], "", "", true)));

        let source = Arc::new(MockMetadataSource::new());
        let cache = Arc::new(MetadataCache::new());
        cache.set(toml, document("https://example.com", &["USD"]));

        let report = scraper(api, source.clone(), cache)
            .scrape(None, 0, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.trusted.len(), 1);
        assert!(report.trusted[0].controlled_by_domain);
        assert_eq!(source.fetch_count(toml), 0);
    }

    #[tokio::test]
    async fn test_metadata_failure_only_affects_that_asset() {
        let good = "https://good.example/.well-known/stellar.toml";
        let bad = "https://bad.example/.well-known/stellar.toml";
        let api = Arc::new(MockHorizon::new());
        api.push_asset_page(Ok(mock_page(
            "assets",
            vec![asset("USD", 40, good), asset("EUR", 40, bad)],
            "",
            "",
            true,
        )));

        let source = Arc::new(MockMetadataSource::new());
        source.insert(good, document("", &["USD"]));
        source.fail(bad, 503);
        let cache = Arc::new(MetadataCache::new());

        let report = scraper(api, source.clone(), cache.clone())
            .scrape(None, 0, &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(report.trusted.len(), 1);
        assert_eq!(report.discarded.len(), 1);
        assert!(matches!(
            report.discarded[0].reason,
            DiscardReason::MetadataUnavailable(_)
        ));
        // 503 is retried once under the two-attempt policy.
        assert_eq!(source.fetch_count(bad), 2);
        assert!(cache.get(bad).is_none());
    }

    #[tokio::test]
    async fn test_duplicates_and_limit() {
        let api = Arc::new(MockHorizon::new());
        api.push_asset_page(Ok(mock_page(
            "assets",
            vec![asset("AAA", 150, ""), asset("AAA", 150, ""), asset("BBB", 150, "")],
            "",
            "p2",
            false,
        )));
        api.push_asset_page(Ok(mock_page(
            "assets",
            vec![asset("CCC", 150, ""), asset("DDD", 150, "")],
            "p2",
            "p3",
            false,
        )));

        let report = scraper(
            api.clone(),
            Arc::new(MockMetadataSource::new()),
            Arc::new(MetadataCache::new()),
        )
        .scrape(Some(ISSUER), 3, &CancellationToken::new())
        .await
        .unwrap();

        let mut codes: Vec<_> = report.trusted.iter().map(|a| a.asset.asset_code.clone()).collect();
        codes.sort();
        assert_eq!(codes, vec!["AAA", "BBB", "CCC"]);
        assert_eq!(api.asset_requests()[0].for_issuer.as_deref(), Some(ISSUER));
    }

    #[tokio::test]
    async fn test_page_failure_is_fatal() {
        let api = Arc::new(MockHorizon::new());
        api.push_asset_page(Err(HorizonError::Status {
            status: 400,
            body: "bad request".to_string(),
        }));

        let result = scraper(
            api,
            Arc::new(MockMetadataSource::new()),
            Arc::new(MetadataCache::new()),
        )
        .scrape(None, 0, &CancellationToken::new())
        .await;

        assert!(matches!(result, Err(RegistryError::Upstream(_))));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let cancel = CancellationToken::new();
        cancel.cancel();

        let result = scraper(
            Arc::new(MockHorizon::new()),
            Arc::new(MockMetadataSource::new()),
            Arc::new(MetadataCache::new()),
        )
        .scrape(None, 0, &cancel)
        .await;

        assert!(matches!(result, Err(RegistryError::Cancelled)));
    }
}
