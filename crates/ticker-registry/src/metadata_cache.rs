//! Issuer metadata cache.
//!
//! Maps a metadata document URL to its parsed contents. Shared across
//! verification workers; entries live for the process lifetime.

use dashmap::DashMap;
use std::future::Future;
use ticker_core::IssuerMetadata;
use ticker_telemetry::Metrics;
use tracing::trace;

#[derive(Debug, Default)]
pub struct MetadataCache {
    entries: DashMap<String, IssuerMetadata>,
}

impl MetadataCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, url: &str) -> Option<IssuerMetadata> {
        self.entries.get(url).map(|entry| entry.value().clone())
    }

    pub fn set(&self, url: impl Into<String>, metadata: IssuerMetadata) {
        self.entries.insert(url.into(), metadata);
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Return the cached document for `url`, fetching it on a miss.
    ///
    /// Concurrent misses on the same URL may each fetch; the first result
    /// stored wins and every caller returns that stored value. Failed fetches
    /// are not cached. No map lock is held while `fetch` runs.
    pub async fn get_or_fetch<F, Fut, E>(&self, url: &str, fetch: F) -> Result<IssuerMetadata, E>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<IssuerMetadata, E>>,
    {
        if let Some(hit) = self.get(url) {
            Metrics::metadata_cache_hit();
            trace!(url = %url, "Metadata cache hit");
            return Ok(hit);
        }

        Metrics::metadata_cache_miss();
        let fetched = fetch().await?;

        let stored = self
            .entries
            .entry(url.to_string())
            .or_insert(fetched)
            .value()
            .clone();
        Ok(stored)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use ticker_core::OrgDocumentation;

    fn metadata(org: &str) -> IssuerMetadata {
        IssuerMetadata {
            documentation: OrgDocumentation {
                org_name: org.to_string(),
                ..Default::default()
            },
            ..Default::default()
        }
    }

    #[test]
    fn test_set_then_get() {
        let cache = MetadataCache::new();
        assert!(cache.get("https://a.example/stellar.toml").is_none());

        cache.set("https://a.example/stellar.toml", metadata("A"));
        let hit = cache.get("https://a.example/stellar.toml").unwrap();
        assert_eq!(hit.documentation.org_name, "A");
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_hit_skips_fetch() {
        let cache = MetadataCache::new();
        cache.set("u", metadata("cached"));

        let calls = AtomicUsize::new(0);
        let result: Result<_, String> = cache
            .get_or_fetch("u", || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(metadata("fresh"))
            })
            .await;

        assert_eq!(result.unwrap().documentation.org_name, "cached");
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_failure_not_cached() {
        let cache = MetadataCache::new();
        let failed: Result<IssuerMetadata, String> =
            cache.get_or_fetch("u", || async { Err("timeout".to_string()) }).await;
        assert!(failed.is_err());
        assert!(cache.is_empty());

        let ok: Result<_, String> = cache
            .get_or_fetch("u", || async { Ok(metadata("second try")) })
            .await;
        assert_eq!(ok.unwrap().documentation.org_name, "second try");
    }

    #[tokio::test]
    async fn test_concurrent_misses_converge() {
        let cache = Arc::new(MetadataCache::new());
        let mut handles = Vec::new();

        for worker in 0..16 {
            let cache = cache.clone();
            handles.push(tokio::spawn(async move {
                cache
                    .get_or_fetch("shared", || async move {
                        tokio::task::yield_now().await;
                        Ok::<_, String>(metadata(&format!("worker-{worker}")))
                    })
                    .await
                    .unwrap()
            }));
        }

        let mut seen = Vec::new();
        for handle in handles {
            seen.push(handle.await.unwrap().documentation.org_name);
        }

        let stored = cache.get("shared").unwrap().documentation.org_name;
        assert!(seen.iter().all(|name| *name == stored));
        assert_eq!(cache.len(), 1);
    }
}
