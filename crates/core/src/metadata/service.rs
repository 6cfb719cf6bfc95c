//! Cache-backed metadata lookup.

use std::sync::Arc;
use std::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use super::cache::MetadataCache;
use super::error::FetchError;
use super::traits::MetadataProber;
use super::types::{CacheStatus, MediaMetadata};
use crate::metrics::{CACHE_LOOKUPS, METADATA_FETCHES, METADATA_FETCH_DURATION};

/// Serves metadata from the shared cache, probing on a miss.
///
/// Only successful probes are stored; a failed fetch leaves no trace, so the
/// next request for the same locator probes again.
pub struct MetadataService {
    cache: Arc<MetadataCache>,
    prober: Arc<dyn MetadataProber>,
}

impl MetadataService {
    pub fn new(cache: Arc<MetadataCache>, prober: Arc<dyn MetadataProber>) -> Self {
        Self { cache, prober }
    }

    pub fn cache(&self) -> &Arc<MetadataCache> {
        &self.cache
    }

    pub fn prober(&self) -> &dyn MetadataProber {
        self.prober.as_ref()
    }

    /// Returns metadata for `locator` and whether it came from the cache.
    pub async fn get_metadata(
        &self,
        locator: &str,
        cancel: &CancellationToken,
    ) -> Result<(Arc<MediaMetadata>, CacheStatus), FetchError> {
        if let Some(metadata) = self.cache.get(locator) {
            CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
            info!(locator = %locator, "Cache HIT");
            return Ok((metadata, CacheStatus::Hit));
        }
        CACHE_LOOKUPS.with_label_values(&["miss"]).inc();
        info!(locator = %locator, prober = self.prober.name(), "Cache MISS");

        let start = Instant::now();
        let result = self.prober.probe(locator, cancel).await;
        let label = match &result {
            Ok(_) => "success",
            Err(e) => e.kind(),
        };
        METADATA_FETCHES.with_label_values(&[label]).inc();
        METADATA_FETCH_DURATION
            .with_label_values(&[label])
            .observe(start.elapsed().as_secs_f64());

        let metadata = Arc::new(result?);
        self.cache.put(locator, Arc::clone(&metadata));
        debug!(
            locator = %locator,
            id = %metadata.id,
            formats = metadata.formats.len(),
            "Cached metadata"
        );

        Ok((metadata, CacheStatus::Miss))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{fixtures, MockProber};
    use std::time::Duration;

    fn service(prober: Arc<MockProber>) -> MetadataService {
        MetadataService::new(
            Arc::new(MetadataCache::new(Duration::from_secs(600))),
            prober,
        )
    }

    #[tokio::test]
    async fn test_miss_then_hit() {
        let prober = Arc::new(MockProber::new());
        prober
            .set_metadata("https://example.com/v", fixtures::sample_metadata())
            .await;
        let service = service(Arc::clone(&prober));
        let cancel = CancellationToken::new();

        let (first, status) = service
            .get_metadata("https://example.com/v", &cancel)
            .await
            .unwrap();
        assert_eq!(status, CacheStatus::Miss);

        let (second, status) = service
            .get_metadata("https://example.com/v", &cancel)
            .await
            .unwrap();
        assert_eq!(status, CacheStatus::Hit);
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(prober.probe_count().await, 1);
    }

    #[tokio::test]
    async fn test_failures_are_not_cached() {
        let prober = Arc::new(MockProber::new());
        let service = service(Arc::clone(&prober));
        let cancel = CancellationToken::new();

        // Unknown locators are reported as not found by the mock.
        for _ in 0..3 {
            let result = service.get_metadata("https://example.com/gone", &cancel).await;
            assert!(matches!(result, Err(FetchError::NotFound { .. })));
        }
        assert_eq!(prober.probe_count().await, 3);
        assert!(service.cache().is_empty());
    }

    #[tokio::test]
    async fn test_parse_failure_propagates() {
        let prober = Arc::new(MockProber::new());
        prober
            .set_next_error(FetchError::parse_failed("unexpected token"))
            .await;
        let service = service(Arc::clone(&prober));

        let result = service
            .get_metadata("https://example.com/v", &CancellationToken::new())
            .await;
        assert!(matches!(result, Err(FetchError::ParseFailed { .. })));
        assert!(service.cache().is_empty());
    }
}
