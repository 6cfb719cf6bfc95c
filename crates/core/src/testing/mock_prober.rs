//! Mock metadata prober for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio_util::sync::CancellationToken;

use crate::metadata::{FetchError, MediaMetadata, MetadataProber};

/// Mock implementation of the MetadataProber trait.
///
/// Provides controllable behavior for testing:
/// - Serve pre-configured metadata per locator
/// - Report unknown locators as not found
/// - Inject a one-shot error
/// - Simulate slow probes that honour cancellation
///
/// # Example
///
/// ```rust,ignore
/// use mediarelay_core::testing::{fixtures, MockProber};
///
/// let prober = MockProber::new();
/// prober.set_metadata("https://example.com/v", fixtures::sample_metadata()).await;
///
/// let metadata = prober.probe("https://example.com/v", &cancel).await?;
/// assert_eq!(prober.probe_count().await, 1);
/// ```
#[derive(Debug)]
pub struct MockProber {
    /// Metadata served by locator.
    metadata: Arc<RwLock<HashMap<String, MediaMetadata>>>,
    /// Locators probed, in order.
    probes: Arc<RwLock<Vec<String>>>,
    /// If set, the next probe will fail with this error.
    next_error: Arc<RwLock<Option<FetchError>>>,
    /// Simulated probe duration.
    delay: Arc<RwLock<Duration>>,
}

impl Default for MockProber {
    fn default() -> Self {
        Self::new()
    }
}

impl MockProber {
    /// Create a new mock prober.
    pub fn new() -> Self {
        Self {
            metadata: Arc::new(RwLock::new(HashMap::new())),
            probes: Arc::new(RwLock::new(Vec::new())),
            next_error: Arc::new(RwLock::new(None)),
            delay: Arc::new(RwLock::new(Duration::ZERO)),
        }
    }

    /// Serve `metadata` for `locator`.
    pub async fn set_metadata(&self, locator: impl Into<String>, metadata: MediaMetadata) {
        self.metadata.write().await.insert(locator.into(), metadata);
    }

    /// Configure the next probe to fail with the given error.
    pub async fn set_next_error(&self, error: FetchError) {
        *self.next_error.write().await = Some(error);
    }

    /// Set the simulated probe duration.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    /// Locators probed so far.
    pub async fn recorded_probes(&self) -> Vec<String> {
        self.probes.read().await.clone()
    }

    /// Number of probes performed.
    pub async fn probe_count(&self) -> usize {
        self.probes.read().await.len()
    }
}

#[async_trait]
impl MetadataProber for MockProber {
    fn name(&self) -> &str {
        "mock"
    }

    async fn probe(
        &self,
        locator: &str,
        cancel: &CancellationToken,
    ) -> Result<MediaMetadata, FetchError> {
        self.probes.write().await.push(locator.to_string());

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::select! {
                _ = tokio::time::sleep(delay) => {}
                _ = cancel.cancelled() => return Err(FetchError::Cancelled),
            }
        }

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        self.metadata
            .read()
            .await
            .get(locator)
            .cloned()
            .ok_or_else(|| FetchError::NotFound {
                locator: locator.to_string(),
            })
    }

    async fn validate(&self) -> Result<(), FetchError> {
        Ok(())
    }
}
