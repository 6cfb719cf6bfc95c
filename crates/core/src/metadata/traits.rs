//! Trait definitions for the metadata module.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::error::FetchError;
use super::types::MediaMetadata;

/// Something that can describe the formats available for a resource locator.
#[async_trait]
pub trait MetadataProber: Send + Sync {
    /// Returns the name of this prober implementation.
    fn name(&self) -> &str;

    /// Fetches metadata for `locator`.
    ///
    /// Cancelling `cancel` must terminate any in-flight external invocation
    /// and resolve to [`FetchError::Cancelled`].
    async fn probe(
        &self,
        locator: &str,
        cancel: &CancellationToken,
    ) -> Result<MediaMetadata, FetchError>;

    /// Validates that the prober is properly configured and ready.
    async fn validate(&self) -> Result<(), FetchError>;
}
