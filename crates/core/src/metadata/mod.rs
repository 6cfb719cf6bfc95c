//! Metadata module: fetching and caching descriptions of remote resources.
//!
//! A [`MetadataProber`] asks an external tool (yt-dlp) which formats a
//! resource offers. [`MetadataService`] puts a TTL-bounded [`MetadataCache`]
//! in front of it so repeated requests for the same locator skip the prober.
//!
//! # Example
//!
//! ```ignore
//! use mediarelay_core::metadata::{
//!     CacheConfig, MetadataCache, MetadataService, ProberConfig, YtDlpProber,
//! };
//!
//! let cache = MetadataCache::spawn(&CacheConfig::default());
//! let prober = YtDlpProber::new(ProberConfig::default());
//! let service = MetadataService::new(cache, Arc::new(prober));
//!
//! let (metadata, status) = service.get_metadata(url, &cancel).await?;
//! println!("{} formats ({})", metadata.formats.len(), status.as_str());
//! ```

mod cache;
mod config;
mod error;
mod service;
mod traits;
mod types;
mod ytdlp;

pub use cache::MetadataCache;
pub use config::{CacheConfig, ProberConfig};
pub use error::FetchError;
pub use service::MetadataService;
pub use traits::MetadataProber;
pub use types::{CacheStatus, Format, MediaMetadata, QualityTier, NO_CODEC};
pub use ytdlp::YtDlpProber;
