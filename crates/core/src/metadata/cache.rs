//! Time-bounded in-memory cache of fetched metadata.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::debug;

use super::config::CacheConfig;
use super::types::MediaMetadata;

#[derive(Debug, Clone)]
struct CacheEntry {
    metadata: Arc<MediaMetadata>,
    fetched_at: Instant,
}

impl CacheEntry {
    fn is_expired(&self, ttl: Duration, now: Instant) -> bool {
        now.saturating_duration_since(self.fetched_at) >= ttl
    }
}

/// TTL-keyed metadata store shared by all requests.
///
/// Entries are swapped in and out whole, so a reader sees either the previous
/// or the new `Arc`, never a partially written value. Expired entries are
/// invisible to [`get`](Self::get) even if the sweep has not removed them yet.
#[derive(Debug)]
pub struct MetadataCache {
    entries: RwLock<HashMap<String, CacheEntry>>,
    ttl: Duration,
}

impl MetadataCache {
    /// Creates an empty cache without a background sweep.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Creates the cache and starts its background sweep.
    ///
    /// Must be called from within a tokio runtime. The sweep stops on its own
    /// once the last strong reference to the cache is dropped.
    pub fn spawn(config: &CacheConfig) -> Arc<Self> {
        let cache = Arc::new(Self::new(config.ttl()));
        cache.start_sweeper(config.sweep_interval());
        cache
    }

    /// Starts a sweep task that runs every `period`.
    pub fn start_sweeper(self: &Arc<Self>, period: Duration) -> JoinHandle<()> {
        let weak = Arc::downgrade(self);
        tokio::spawn(run_sweeper(weak, period))
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Returns the cached metadata for `key` if present and still fresh.
    pub fn get(&self, key: &str) -> Option<Arc<MediaMetadata>> {
        let now = Instant::now();
        {
            let entries = self.entries.read().unwrap_or_else(PoisonError::into_inner);
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired(self.ttl, now) => {
                    return Some(Arc::clone(&entry.metadata));
                }
                Some(_) => {}
            }
        }

        // Expired: evict unless a concurrent put already replaced it.
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        if entries
            .get(key)
            .is_some_and(|entry| entry.is_expired(self.ttl, now))
        {
            entries.remove(key);
        }
        None
    }

    /// Stores metadata under `key`, replacing any previous entry.
    pub fn put(&self, key: impl Into<String>, metadata: Arc<MediaMetadata>) {
        let entry = CacheEntry {
            metadata,
            fetched_at: Instant::now(),
        };
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.into(), entry);
    }

    /// Removes every expired entry. Returns how many were removed.
    pub fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);
        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired(self.ttl, now));
        before - entries.len()
    }

    /// Number of stored entries, including expired ones not yet swept.
    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

async fn run_sweeper(cache: Weak<MetadataCache>, period: Duration) {
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        ticker.tick().await;
        let Some(cache) = cache.upgrade() else {
            debug!("Metadata cache dropped, stopping sweep");
            break;
        };
        let removed = cache.sweep();
        if removed > 0 {
            debug!(removed, remaining = cache.len(), "Swept expired metadata");
        }
    }
}
