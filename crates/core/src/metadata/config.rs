//! Configuration for metadata fetching and caching.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the yt-dlp based prober.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProberConfig {
    /// Path to yt-dlp binary.
    #[serde(default = "default_ytdlp_path")]
    pub ytdlp_path: PathBuf,

    /// Additional arguments inserted before the locator.
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Substrings of prober stderr that mean the resource is unavailable.
    #[serde(default = "default_not_found_markers")]
    pub not_found_markers: Vec<String>,
}

fn default_ytdlp_path() -> PathBuf {
    PathBuf::from("yt-dlp")
}

fn default_not_found_markers() -> Vec<String> {
    [
        "Video unavailable",
        "HTTP Error 404",
        "This video is unavailable",
        "Private video",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

impl Default for ProberConfig {
    fn default() -> Self {
        Self {
            ytdlp_path: default_ytdlp_path(),
            extra_args: Vec::new(),
            not_found_markers: default_not_found_markers(),
        }
    }
}

impl ProberConfig {
    /// Creates a new config with a custom yt-dlp path.
    pub fn with_path(ytdlp_path: PathBuf) -> Self {
        Self {
            ytdlp_path,
            ..Default::default()
        }
    }
}

/// Configuration for the in-memory metadata cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a fetched entry stays valid.
    #[serde(default = "default_ttl")]
    pub ttl_secs: u64,

    /// How often the background sweep runs.
    #[serde(default = "default_sweep_interval")]
    pub sweep_interval_secs: u64,
}

fn default_ttl() -> u64 {
    600 // 10 minutes
}

fn default_sweep_interval() -> u64 {
    60
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_ttl(),
            sweep_interval_secs: default_sweep_interval(),
        }
    }
}

impl CacheConfig {
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_secs)
    }

    pub fn sweep_interval(&self) -> Duration {
        Duration::from_secs(self.sweep_interval_secs)
    }
}
