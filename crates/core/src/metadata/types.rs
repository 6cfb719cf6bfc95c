//! Types for resource metadata as reported by the prober.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

/// Codec id the prober uses for "this format has no such stream".
pub const NO_CODEC: &str = "none";

/// A single encoding of a resource.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Format {
    /// Prober-assigned identifier (e.g. "137", "hls-1080p").
    #[serde(default, deserialize_with = "null_as_default")]
    pub format_id: String,
    /// Delivery URL.
    #[serde(default, deserialize_with = "null_as_default")]
    pub url: String,
    /// Video codec id, or "none".
    #[serde(default, deserialize_with = "null_as_default")]
    pub vcodec: String,
    /// Audio codec id, or "none".
    #[serde(default, deserialize_with = "null_as_default")]
    pub acodec: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub width: u32,
    #[serde(default, deserialize_with = "null_as_default")]
    pub height: u32,
    /// Total bitrate in kbps.
    #[serde(default, deserialize_with = "null_as_default")]
    pub tbr: f64,
    /// Audio bitrate in kbps.
    #[serde(default, deserialize_with = "null_as_default")]
    pub abr: f64,
    /// Delivery protocol ("https", "m3u8_native", ...).
    #[serde(default, deserialize_with = "null_as_default")]
    pub protocol: String,
    /// Headers required when fetching `url`.
    #[serde(default, deserialize_with = "null_as_default")]
    pub http_headers: HashMap<String, String>,
}

impl Format {
    /// Whether this format carries a usable video stream.
    pub fn is_video(&self) -> bool {
        self.vcodec != NO_CODEC && self.width > 0
    }

    /// Whether this format carries an audio stream.
    pub fn is_audio(&self) -> bool {
        self.acodec != NO_CODEC
    }

    /// Whether this format carries audio and explicitly no video.
    pub fn is_audio_only(&self) -> bool {
        self.vcodec == NO_CODEC
    }

    /// Whether the format is delivered as one continuous HTTP resource
    /// rather than a segmented playlist.
    pub fn is_progressive_http(&self) -> bool {
        self.protocol.starts_with("http") && !self.protocol.contains("m3u8")
    }

    /// Audio bitrate if known, otherwise the total bitrate.
    pub fn effective_audio_bitrate(&self) -> f64 {
        if self.abr > 0.0 {
            self.abr
        } else {
            self.tbr
        }
    }
}

/// Metadata for one resource. Immutable once fetched.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct MediaMetadata {
    #[serde(default, deserialize_with = "null_as_default")]
    pub id: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub title: String,
    /// Available formats, in prober order.
    #[serde(default, deserialize_with = "null_as_default")]
    pub formats: Vec<Format>,
    /// Resource-level default headers.
    #[serde(default, deserialize_with = "null_as_default")]
    pub http_headers: HashMap<String, String>,
}

/// Coarse quality preference supplied by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualityTier {
    Low,
    Medium,
    #[default]
    High,
}

impl QualityTier {
    /// Parses an optional request parameter, falling back to [`QualityTier::High`]
    /// when missing or unrecognized.
    pub fn from_param(value: Option<&str>) -> Self {
        value.and_then(|v| v.parse().ok()).unwrap_or_default()
    }

    /// Target height for tiers that aim at a resolution band.
    pub fn target_height(&self) -> Option<u32> {
        match self {
            Self::Low => Some(360),
            Self::Medium => Some(720),
            Self::High => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
        }
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for QualityTier {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            other => Err(format!("unknown quality tier: {}", other)),
        }
    }
}

/// Whether a metadata lookup was served from the cache.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheStatus {
    Hit,
    Miss,
}

impl CacheStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
        }
    }
}

/// The prober emits `null` for many fields it could not determine.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
