use serde::{Deserialize, Serialize};
use std::net::{IpAddr, Ipv4Addr};
use std::path::PathBuf;

use crate::metadata::{CacheConfig, ProberConfig};
use crate::transcoder::TranscoderConfig;

/// Root configuration
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub prober: ProberConfig,
    #[serde(default)]
    pub transcoder: TranscoderConfig,
}

/// Server configuration
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::V4(Ipv4Addr::UNSPECIFIED)
}

fn default_port() -> u16 {
    8080
}

/// Sanitized config for API responses (tool arguments hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub prober: SanitizedProberConfig,
    pub transcoder: SanitizedTranscoderConfig,
}

/// Sanitized prober config (extra arguments may carry cookies or credentials)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedProberConfig {
    pub ytdlp_path: PathBuf,
    pub extra_args_count: usize,
    pub not_found_markers: Vec<String>,
}

/// Sanitized transcoder config (extra arguments hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedTranscoderConfig {
    pub ffmpeg_path: PathBuf,
    pub log_level: String,
    pub threads: u32,
    pub video_preset: String,
    pub keyframe_interval: u32,
    pub read_chunk_bytes: usize,
    pub stream_buffer_bytes: usize,
    pub extra_args_count: usize,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        Self {
            server: config.server.clone(),
            cache: config.cache.clone(),
            prober: SanitizedProberConfig {
                ytdlp_path: config.prober.ytdlp_path.clone(),
                extra_args_count: config.prober.extra_args.len(),
                not_found_markers: config.prober.not_found_markers.clone(),
            },
            transcoder: SanitizedTranscoderConfig {
                ffmpeg_path: config.transcoder.ffmpeg_path.clone(),
                log_level: config.transcoder.log_level.clone(),
                threads: config.transcoder.threads,
                video_preset: config.transcoder.video_preset.clone(),
                keyframe_interval: config.transcoder.keyframe_interval,
                read_chunk_bytes: config.transcoder.read_chunk_bytes,
                stream_buffer_bytes: config.transcoder.stream_buffer_bytes,
                extra_args_count: config.transcoder.extra_args.len(),
            },
        }
    }
}
