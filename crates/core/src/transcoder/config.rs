//! Configuration for the transcoder module.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Configuration for the FFmpeg-based streaming pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TranscoderConfig {
    /// Path to ffmpeg binary.
    #[serde(default = "default_ffmpeg_path")]
    pub ffmpeg_path: PathBuf,

    /// FFmpeg log level (quiet, panic, fatal, error, warning, info, verbose, debug, trace).
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Encoder threads (0 lets ffmpeg decide).
    #[serde(default)]
    pub threads: u32,

    /// x264 preset used when video has to be re-encoded.
    #[serde(default = "default_video_preset")]
    pub video_preset: String,

    /// Forced keyframe interval in frames when re-encoding video.
    ///
    /// Fragmented MP4 cuts a fragment at each keyframe, so this bounds how
    /// long the client waits between fragments.
    #[serde(default = "default_keyframe_interval")]
    pub keyframe_interval: u32,

    /// Size of each read from the pipeline's stdout.
    #[serde(default = "default_chunk_bytes")]
    pub read_chunk_bytes: usize,

    /// Capacity of the in-memory pipe between the pipeline and the HTTP body.
    #[serde(default = "default_chunk_bytes")]
    pub stream_buffer_bytes: usize,

    /// Number of trailing stderr lines kept for error reports.
    #[serde(default = "default_stderr_tail_lines")]
    pub stderr_tail_lines: usize,

    /// Additional ffmpeg arguments inserted just before the output.
    #[serde(default)]
    pub extra_args: Vec<String>,
}

fn default_ffmpeg_path() -> PathBuf {
    PathBuf::from("ffmpeg")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_video_preset() -> String {
    "ultrafast".to_string()
}

fn default_keyframe_interval() -> u32 {
    60 // ~2s at 30fps
}

fn default_chunk_bytes() -> usize {
    64 * 1024
}

fn default_stderr_tail_lines() -> usize {
    20
}

impl Default for TranscoderConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: default_ffmpeg_path(),
            log_level: default_log_level(),
            threads: 0,
            video_preset: default_video_preset(),
            keyframe_interval: default_keyframe_interval(),
            read_chunk_bytes: default_chunk_bytes(),
            stream_buffer_bytes: default_chunk_bytes(),
            stderr_tail_lines: default_stderr_tail_lines(),
            extra_args: Vec::new(),
        }
    }
}

impl TranscoderConfig {
    /// Creates a new config with a custom ffmpeg path.
    pub fn with_path(ffmpeg_path: PathBuf) -> Self {
        Self {
            ffmpeg_path,
            ..Default::default()
        }
    }

    /// Sets the keyframe interval.
    pub fn with_keyframe_interval(mut self, frames: u32) -> Self {
        self.keyframe_interval = frames;
        self
    }

    /// Sets the x264 preset.
    pub fn with_preset(mut self, preset: impl Into<String>) -> Self {
        self.video_preset = preset.into();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = TranscoderConfig::default();
        assert_eq!(config.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(config.log_level, "info");
        assert_eq!(config.threads, 0);
        assert_eq!(config.video_preset, "ultrafast");
        assert_eq!(config.keyframe_interval, 60);
        assert_eq!(config.read_chunk_bytes, 65536);
    }

    #[test]
    fn test_config_builder() {
        let config = TranscoderConfig::with_path(PathBuf::from("/usr/local/bin/ffmpeg"))
            .with_keyframe_interval(48)
            .with_preset("veryfast");

        assert_eq!(config.ffmpeg_path, PathBuf::from("/usr/local/bin/ffmpeg"));
        assert_eq!(config.keyframe_interval, 48);
        assert_eq!(config.video_preset, "veryfast");
    }

    #[test]
    fn test_config_serialization() {
        let config = TranscoderConfig::default();
        let json = serde_json::to_string(&config).unwrap();
        let parsed: TranscoderConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, config);
    }
}
