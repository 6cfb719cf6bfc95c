//! Codec family detection from prober codec ids.
//!
//! Prober codec ids are free-form ("avc1.640028", "hev1.1.6.L93.B0", "vp09.00.40.08",
//! "mp4a.40.2", "opus"), so families are matched by case-insensitive substring.

use serde::{Deserialize, Serialize};

const H264_SIGNATURES: &[&str] = &["avc1", "avc3", "h264"];
const H265_SIGNATURES: &[&str] = &["hevc", "hvc1", "hev1", "h265"];
const AAC_SIGNATURES: &[&str] = &["mp4a", "aac"];

/// Codec families the relay distinguishes between.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CodecFamily {
    /// H.264 / AVC
    H264,
    /// H.265 / HEVC
    H265,
    /// Advanced Audio Coding
    Aac,
    /// Anything else (VP9, AV1, Opus, ...)
    Other,
}

impl CodecFamily {
    /// Classifies a codec id.
    pub fn detect(codec_id: &str) -> Self {
        let id = codec_id.to_ascii_lowercase();
        let matches = |signatures: &[&str]| signatures.iter().any(|s| id.contains(s));

        if matches(H264_SIGNATURES) {
            Self::H264
        } else if matches(H265_SIGNATURES) {
            Self::H265
        } else if matches(AAC_SIGNATURES) {
            Self::Aac
        } else {
            Self::Other
        }
    }

    /// Whether an MP4 video track in this family can be stream-copied.
    pub fn is_mp4_video(&self) -> bool {
        matches!(self, Self::H264 | Self::H265)
    }

    /// Whether an MP4 audio track in this family can be stream-copied.
    pub fn is_mp4_audio(&self) -> bool {
        matches!(self, Self::Aac)
    }
}

/// Whether `codec_id` belongs to the H.264 family.
pub fn is_h264(codec_id: &str) -> bool {
    CodecFamily::detect(codec_id) == CodecFamily::H264
}
