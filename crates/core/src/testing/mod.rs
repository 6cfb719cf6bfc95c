//! Testing utilities and mock implementations for E2E tests.
//!
//! This module provides mock implementations of the external tool traits,
//! allowing end-to-end testing without yt-dlp, ffmpeg or network access.
//!
//! # Example
//!
//! ```rust,ignore
//! use mediarelay_core::testing::{fixtures, MockProber, MockTranscoder};
//!
//! let prober = MockProber::new();
//! let transcoder = MockTranscoder::new();
//!
//! // Configure mock responses
//! prober.set_metadata("https://example.com/v", fixtures::sample_metadata()).await;
//! transcoder.set_chunks(vec![b"ftyp".to_vec()]).await;
//!
//! // Use in AppState...
//! ```

mod mock_prober;
mod mock_transcoder;

pub use mock_prober::MockProber;
pub use mock_transcoder::MockTranscoder;

/// Test fixtures and helper functions.
pub mod fixtures {
    use std::collections::HashMap;

    use crate::metadata::{Format, MediaMetadata};
    use crate::transcoder::{PipelinePlan, TranscodePlanner, TranscoderConfig};

    /// A video-only format with reasonable defaults.
    pub fn video_format(format_id: &str, vcodec: &str, height: u32, tbr: f64) -> Format {
        Format {
            format_id: format_id.to_string(),
            url: format!("https://media.example.com/{}.mp4", format_id),
            vcodec: vcodec.to_string(),
            acodec: "none".to_string(),
            width: height * 16 / 9,
            height,
            tbr,
            protocol: "https".to_string(),
            ..Default::default()
        }
    }

    /// An audio-only format with reasonable defaults.
    pub fn audio_format(format_id: &str, acodec: &str, abr: f64) -> Format {
        Format {
            format_id: format_id.to_string(),
            url: format!("https://media.example.com/{}.m4a", format_id),
            vcodec: "none".to_string(),
            acodec: acodec.to_string(),
            tbr: abr,
            abr,
            protocol: "https".to_string(),
            ..Default::default()
        }
    }

    /// A resource with an H.264 ladder and two audio tracks.
    pub fn sample_metadata() -> MediaMetadata {
        MediaMetadata {
            id: "sample".to_string(),
            title: "Sample Video".to_string(),
            formats: vec![
                video_format("160", "avc1.4d400c", 144, 110.0),
                video_format("134", "avc1.4d401e", 360, 600.0),
                video_format("136", "avc1.4d401f", 720, 1500.0),
                video_format("137", "avc1.640028", 1080, 3000.0),
                audio_format("139", "mp4a.40.5", 48.0),
                audio_format("140", "mp4a.40.2", 128.0),
            ],
            http_headers: HashMap::from([(
                "User-Agent".to_string(),
                "Mozilla/5.0 (test)".to_string(),
            )]),
        }
    }

    /// A resource that only offers audio.
    pub fn audio_only_metadata() -> MediaMetadata {
        MediaMetadata {
            id: "audio-only".to_string(),
            title: "Podcast Episode".to_string(),
            formats: vec![audio_format("140", "mp4a.40.2", 128.0)],
            ..Default::default()
        }
    }

    /// Plan for the best formats of [`sample_metadata`].
    pub fn sample_plan() -> PipelinePlan {
        let metadata = sample_metadata();
        TranscodePlanner::new(&TranscoderConfig::default()).plan(
            &metadata.formats[3],
            Some(&metadata.formats[5]),
            &metadata.http_headers,
        )
    }
}
