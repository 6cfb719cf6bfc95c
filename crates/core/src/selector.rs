//! Format selection: picks the video and audio formats to relay for a tier.
//!
//! Selection is a pure function of the metadata and the requested tier. Video
//! candidates are ranked by resolution, then codec (H.264 avoids a re-encode),
//! then bitrate. Audio candidates are ranked so that dedicated, progressively
//! delivered audio wins over audio embedded in muxed or segmented formats.

use std::cmp::Ordering;

use crate::codec::is_h264;
use crate::metadata::{Format, MediaMetadata, QualityTier};

/// The formats chosen for one request. Borrowed from the metadata.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FormatSelection<'a> {
    /// Present whenever the metadata has at least one video-capable format.
    pub video: Option<&'a Format>,
    /// Absent only if nothing can supply an audio stream.
    pub audio: Option<&'a Format>,
}

/// Picks the formats to relay for `tier`.
pub fn select_formats(metadata: &MediaMetadata, tier: QualityTier) -> FormatSelection<'_> {
    let mut videos: Vec<&Format> = metadata.formats.iter().filter(|f| f.is_video()).collect();
    let mut audios: Vec<&Format> = metadata.formats.iter().filter(|f| f.is_audio()).collect();

    videos.sort_by(|a, b| compare_video(a, b));
    audios.sort_by(|a, b| compare_audio(a, b));

    let video = match tier.target_height() {
        None => videos.first().copied(),
        Some(target) => closest_to_height(&videos, target),
    };

    let audio = if audios.is_empty() {
        video.filter(|v| v.is_audio())
    } else {
        match tier {
            QualityTier::Low => audios.last().copied(),
            QualityTier::Medium | QualityTier::High => audios.first().copied(),
        }
    };

    FormatSelection { video, audio }
}

/// Video ranking: taller first, then H.264, then higher total bitrate.
fn compare_video(a: &Format, b: &Format) -> Ordering {
    b.height
        .cmp(&a.height)
        .then_with(|| is_h264(&b.vcodec).cmp(&is_h264(&a.vcodec)))
        .then_with(|| b.tbr.total_cmp(&a.tbr))
}

/// Audio ranking: audio-only first, then progressive HTTP, then higher
/// effective bitrate.
fn compare_audio(a: &Format, b: &Format) -> Ordering {
    b.is_audio_only()
        .cmp(&a.is_audio_only())
        .then_with(|| b.is_progressive_http().cmp(&a.is_progressive_http()))
        .then_with(|| {
            b.effective_audio_bitrate()
                .total_cmp(&a.effective_audio_bitrate())
        })
}

/// First candidate (in ranked order) with the smallest height distance.
fn closest_to_height<'a>(ranked: &[&'a Format], target: u32) -> Option<&'a Format> {
    // min_by_key keeps the first of equal minima, i.e. the better-ranked one.
    ranked
        .iter()
        .copied()
        .min_by_key(|f| f.height.abs_diff(target))
}
