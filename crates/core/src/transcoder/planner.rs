//! Turns a format selection into a pipeline plan.

use std::collections::{BTreeMap, HashMap};

use crate::codec::CodecFamily;
use crate::metadata::Format;

use super::config::TranscoderConfig;
use super::types::{
    AudioDirective, OutputContainer, PipelineInput, PipelinePlan, StreamKind, StreamMapping,
    VideoDirective, AUDIO_ENCODER, VIDEO_ENCODER,
};

const USER_AGENT: &str = "user-agent";

/// Builds [`PipelinePlan`]s. Pure: no I/O, no process spawning.
#[derive(Debug, Clone)]
pub struct TranscodePlanner {
    video_preset: String,
    keyframe_interval: u32,
}

impl TranscodePlanner {
    pub fn new(config: &TranscoderConfig) -> Self {
        Self {
            video_preset: config.video_preset.clone(),
            keyframe_interval: config.keyframe_interval,
        }
    }

    /// Plans a pipeline for `video` plus optional `audio`.
    ///
    /// `default_headers` are the resource-level headers; each format's own
    /// headers override them.
    pub fn plan(
        &self,
        video: &Format,
        audio: Option<&Format>,
        default_headers: &HashMap<String, String>,
    ) -> PipelinePlan {
        let mut inputs = vec![build_input(video, default_headers)];

        let separate_audio = audio.filter(|a| a.url != video.url);
        let mappings = match separate_audio {
            Some(audio) => {
                inputs.push(build_input(audio, default_headers));
                vec![
                    StreamMapping::required(0, StreamKind::Video),
                    StreamMapping::required(1, StreamKind::Audio),
                ]
            }
            None => vec![
                StreamMapping::required(0, StreamKind::Video),
                StreamMapping::optional(0, StreamKind::Audio),
            ],
        };

        PipelinePlan {
            inputs,
            mappings,
            video: self.video_directive(&video.vcodec),
            audio: audio_directive(audio.map(|a| a.acodec.as_str())),
            output: OutputContainer::FragmentedMp4,
            video_format_id: video.format_id.clone(),
            audio_format_id: audio.map(|a| a.format_id.clone()),
        }
    }

    fn video_directive(&self, vcodec: &str) -> VideoDirective {
        if CodecFamily::detect(vcodec).is_mp4_video() {
            VideoDirective::Copy
        } else {
            VideoDirective::Encode {
                codec: VIDEO_ENCODER.to_string(),
                preset: self.video_preset.clone(),
                keyframe_interval: self.keyframe_interval,
            }
        }
    }
}

fn audio_directive(acodec: Option<&str>) -> AudioDirective {
    match acodec {
        Some(codec) if CodecFamily::detect(codec).is_mp4_audio() => AudioDirective::Copy,
        _ => AudioDirective::Encode {
            codec: AUDIO_ENCODER.to_string(),
        },
    }
}

fn build_input(format: &Format, default_headers: &HashMap<String, String>) -> PipelineInput {
    // Keyed by lowercase name so overrides and ordering ignore case.
    let mut merged: BTreeMap<String, (&str, &str)> = BTreeMap::new();
    for (name, value) in default_headers.iter().chain(format.http_headers.iter()) {
        merged.insert(name.to_ascii_lowercase(), (name.as_str(), value.as_str()));
    }

    let user_agent = merged
        .remove(USER_AGENT)
        .map(|(_, value)| value.to_string());
    let headers = merged
        .into_values()
        .map(|(name, value)| (name.to_string(), value.to_string()))
        .collect();

    PipelineInput {
        url: format.url.clone(),
        user_agent,
        headers,
    }
}
