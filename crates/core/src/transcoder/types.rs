//! Types for the transcoder module.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Encoder used when the selected video cannot be copied into MP4.
pub const VIDEO_ENCODER: &str = "libx264";

/// Encoder used when the selected audio cannot be copied into MP4.
pub const AUDIO_ENCODER: &str = "aac";

/// One network input of the pipeline.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PipelineInput {
    /// Direct media URL.
    pub url: String,
    /// Sent through ffmpeg's dedicated user agent option.
    pub user_agent: Option<String>,
    /// Remaining request headers, sorted by lowercase name.
    pub headers: Vec<(String, String)>,
}

impl PipelineInput {
    /// Renders `[-user_agent UA] [-headers H] -i URL`.
    pub fn to_args(&self) -> Vec<String> {
        let mut args = Vec::new();

        if let Some(ref user_agent) = self.user_agent {
            args.extend(["-user_agent".to_string(), user_agent.clone()]);
        }

        if !self.headers.is_empty() {
            let block: String = self
                .headers
                .iter()
                .map(|(name, value)| format!("{}: {}\r\n", name, value))
                .collect();
            args.extend(["-headers".to_string(), block]);
        }

        args.extend(["-i".to_string(), self.url.clone()]);
        args
    }
}

/// Kind of elementary stream taken from an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StreamKind {
    Video,
    Audio,
}

impl StreamKind {
    fn specifier(&self) -> &'static str {
        match self {
            Self::Video => "v",
            Self::Audio => "a",
        }
    }
}

/// Maps the first stream of a kind from one input into the output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamMapping {
    pub input: usize,
    pub kind: StreamKind,
    /// Optional mappings don't fail the pipeline if the stream is missing.
    pub optional: bool,
}

impl StreamMapping {
    pub fn required(input: usize, kind: StreamKind) -> Self {
        Self {
            input,
            kind,
            optional: false,
        }
    }

    pub fn optional(input: usize, kind: StreamKind) -> Self {
        Self {
            input,
            kind,
            optional: true,
        }
    }

    /// The ffmpeg `-map` argument, e.g. `0:v:0` or `0:a:0?`.
    pub fn specifier(&self) -> String {
        format!(
            "{}:{}:0{}",
            self.input,
            self.kind.specifier(),
            if self.optional { "?" } else { "" }
        )
    }
}

/// What happens to the video stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum VideoDirective {
    /// Pass the encoded stream through unchanged.
    Copy,
    /// Re-encode with forced, regular keyframes.
    Encode {
        codec: String,
        preset: String,
        keyframe_interval: u32,
    },
}

impl VideoDirective {
    pub fn is_copy(&self) -> bool {
        matches!(self, Self::Copy)
    }

    pub fn to_args(&self) -> Vec<String> {
        match self {
            Self::Copy => vec!["-c:v".to_string(), "copy".to_string()],
            Self::Encode {
                codec,
                preset,
                keyframe_interval,
            } => vec![
                "-c:v".to_string(),
                codec.clone(),
                "-preset".to_string(),
                preset.clone(),
                "-g".to_string(),
                keyframe_interval.to_string(),
                "-keyint_min".to_string(),
                keyframe_interval.to_string(),
                "-sc_threshold".to_string(),
                "0".to_string(),
            ],
        }
    }
}

/// What happens to the audio stream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum AudioDirective {
    Copy,
    Encode { codec: String },
}

impl AudioDirective {
    pub fn is_copy(&self) -> bool {
        matches!(self, Self::Copy)
    }

    pub fn to_args(&self) -> Vec<String> {
        match self {
            Self::Copy => vec!["-c:a".to_string(), "copy".to_string()],
            Self::Encode { codec } => vec!["-c:a".to_string(), codec.clone()],
        }
    }
}

/// Output container written to stdout.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutputContainer {
    /// MP4 with an empty moov and a fragment per keyframe, playable while
    /// still being written.
    #[default]
    FragmentedMp4,
}

impl OutputContainer {
    pub fn to_args(&self) -> Vec<String> {
        match self {
            Self::FragmentedMp4 => vec![
                "-f".to_string(),
                "mp4".to_string(),
                "-movflags".to_string(),
                "frag_keyframe+empty_moov".to_string(),
                "pipe:1".to_string(),
            ],
        }
    }

    /// Content type of the bytes this container produces.
    pub fn content_type(&self) -> &'static str {
        match self {
            Self::FragmentedMp4 => "video/mp4",
        }
    }
}

/// A complete, tool-independent description of one streaming pipeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelinePlan {
    /// Video input first, then audio input if it comes from elsewhere.
    pub inputs: Vec<PipelineInput>,
    pub mappings: Vec<StreamMapping>,
    pub video: VideoDirective,
    pub audio: AudioDirective,
    pub output: OutputContainer,
    /// Format ids the plan was built from (for logs).
    pub video_format_id: String,
    pub audio_format_id: Option<String>,
}

impl PipelinePlan {
    /// Input, mapping and codec arguments. Globals and the output are added by
    /// the runner.
    pub fn to_args(&self) -> Vec<String> {
        let mut args: Vec<String> = self.inputs.iter().flat_map(|i| i.to_args()).collect();

        for mapping in &self.mappings {
            args.extend(["-map".to_string(), mapping.specifier()]);
        }

        args.extend(self.video.to_args());
        args.extend(self.audio.to_args());
        args
    }

    pub fn has_separate_audio_input(&self) -> bool {
        self.inputs.len() > 1
    }
}

/// The concrete process to launch for a plan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl PipelineCommand {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }
}

impl fmt::Display for PipelineCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.program.display())?;
        for arg in &self.args {
            write!(f, " {}", arg.escape_debug())?;
        }
        Ok(())
    }
}

/// Progress parsed from a pipeline status line.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TranscodeProgress {
    pub frame: Option<u64>,
    /// Media position, as printed by ffmpeg (`00:01:02.03`).
    pub time: Option<String>,
    /// Processing speed relative to realtime, e.g. `1.5x`.
    pub speed: Option<String>,
}

/// Events emitted while a pipeline runs.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    /// The first chunk reached the sink.
    FirstByte { elapsed_ms: u64 },
    Progress(TranscodeProgress),
}

/// Outcome of a pipeline that produced a response.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StreamSummary {
    pub bytes_forwarded: u64,
    pub time_to_first_byte_ms: Option<u64>,
    pub duration_ms: u64,
    pub exit_code: Option<i32>,
    /// The pipeline failed after output had started; the client received a
    /// cut-short stream.
    pub truncated: bool,
}
