//! Transcoder module: planning and running streaming pipelines.
//!
//! [`TranscodePlanner`] turns the selected formats into a [`PipelinePlan`]
//! (inputs with their request headers, stream mappings, copy-or-encode
//! directives, fragmented MP4 output). A [`Transcoder`] runs the plan and
//! forwards the container bytes to a sink as they are produced.
//!
//! # Example
//!
//! ```ignore
//! use mediarelay_core::transcoder::{FfmpegStreamer, TranscodePlanner, Transcoder, TranscoderConfig};
//!
//! let config = TranscoderConfig::default();
//! let plan = TranscodePlanner::new(&config).plan(video, audio, &metadata.http_headers);
//! let summary = FfmpegStreamer::new(config)
//!     .stream(&plan, &mut sink, &cancel, None)
//!     .await?;
//! println!("forwarded {} bytes", summary.bytes_forwarded);
//! ```

mod config;
mod error;
mod ffmpeg;
mod planner;
mod traits;
mod types;

pub use config::TranscoderConfig;
pub use error::TranscodeError;
pub use ffmpeg::{parse_progress, FfmpegStreamer};
pub use planner::TranscodePlanner;
pub use traits::Transcoder;
pub use types::{
    AudioDirective, OutputContainer, PipelineCommand, PipelineInput, PipelinePlan, StreamEvent,
    StreamKind, StreamMapping, StreamSummary, TranscodeProgress, VideoDirective, AUDIO_ENCODER,
    VIDEO_ENCODER,
};
