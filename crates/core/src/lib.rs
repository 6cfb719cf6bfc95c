pub mod codec;
pub mod config;
pub mod metadata;
pub mod metrics;
pub mod selector;
pub mod testing;
pub mod transcoder;

pub use codec::CodecFamily;
pub use config::{
    load_config, load_config_from_str, load_config_or_default, validate_config, Config,
    ConfigError, SanitizedConfig, ServerConfig,
};
pub use metadata::{
    CacheConfig, CacheStatus, FetchError, Format, MediaMetadata, MetadataCache, MetadataProber,
    MetadataService, ProberConfig, QualityTier, YtDlpProber,
};
pub use selector::{select_formats, FormatSelection};
pub use transcoder::{
    FfmpegStreamer, PipelinePlan, StreamEvent, StreamSummary, TranscodeError, TranscodePlanner,
    Transcoder, TranscoderConfig,
};
