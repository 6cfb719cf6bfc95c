use super::{types::Config, ConfigError};

/// Validate configuration
/// Currently validates:
/// - Server port is not 0
/// - Cache TTL and sweep interval are positive
/// - Transcoder keyframe interval and buffer sizes are positive
/// - A read chunk fits in the stream buffer
pub fn validate_config(config: &Config) -> Result<(), ConfigError> {
    // Server validation
    if config.server.port == 0 {
        return Err(ConfigError::ValidationError(
            "server.port cannot be 0".to_string(),
        ));
    }

    // Cache validation
    if config.cache.ttl_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache.ttl_secs must be greater than 0".to_string(),
        ));
    }
    if config.cache.sweep_interval_secs == 0 {
        return Err(ConfigError::ValidationError(
            "cache.sweep_interval_secs must be greater than 0".to_string(),
        ));
    }

    // Transcoder validation
    let transcoder = &config.transcoder;
    if transcoder.keyframe_interval == 0 {
        return Err(ConfigError::ValidationError(
            "transcoder.keyframe_interval must be greater than 0".to_string(),
        ));
    }
    if transcoder.read_chunk_bytes == 0 || transcoder.stream_buffer_bytes == 0 {
        return Err(ConfigError::ValidationError(
            "transcoder.read_chunk_bytes and transcoder.stream_buffer_bytes must be greater than 0"
                .to_string(),
        ));
    }
    // A whole chunk must fit in the response pipe before the client starts reading.
    if transcoder.stream_buffer_bytes < transcoder.read_chunk_bytes {
        return Err(ConfigError::ValidationError(
            "transcoder.stream_buffer_bytes must be at least transcoder.read_chunk_bytes"
                .to_string(),
        ));
    }

    Ok(())
}
