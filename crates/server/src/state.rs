use std::sync::Arc;

use mediarelay_core::{Config, MetadataService, SanitizedConfig, TranscodePlanner, Transcoder};

/// Shared application state
pub struct AppState {
    config: Config,
    metadata: MetadataService,
    planner: TranscodePlanner,
    transcoder: Arc<dyn Transcoder>,
}

impl AppState {
    pub fn new(config: Config, metadata: MetadataService, transcoder: Arc<dyn Transcoder>) -> Self {
        let planner = TranscodePlanner::new(&config.transcoder);
        Self {
            config,
            metadata,
            planner,
            transcoder,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sanitized_config(&self) -> SanitizedConfig {
        SanitizedConfig::from(&self.config)
    }

    pub fn metadata(&self) -> &MetadataService {
        &self.metadata
    }

    pub fn planner(&self) -> &TranscodePlanner {
        &self.planner
    }

    pub fn transcoder(&self) -> Arc<dyn Transcoder> {
        Arc::clone(&self.transcoder)
    }
}
