//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Metadata (cache lookups, prober invocations)
//! - Format selection
//! - Streaming pipelines (active count, outcomes, time to first byte, bytes)

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, IntGauge, Opts};

// =============================================================================
// Metadata
// =============================================================================

/// Cache lookups by result.
pub static CACHE_LOOKUPS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediarelay_metadata_cache_lookups_total",
            "Total metadata cache lookups",
        ),
        &["result"], // "hit", "miss"
    )
    .unwrap()
});

/// Prober invocations by outcome.
pub static METADATA_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediarelay_metadata_fetches_total",
            "Total metadata prober invocations",
        ),
        &["result"], // "success", "not_found", "fetch_failed", "parse_failed", "cancelled"
    )
    .unwrap()
});

/// Prober invocation duration in seconds.
pub static METADATA_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediarelay_metadata_fetch_duration_seconds",
            "Duration of metadata prober invocations",
        )
        .buckets(vec![0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0, 20.0, 30.0, 60.0]),
        &["result"],
    )
    .unwrap()
});

// =============================================================================
// Selection
// =============================================================================

/// Format selections by tier and outcome.
pub static FORMAT_SELECTIONS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediarelay_format_selections_total",
            "Total format selections",
        ),
        &["tier", "result"], // result: "selected", "no_viable_format"
    )
    .unwrap()
});

// =============================================================================
// Pipelines
// =============================================================================

/// Pipelines currently running.
pub static PIPELINES_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "mediarelay_pipelines_active",
        "Number of transcoding pipelines currently running",
    )
    .unwrap()
});

/// Pipelines started by video/audio directive.
pub static PIPELINES_STARTED: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediarelay_pipelines_started_total",
            "Total transcoding pipelines started",
        ),
        &["video", "audio"], // "copy", "encode"
    )
    .unwrap()
});

/// Pipeline outcomes.
pub static PIPELINE_RESULTS: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "mediarelay_pipeline_results_total",
            "Total transcoding pipeline outcomes",
        ),
        // "completed", "truncated", "failed", "cancelled", "sink_closed"
        &["result"],
    )
    .unwrap()
});

/// Time from pipeline spawn to first forwarded byte.
pub static TIME_TO_FIRST_BYTE: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "mediarelay_time_to_first_byte_seconds",
            "Time from pipeline start to first byte forwarded to the client",
        )
        .buckets(vec![0.1, 0.25, 0.5, 1.0, 2.0, 3.0, 5.0, 10.0, 20.0]),
        &[],
    )
    .unwrap()
});

/// Bytes forwarded to clients.
pub static BYTES_FORWARDED: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "mediarelay_bytes_forwarded_total",
        "Total bytes forwarded from pipelines to clients",
    )
    .unwrap()
});

// =============================================================================
// Helper functions
// =============================================================================

/// Get all core metrics for registration in a registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        // Metadata
        Box::new(CACHE_LOOKUPS.clone()),
        Box::new(METADATA_FETCHES.clone()),
        Box::new(METADATA_FETCH_DURATION.clone()),
        // Selection
        Box::new(FORMAT_SELECTIONS.clone()),
        // Pipelines
        Box::new(PIPELINES_ACTIVE.clone()),
        Box::new(PIPELINES_STARTED.clone()),
        Box::new(PIPELINE_RESULTS.clone()),
        Box::new(TIME_TO_FIRST_BYTE.clone()),
        Box::new(BYTES_FORWARDED.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_cleanly() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        CACHE_LOOKUPS.with_label_values(&["hit"]).inc();
        PIPELINES_ACTIVE.set(0);

        let names: Vec<String> = registry
            .gather()
            .iter()
            .map(|family| family.get_name().to_string())
            .collect();
        assert!(names.contains(&"mediarelay_metadata_cache_lookups_total".to_string()));
        assert!(names.contains(&"mediarelay_pipelines_active".to_string()));
    }
}
