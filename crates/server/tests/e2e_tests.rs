//! End-to-end tests with mocked external dependencies.
//!
//! These tests run the full server stack in-process with mock implementations
//! for the external tools (yt-dlp, ffmpeg).

mod common;

use std::time::Duration;

use axum::http::{header, StatusCode};
use mediarelay_core::{FetchError, TranscodeError};

use common::{fixtures, TestFixture};

const URL: &str = "https://www.example.com/watch?v=abc123";

// =============================================================================
// Basic API Tests
// =============================================================================

#[tokio::test]
async fn test_health_endpoint() {
    let fixture = TestFixture::new().await;
    let response = fixture.get("/api/v1/health").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["status"], "ok");
}

#[tokio::test]
async fn test_config_endpoint_is_sanitized() {
    let mut config = mediarelay_core::Config::default();
    config.prober.extra_args = vec!["--cookies".to_string(), "/secret/cookies.txt".to_string()];
    let fixture = TestFixture::with_config(config).await;

    let response = fixture.get("/api/v1/config").await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(response.body["cache"]["ttl_secs"], 600);
    assert_eq!(response.body["prober"]["extra_args_count"], 2);
    assert!(!String::from_utf8_lossy(&response.bytes).contains("/secret/cookies.txt"));
}

#[tokio::test]
async fn test_metrics_endpoint() {
    let fixture = TestFixture::new().await;
    fixture.get("/api/v1/health").await;

    let response = fixture.get("/metrics").await;
    assert_status!(response, StatusCode::OK);
    let text = String::from_utf8_lossy(&response.bytes);
    assert!(text.contains("mediarelay_http_requests_total"));
    assert!(text.contains("mediarelay_metadata_cache_entries"));
}

// =============================================================================
// Request Validation
// =============================================================================

#[tokio::test]
async fn test_missing_url_is_bad_request() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/video").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(response.body["error"], "Missing 'url' parameter");
    assert_eq!(fixture.prober.probe_count().await, 0);
}

#[tokio::test]
async fn test_blank_url_is_bad_request() {
    let fixture = TestFixture::new().await;

    let response = fixture.get("/video?url=%20%20&quality=low").await;
    assert_status!(response, StatusCode::BAD_REQUEST);
    assert_eq!(fixture.prober.probe_count().await, 0);
}

// =============================================================================
// Metadata Failures
// =============================================================================

#[tokio::test]
async fn test_unknown_video_is_not_found() {
    let fixture = TestFixture::new().await;

    let response = fixture.video(URL, None).await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "Video not found");
    assert_eq!(fixture.transcoder.stream_count().await, 0);
}

#[tokio::test]
async fn test_fetch_failure_is_internal_error_and_not_cached() {
    let fixture = TestFixture::new().await;
    fixture
        .prober
        .set_metadata(URL, fixtures::sample_metadata())
        .await;
    fixture
        .prober
        .set_next_error(FetchError::fetch_failed("exit status 1", None))
        .await;

    let response = fixture.video(URL, None).await;
    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error"], "Failed to fetch video metadata");
    assert!(fixture.cache.is_empty());

    // The failure was not remembered
    let response = fixture.video(URL, None).await;
    assert_status!(response, StatusCode::OK);
    assert_eq!(fixture.prober.probe_count().await, 2);
}

#[tokio::test]
async fn test_no_video_format_is_not_found() {
    let fixture = TestFixture::new().await;
    fixture
        .prober
        .set_metadata(URL, fixtures::audio_only_metadata())
        .await;

    let response = fixture.video(URL, Some("high")).await;
    assert_status!(response, StatusCode::NOT_FOUND);
    assert_eq!(response.body["error"], "No suitable video format found");
    assert_eq!(fixture.transcoder.stream_count().await, 0);
}

// =============================================================================
// Streaming
// =============================================================================

#[tokio::test]
async fn test_stream_success() {
    let fixture = TestFixture::new().await;
    fixture
        .prober
        .set_metadata(URL, fixtures::sample_metadata())
        .await;

    let response = fixture.video(URL, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(response.headers[header::CONTENT_TYPE], "video/mp4");
    assert_eq!(response.headers[header::X_CONTENT_TYPE_OPTIONS], "nosniff");
    assert_eq!(
        response.bytes.to_vec(),
        fixture.transcoder.expected_output().await
    );

    // High tier: 1080p H.264 plus the best audio track, both copied
    let plans = fixture.transcoder.recorded_plans().await;
    assert_eq!(plans.len(), 1);
    let plan = &plans[0];
    assert_eq!(plan.video_format_id, "137");
    assert_eq!(plan.audio_format_id.as_deref(), Some("140"));
    assert!(plan.video.is_copy());
    assert!(plan.audio.is_copy());
    assert_eq!(plan.inputs.len(), 2);
    assert_eq!(
        plan.inputs[0].user_agent.as_deref(),
        Some("Mozilla/5.0 (test)")
    );
}

#[tokio::test]
async fn test_quality_tiers() {
    let fixture = TestFixture::new().await;
    fixture
        .prober
        .set_metadata(URL, fixtures::sample_metadata())
        .await;

    fixture.video(URL, Some("low")).await;
    fixture.video(URL, Some("medium")).await;
    fixture.video(URL, Some("bogus")).await;

    let plans = fixture.transcoder.recorded_plans().await;
    assert_eq!(plans.len(), 3);

    // Low: closest to 360p and the cheapest audio
    assert_eq!(plans[0].video_format_id, "134");
    assert_eq!(plans[0].audio_format_id.as_deref(), Some("139"));
    // Medium: closest to 720p
    assert_eq!(plans[1].video_format_id, "136");
    assert_eq!(plans[1].audio_format_id.as_deref(), Some("140"));
    // Unknown values fall back to high
    assert_eq!(plans[2].video_format_id, "137");
}

#[tokio::test]
async fn test_metadata_is_reused_from_cache() {
    let fixture = TestFixture::new().await;
    fixture
        .prober
        .set_metadata(URL, fixtures::sample_metadata())
        .await;

    for _ in 0..3 {
        let response = fixture.video(URL, None).await;
        assert_eq!(response.status, StatusCode::OK);
    }

    assert_eq!(fixture.prober.probe_count().await, 1);
    assert_eq!(fixture.transcoder.stream_count().await, 3);
    assert_eq!(fixture.cache.len(), 1);
}

#[tokio::test]
async fn test_pipeline_failure_before_output_is_internal_error() {
    let fixture = TestFixture::new().await;
    fixture
        .prober
        .set_metadata(URL, fixtures::sample_metadata())
        .await;
    fixture
        .transcoder
        .set_next_error(TranscodeError::pipeline_failed(
            Some(1),
            &["Server returned 403 Forbidden".to_string()],
        ))
        .await;

    let response = fixture.video(URL, None).await;
    assert_status!(response, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(response.body["error"], "Failed to start video stream");
}

#[tokio::test]
async fn test_failure_after_output_truncates_stream() {
    let fixture = TestFixture::new().await;
    fixture
        .prober
        .set_metadata(URL, fixtures::sample_metadata())
        .await;
    fixture
        .transcoder
        .set_chunks(vec![b"partial".to_vec()])
        .await;
    fixture.transcoder.set_truncate(true).await;

    let response = fixture.video(URL, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert_eq!(&response.bytes[..], b"partial");
}

#[tokio::test]
async fn test_clean_exit_without_output() {
    let fixture = TestFixture::new().await;
    fixture
        .prober
        .set_metadata(URL, fixtures::sample_metadata())
        .await;
    fixture.transcoder.set_chunks(Vec::new()).await;

    let response = fixture.video(URL, None).await;
    assert_eq!(response.status, StatusCode::OK);
    assert!(response.bytes.is_empty());
}

#[tokio::test]
async fn test_dropped_response_stops_pipeline() {
    let fixture = TestFixture::new().await;
    fixture
        .prober
        .set_metadata(URL, fixtures::sample_metadata())
        .await;
    fixture.transcoder.set_hold_open(true).await;

    let response = fixture
        .get_streaming(&TestFixture::video_path(URL, None))
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    // Client goes away mid-stream
    drop(response);

    let mut aborted = 0;
    for _ in 0..100 {
        aborted = fixture.transcoder.aborted_count().await;
        if aborted > 0 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert_eq!(aborted, 1);
}
