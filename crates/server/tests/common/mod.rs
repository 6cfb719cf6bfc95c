//! Common test utilities for E2E testing with mocks.
//!
//! This module provides a test fixture that creates an in-process server
//! with mock dependencies injected, enabling E2E testing without yt-dlp,
//! ffmpeg or network access.

#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::body::{Body, Bytes};
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use mediarelay_core::{
    testing::{MockProber, MockTranscoder},
    Config, MetadataCache, MetadataProber, MetadataService, ServerConfig, Transcoder,
};
use mediarelay_server::{api::create_router, state::AppState};

/// Re-export fixtures for test convenience
pub use mediarelay_core::testing::fixtures;

/// Test fixture for E2E testing with mock dependencies.
///
/// Provides an in-process server with fully controllable mocks for:
/// - Metadata probing (MockProber)
/// - Streaming pipelines (MockTranscoder)
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_stream() {
///     let fixture = TestFixture::new().await;
///     fixture.prober.set_metadata(URL, fixtures::sample_metadata()).await;
///
///     let response = fixture.video(URL, None).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock prober - configure metadata per locator
    pub prober: Arc<MockProber>,
    /// Mock transcoder - configure stream output and failures
    pub transcoder: Arc<MockTranscoder>,
    /// Metadata cache shared with the router
    pub cache: Arc<MetadataCache>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub bytes: Bytes,
    /// Parsed JSON body, or Null if the body is not JSON
    pub body: Value,
}

impl TestFixture {
    /// Create a new test fixture with default mocks.
    pub async fn new() -> Self {
        Self::with_config(Config::default()).await
    }

    /// Create a test fixture with custom configuration.
    pub async fn with_config(mut config: Config) -> Self {
        config.server = ServerConfig {
            host: std::net::IpAddr::V4(std::net::Ipv4Addr::LOCALHOST),
            port: 0, // Not used for in-process testing
        };

        // Create mocks
        let prober = Arc::new(MockProber::new());
        let transcoder = Arc::new(MockTranscoder::new());

        // No sweeper: tests control time explicitly
        let cache = Arc::new(MetadataCache::new(config.cache.ttl()));
        let metadata = MetadataService::new(
            Arc::clone(&cache),
            Arc::clone(&prober) as Arc<dyn MetadataProber>,
        );

        // Create app state with mocks
        let state = Arc::new(AppState::new(
            config,
            metadata,
            Arc::clone(&transcoder) as Arc<dyn Transcoder>,
        ));

        // Create router
        let router = create_router(state);

        Self {
            router,
            prober,
            transcoder,
            cache,
        }
    }

    /// Path for a video request.
    pub fn video_path(url: &str, quality: Option<&str>) -> String {
        let mut path = format!("/video?url={}", urlencoding::encode(url));
        if let Some(quality) = quality {
            path.push_str("&quality=");
            path.push_str(quality);
        }
        path
    }

    /// Request a video and collect the whole stream.
    pub async fn video(&self, url: &str, quality: Option<&str>) -> TestResponse {
        self.get(&Self::video_path(url, quality)).await
    }

    /// Send a GET request and return the raw response without reading the body.
    pub async fn get_streaming(&self, path: &str) -> axum::response::Response {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request")
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let response = self.get_streaming(path).await;

        let status = response.status();
        let headers = response.headers().clone();
        let bytes = tokio::time::timeout(Duration::from_secs(10), response.into_body().collect())
            .await
            .expect("Body did not finish in time")
            .expect("Failed to collect body")
            .to_bytes();

        let body: Value = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            bytes,
            body,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            serde_json::to_string_pretty(&$response.body).unwrap_or_default()
        );
    };
}
