//! Video relay handler.
//!
//! `GET /video?url=<locator>&quality=<low|medium|high>` resolves the locator
//! to formats, picks the best ones for the tier and streams them as a
//! fragmented MP4. Response headers are only committed once the pipeline has
//! produced its first byte, so failures that happen before any output still
//! get a proper status code.

use std::sync::Arc;

use axum::{
    body::Body,
    extract::{Query, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio::sync::mpsc;
use tokio_util::io::ReaderStream;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use mediarelay_core::metrics::FORMAT_SELECTIONS;
use mediarelay_core::{
    select_formats, FetchError, QualityTier, StreamEvent, StreamSummary, TranscodeError,
};

use crate::metrics::VIDEO_REQUESTS;
use crate::state::AppState;

/// Capacity of the pipeline event channel.
const EVENT_BUFFER: usize = 16;

// ============================================================================
// Request/Response types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct VideoParams {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub quality: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Failures that end a video request before streaming starts.
#[derive(Debug)]
pub enum ApiError {
    MissingUrl,
    NotFound,
    NoVideoFormat,
    Fetch(FetchError),
    Pipeline(TranscodeError),
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            Self::MissingUrl => StatusCode::BAD_REQUEST,
            Self::NotFound | Self::NoVideoFormat => StatusCode::NOT_FOUND,
            Self::Fetch(_) | Self::Pipeline(_) | Self::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    fn outcome(&self) -> &'static str {
        match self {
            Self::MissingUrl => "bad_request",
            Self::NotFound => "not_found",
            Self::NoVideoFormat => "no_video_format",
            Self::Fetch(_) => "fetch_failed",
            Self::Pipeline(_) => "pipeline_failed",
            Self::Internal(_) => "internal",
        }
    }

    fn message(&self) -> String {
        match self {
            Self::MissingUrl => "Missing 'url' parameter".to_string(),
            Self::NotFound => "Video not found".to_string(),
            Self::NoVideoFormat => "No suitable video format found".to_string(),
            Self::Fetch(_) => "Failed to fetch video metadata".to_string(),
            Self::Pipeline(_) => "Failed to start video stream".to_string(),
            Self::Internal(msg) => msg.clone(),
        }
    }
}

impl From<FetchError> for ApiError {
    fn from(err: FetchError) -> Self {
        if err.is_not_found() {
            Self::NotFound
        } else {
            Self::Fetch(err)
        }
    }
}

impl From<TranscodeError> for ApiError {
    fn from(err: TranscodeError) -> Self {
        Self::Pipeline(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        VIDEO_REQUESTS.with_label_values(&[self.outcome()]).inc();

        match &self {
            Self::Fetch(e) => error!(error = %e, "Error getting video info"),
            Self::Pipeline(e) if e.is_client_gone() => debug!(error = %e, "Client went away"),
            Self::Pipeline(e) => error!(error = %e, "Pipeline failed before output"),
            Self::Internal(msg) => error!(error = %msg, "Internal error"),
            _ => debug!(status = %self.status(), "Rejected video request"),
        }

        (
            self.status(),
            Json(ErrorResponse {
                error: self.message(),
            }),
        )
            .into_response()
    }
}

// ============================================================================
// Handler
// ============================================================================

pub async fn stream_video(
    State(state): State<Arc<AppState>>,
    Query(params): Query<VideoParams>,
) -> Result<Response, ApiError> {
    let locator = params
        .url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .ok_or(ApiError::MissingUrl)?
        .to_string();
    let tier = QualityTier::from_param(params.quality.as_deref());

    info!(url = %locator, quality = %tier, "Processing video request");

    // Cancelled when this handler is dropped, or later when the response body is.
    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();

    let (metadata, cache_status) = state.metadata().get_metadata(&locator, &cancel).await?;

    let selection = select_formats(&metadata, tier);
    let Some(video) = selection.video else {
        FORMAT_SELECTIONS
            .with_label_values(&[tier.as_str(), "no_viable_format"])
            .inc();
        return Err(ApiError::NoVideoFormat);
    };
    FORMAT_SELECTIONS
        .with_label_values(&[tier.as_str(), "selected"])
        .inc();

    match selection.audio {
        Some(audio) => info!(
            video = %video.format_id,
            height = video.height,
            vcodec = %video.vcodec,
            audio = %audio.format_id,
            acodec = %audio.acodec,
            cache = cache_status.as_str(),
            "Selected formats"
        ),
        None => info!(
            video = %video.format_id,
            height = video.height,
            vcodec = %video.vcodec,
            cache = cache_status.as_str(),
            "Selected formats, no audio"
        ),
    }

    let plan = state
        .planner()
        .plan(video, selection.audio, &metadata.http_headers);
    let content_type = plan.output.content_type();

    let (mut writer, reader) =
        tokio::io::duplex(state.config().transcoder.stream_buffer_bytes);
    let (event_tx, mut event_rx) = mpsc::channel(EVENT_BUFFER);
    let transcoder = state.transcoder();
    let pipeline_cancel = cancel.clone();

    let mut pipeline = tokio::spawn(async move {
        let result = transcoder
            .stream(&plan, &mut writer, &pipeline_cancel, Some(event_tx))
            .await;
        let _ = writer.shutdown().await;
        log_outcome(&result);
        result
    });

    // Wait for the first byte or for the pipeline to end without one.
    let mut started = false;
    while let Some(event) = event_rx.recv().await {
        if let StreamEvent::FirstByte { elapsed_ms } = event {
            debug!(ttfb_ms = elapsed_ms, "Committing response headers");
            started = true;
            break;
        }
    }
    drop(event_rx);

    if !started {
        // The event sender is gone, so the pipeline has returned.
        match (&mut pipeline).await {
            Ok(Ok(summary)) => {
                debug!(bytes = summary.bytes_forwarded, "Pipeline ended without output");
            }
            Ok(Err(e)) => return Err(e.into()),
            Err(e) => return Err(ApiError::Internal(format!("pipeline task failed: {}", e))),
        }
    }

    VIDEO_REQUESTS.with_label_values(&["streaming"]).inc();

    let chunk_size = state.config().transcoder.read_chunk_bytes;
    let body = ReaderStream::with_capacity(reader, chunk_size).map(move |chunk| {
        // Dropping the body (client gone) drops the guard and stops the pipeline.
        let _ = &guard;
        chunk
    });

    let mut response = Response::new(Body::from_stream(body));
    let headers = response.headers_mut();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    Ok(response)
}

fn log_outcome(result: &Result<StreamSummary, TranscodeError>) {
    match result {
        Ok(summary) if summary.truncated => warn!(
            bytes = summary.bytes_forwarded,
            exit_code = ?summary.exit_code,
            "Stream truncated"
        ),
        Ok(summary) => info!(
            bytes = summary.bytes_forwarded,
            duration_ms = summary.duration_ms,
            ttfb_ms = ?summary.time_to_first_byte_ms,
            "Streaming completed successfully"
        ),
        Err(e) if e.is_client_gone() => info!(reason = %e, "Streaming stopped, client gone"),
        Err(e) => warn!(error = %e, "Streaming error"),
    }
}
