//! Mock transcoder for testing.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Instant;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tokio::sync::{mpsc, RwLock};
use tokio_util::sync::CancellationToken;

use crate::transcoder::{PipelinePlan, StreamEvent, StreamSummary, TranscodeError, Transcoder};

/// Mock implementation of the Transcoder trait.
///
/// Writes pre-configured chunks to the sink instead of running a process.
/// Provides controllable behavior for testing:
/// - Track plans for assertions
/// - Fail before any output (one-shot error)
/// - Fail after output (truncated stream)
/// - Stay open after output until cancelled
#[derive(Debug)]
pub struct MockTranscoder {
    /// Plans submitted, in order.
    plans: Arc<RwLock<Vec<PipelinePlan>>>,
    /// Chunks written to the sink.
    chunks: Arc<RwLock<Vec<Vec<u8>>>>,
    /// If set, the next stream will fail with this error before writing.
    next_error: Arc<RwLock<Option<TranscodeError>>>,
    /// Whether streams end as if the pipeline exited non-zero after output.
    truncate: Arc<RwLock<bool>>,
    /// Whether streams wait for cancellation after the last chunk.
    hold_open: Arc<RwLock<bool>>,
    /// Streams that ended through cancellation or a closed sink.
    aborted: Arc<RwLock<usize>>,
}

impl Default for MockTranscoder {
    fn default() -> Self {
        Self::new()
    }
}

impl MockTranscoder {
    /// Create a new mock transcoder that writes a small fake MP4 header.
    pub fn new() -> Self {
        Self {
            plans: Arc::new(RwLock::new(Vec::new())),
            chunks: Arc::new(RwLock::new(vec![
                b"\x00\x00\x00\x18ftypiso5".to_vec(),
                b"moof-mdat".to_vec(),
            ])),
            next_error: Arc::new(RwLock::new(None)),
            truncate: Arc::new(RwLock::new(false)),
            hold_open: Arc::new(RwLock::new(false)),
            aborted: Arc::new(RwLock::new(0)),
        }
    }

    /// Set the chunks written by each stream.
    pub async fn set_chunks(&self, chunks: Vec<Vec<u8>>) {
        *self.chunks.write().await = chunks;
    }

    /// The concatenation of the configured chunks.
    pub async fn expected_output(&self) -> Vec<u8> {
        self.chunks.read().await.concat()
    }

    /// Configure the next stream to fail with the given error.
    pub async fn set_next_error(&self, error: TranscodeError) {
        *self.next_error.write().await = Some(error);
    }

    /// Make streams report a non-zero exit after their output.
    pub async fn set_truncate(&self, truncate: bool) {
        *self.truncate.write().await = truncate;
    }

    /// Make streams wait for cancellation after their output.
    pub async fn set_hold_open(&self, hold_open: bool) {
        *self.hold_open.write().await = hold_open;
    }

    /// Plans submitted so far.
    pub async fn recorded_plans(&self) -> Vec<PipelinePlan> {
        self.plans.read().await.clone()
    }

    /// Number of streams started.
    pub async fn stream_count(&self) -> usize {
        self.plans.read().await.len()
    }

    /// Number of streams stopped by cancellation or a closed sink.
    pub async fn aborted_count(&self) -> usize {
        *self.aborted.read().await
    }

    async fn record_abort(&self, err: TranscodeError) -> TranscodeError {
        *self.aborted.write().await += 1;
        err
    }
}

#[async_trait]
impl Transcoder for MockTranscoder {
    fn name(&self) -> &str {
        "mock"
    }

    async fn stream(
        &self,
        plan: &PipelinePlan,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        cancel: &CancellationToken,
        events: Option<mpsc::Sender<StreamEvent>>,
    ) -> Result<StreamSummary, TranscodeError> {
        let start = Instant::now();
        self.plans.write().await.push(plan.clone());

        if let Some(err) = self.next_error.write().await.take() {
            return Err(err);
        }

        let chunks = self.chunks.read().await.clone();
        let mut summary = StreamSummary::default();

        for chunk in chunks {
            if cancel.is_cancelled() {
                return Err(self.record_abort(TranscodeError::Cancelled).await);
            }
            if let Err(e) = sink.write_all(&chunk).await {
                return Err(self.record_abort(TranscodeError::SinkClosed(e)).await);
            }
            if let Err(e) = sink.flush().await {
                return Err(self.record_abort(TranscodeError::SinkClosed(e)).await);
            }
            summary.bytes_forwarded += chunk.len() as u64;

            if summary.time_to_first_byte_ms.is_none() {
                let elapsed_ms = start.elapsed().as_millis() as u64;
                summary.time_to_first_byte_ms = Some(elapsed_ms);
                if let Some(ref tx) = events {
                    let _ = tx.send(StreamEvent::FirstByte { elapsed_ms }).await;
                }
            }
        }

        if *self.hold_open.read().await {
            cancel.cancelled().await;
            return Err(self.record_abort(TranscodeError::Cancelled).await);
        }

        let truncated = *self.truncate.read().await;
        if truncated && summary.bytes_forwarded == 0 {
            return Err(TranscodeError::pipeline_failed(Some(1), &[]));
        }

        summary.truncated = truncated;
        summary.exit_code = Some(if truncated { 1 } else { 0 });
        summary.duration_ms = start.elapsed().as_millis() as u64;
        Ok(summary)
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;
    use std::time::Duration;

    #[tokio::test]
    async fn test_writes_configured_chunks() {
        let transcoder = MockTranscoder::new();
        transcoder
            .set_chunks(vec![b"abc".to_vec(), b"def".to_vec()])
            .await;

        let mut sink = Vec::new();
        let (tx, mut rx) = mpsc::channel(4);
        let summary = transcoder
            .stream(
                &fixtures::sample_plan(),
                &mut sink,
                &CancellationToken::new(),
                Some(tx),
            )
            .await
            .unwrap();

        assert_eq!(sink, b"abcdef");
        assert_eq!(summary.bytes_forwarded, 6);
        assert!(matches!(rx.recv().await, Some(StreamEvent::FirstByte { .. })));
        assert_eq!(transcoder.stream_count().await, 1);
    }

    #[tokio::test]
    async fn test_error_before_output() {
        let transcoder = MockTranscoder::new();
        transcoder
            .set_next_error(TranscodeError::pipeline_failed(Some(1), &[]))
            .await;

        let mut sink = Vec::new();
        let result = transcoder
            .stream(
                &fixtures::sample_plan(),
                &mut sink,
                &CancellationToken::new(),
                None,
            )
            .await;

        assert!(matches!(result, Err(TranscodeError::PipelineFailed { .. })));
        assert!(sink.is_empty());
    }

    #[tokio::test]
    async fn test_hold_open_until_cancelled() {
        let transcoder = MockTranscoder::new();
        transcoder.set_hold_open(true).await;

        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(50)).await;
            trigger.cancel();
        });

        let mut sink = Vec::new();
        let result = transcoder
            .stream(&fixtures::sample_plan(), &mut sink, &cancel, None)
            .await;

        assert!(matches!(result, Err(TranscodeError::Cancelled)));
        assert_eq!(sink, transcoder.expected_output().await);
        assert_eq!(transcoder.aborted_count().await, 1);
    }
}
