//! Trait definitions for the transcoder module.

use async_trait::async_trait;
use tokio::io::AsyncWrite;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use super::error::TranscodeError;
use super::types::{PipelinePlan, StreamEvent, StreamSummary};

/// Runs pipeline plans, streaming their output into a sink.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Returns the name of this transcoder implementation.
    fn name(&self) -> &str;

    /// Runs `plan` and forwards its output to `sink` until the pipeline ends,
    /// `cancel` fires, or the sink stops accepting bytes.
    ///
    /// If `events` is given it receives [`StreamEvent::FirstByte`] once and
    /// best-effort progress updates. A dropped receiver is ignored.
    async fn stream(
        &self,
        plan: &PipelinePlan,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        cancel: &CancellationToken,
        events: Option<mpsc::Sender<StreamEvent>>,
    ) -> Result<StreamSummary, TranscodeError>;

    /// Validates that the transcoder is properly configured and ready.
    async fn validate(&self) -> Result<(), TranscodeError>;
}
