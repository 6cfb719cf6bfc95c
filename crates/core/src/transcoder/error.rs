//! Error types for the transcoder module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while running a streaming pipeline.
#[derive(Debug, Error)]
pub enum TranscodeError {
    /// FFmpeg binary not found.
    #[error("FFmpeg not found at path: {path}")]
    FfmpegNotFound { path: PathBuf },

    /// The pipeline exited non-zero before any output was forwarded.
    #[error("Pipeline failed with exit code {exit_code:?}")]
    PipelineFailed {
        exit_code: Option<i32>,
        stderr: Option<String>,
    },

    /// I/O error talking to the pipeline.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The client-facing sink stopped accepting bytes.
    #[error("Client sink closed: {0}")]
    SinkClosed(std::io::Error),

    /// The caller's execution context was cancelled.
    #[error("Pipeline cancelled")]
    Cancelled,
}

impl TranscodeError {
    /// Creates a new pipeline failed error from collected stderr lines.
    pub fn pipeline_failed(exit_code: Option<i32>, stderr_tail: &[String]) -> Self {
        Self::PipelineFailed {
            exit_code,
            stderr: if stderr_tail.is_empty() {
                None
            } else {
                Some(stderr_tail.join("\n"))
            },
        }
    }

    /// Whether the failure came from the caller going away rather than the pipeline.
    pub fn is_client_gone(&self) -> bool {
        matches!(self, Self::Cancelled | Self::SinkClosed(_))
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::FfmpegNotFound { .. } | Self::PipelineFailed { .. } | Self::Io(_) => "failed",
            Self::SinkClosed(_) => "sink_closed",
            Self::Cancelled => "cancelled",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_pipeline_failed_collects_stderr() {
        let err = TranscodeError::pipeline_failed(
            Some(1),
            &[
                "Input #0, mov,mp4,m4a".to_string(),
                "Server returned 403 Forbidden".to_string(),
            ],
        );
        match err {
            TranscodeError::PipelineFailed { exit_code, stderr } => {
                assert_eq!(exit_code, Some(1));
                assert_eq!(
                    stderr.as_deref(),
                    Some("Input #0, mov,mp4,m4a\nServer returned 403 Forbidden")
                );
            }
            other => panic!("unexpected error: {:?}", other),
        }

        let empty = TranscodeError::pipeline_failed(None, &[]);
        assert!(matches!(
            empty,
            TranscodeError::PipelineFailed { stderr: None, .. }
        ));
    }

    #[test]
    fn test_client_gone() {
        assert!(TranscodeError::Cancelled.is_client_gone());
        assert!(TranscodeError::SinkClosed(std::io::ErrorKind::BrokenPipe.into()).is_client_gone());
        assert!(!TranscodeError::pipeline_failed(Some(1), &[]).is_client_gone());
    }
}
