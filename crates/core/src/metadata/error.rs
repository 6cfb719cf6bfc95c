//! Error types for the metadata module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while fetching resource metadata.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The prober reported that the resource does not exist or is unavailable.
    #[error("Resource not found: {locator}")]
    NotFound { locator: String },

    /// The prober binary could not be started.
    #[error("Prober not found at path: {path}")]
    ProberNotFound { path: PathBuf },

    /// The prober exited abnormally for any other reason.
    #[error("Metadata fetch failed: {reason}")]
    FetchFailed {
        reason: String,
        stderr: Option<String>,
    },

    /// The prober output did not parse into the expected structure.
    #[error("Failed to parse metadata: {reason}")]
    ParseFailed { reason: String },

    /// I/O error while talking to the prober.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The caller went away before the prober finished.
    #[error("Metadata fetch cancelled")]
    Cancelled,
}

impl FetchError {
    /// Creates a new fetch failed error with optional stderr output.
    pub fn fetch_failed(reason: impl Into<String>, stderr: Option<String>) -> Self {
        Self::FetchFailed {
            reason: reason.into(),
            stderr,
        }
    }

    /// Creates a new parse failed error.
    pub fn parse_failed(reason: impl Into<String>) -> Self {
        Self::ParseFailed {
            reason: reason.into(),
        }
    }

    /// Whether the resource itself is known to be unavailable.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }

    /// Short label used for metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::NotFound { .. } => "not_found",
            Self::ProberNotFound { .. } | Self::FetchFailed { .. } | Self::Io(_) => "fetch_failed",
            Self::ParseFailed { .. } => "parse_failed",
            Self::Cancelled => "cancelled",
        }
    }
}
