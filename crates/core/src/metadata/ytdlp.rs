//! yt-dlp based prober implementation.

use async_trait::async_trait;
use std::process::{ExitStatus, Stdio};
use std::time::Instant;
use tokio::process::Command;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use super::config::ProberConfig;
use super::error::FetchError;
use super::traits::MetadataProber;
use super::types::MediaMetadata;

/// Prober that shells out to `yt-dlp -J --no-playlist`.
pub struct YtDlpProber {
    config: ProberConfig,
}

impl YtDlpProber {
    /// Creates a new prober with the given configuration.
    pub fn new(config: ProberConfig) -> Self {
        Self { config }
    }

    /// Builds the argument list for a single probe.
    fn build_args(&self, locator: &str) -> Vec<String> {
        let mut args = self.config.extra_args.clone();
        args.extend([
            "-J".to_string(),
            "--no-playlist".to_string(),
            locator.to_string(),
        ]);
        args
    }

    /// Maps a non-zero prober exit onto the error taxonomy.
    fn classify_failure(&self, locator: &str, status: ExitStatus, stderr: &str) -> FetchError {
        let unavailable = self
            .config
            .not_found_markers
            .iter()
            .any(|marker| stderr.contains(marker.as_str()));

        if unavailable {
            return FetchError::NotFound {
                locator: locator.to_string(),
            };
        }

        FetchError::fetch_failed(
            format!("yt-dlp exited with code: {:?}", status.code()),
            if stderr.trim().is_empty() {
                None
            } else {
                Some(stderr.trim().to_string())
            },
        )
    }

    /// Parses yt-dlp JSON output into MediaMetadata.
    fn parse_output(stdout: &[u8]) -> Result<MediaMetadata, FetchError> {
        serde_json::from_slice(stdout)
            .map_err(|e| FetchError::parse_failed(format!("Failed to parse yt-dlp output: {}", e)))
    }

    fn spawn_error(&self, e: std::io::Error) -> FetchError {
        if e.kind() == std::io::ErrorKind::NotFound {
            FetchError::ProberNotFound {
                path: self.config.ytdlp_path.clone(),
            }
        } else {
            FetchError::Io(e)
        }
    }
}

#[async_trait]
impl MetadataProber for YtDlpProber {
    fn name(&self) -> &str {
        "yt-dlp"
    }

    async fn probe(
        &self,
        locator: &str,
        cancel: &CancellationToken,
    ) -> Result<MediaMetadata, FetchError> {
        let start = Instant::now();
        let args = self.build_args(locator);
        debug!(locator = %locator, "Running yt-dlp");

        // kill_on_drop terminates the prober if the wait below is abandoned.
        let child = Command::new(&self.config.ytdlp_path)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| self.spawn_error(e))?;

        let output = tokio::select! {
            output = child.wait_with_output() => output?,
            _ = cancel.cancelled() => {
                debug!(locator = %locator, "yt-dlp cancelled");
                return Err(FetchError::Cancelled);
            }
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            let err = self.classify_failure(locator, output.status, &stderr);
            if !err.is_not_found() {
                warn!(
                    locator = %locator,
                    code = ?output.status.code(),
                    stderr = %stderr.trim(),
                    "yt-dlp failed"
                );
            }
            return Err(err);
        }

        let metadata = Self::parse_output(&output.stdout)?;
        debug!(
            locator = %locator,
            id = %metadata.id,
            formats = metadata.formats.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "yt-dlp finished"
        );
        Ok(metadata)
    }

    async fn validate(&self) -> Result<(), FetchError> {
        let output = Command::new(&self.config.ytdlp_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            return Err(FetchError::fetch_failed(
                "yt-dlp --version failed",
                Some(String::from_utf8_lossy(&output.stderr).to_string()),
            ));
        }

        Ok(())
    }
}
