//! FFmpeg-based streaming pipeline.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex_lite::Regex;
use std::collections::VecDeque;
use std::process::Stdio;
use std::time::{Duration, Instant};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};

use super::config::TranscoderConfig;
use super::error::TranscodeError;
use super::traits::Transcoder;
use super::types::{PipelineCommand, PipelinePlan, StreamEvent, StreamSummary, TranscodeProgress};
use crate::metrics::{
    BYTES_FORWARDED, PIPELINES_ACTIVE, PIPELINES_STARTED, PIPELINE_RESULTS, TIME_TO_FIRST_BYTE,
};

static FRAME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"frame=\s*(\d+)").unwrap());
static TIME_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"time=\s*(\S+)").unwrap());
static SPEED_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"speed=\s*(\S+)").unwrap());

const PROGRESS_EVENT_INTERVAL: Duration = Duration::from_millis(500);

/// FFmpeg-based [`Transcoder`].
pub struct FfmpegStreamer {
    config: TranscoderConfig,
}

impl FfmpegStreamer {
    /// Creates a new FFmpeg streamer with the given configuration.
    pub fn new(config: TranscoderConfig) -> Self {
        Self { config }
    }

    /// Builds the full ffmpeg invocation for a plan.
    pub fn build_command(&self, plan: &PipelinePlan) -> PipelineCommand {
        let mut args = vec![
            "-hide_banner".to_string(),
            "-loglevel".to_string(),
            self.config.log_level.clone(),
            "-threads".to_string(),
            self.config.threads.to_string(),
        ];

        args.extend(plan.to_args());

        // Extra args
        args.extend(self.config.extra_args.iter().cloned());

        // Output
        args.extend(plan.output.to_args());

        PipelineCommand::new(self.config.ffmpeg_path.clone(), args)
    }

    /// Runs an arbitrary command as a pipeline, forwarding its stdout to `sink`.
    pub async fn run_command(
        &self,
        command: &PipelineCommand,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        cancel: &CancellationToken,
        events: Option<mpsc::Sender<StreamEvent>>,
    ) -> Result<StreamSummary, TranscodeError> {
        let start = Instant::now();
        debug!(command = %command, "Starting pipeline");

        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfmpegNotFound {
                        path: command.program.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        let _active = ActivePipeline::enter();

        let (Some(stdout), Some(stderr)) = (child.stdout.take(), child.stderr.take()) else {
            return Err(TranscodeError::Io(std::io::Error::other(
                "pipeline stdio was not captured",
            )));
        };

        let mut drain = tokio::spawn(drain_diagnostics(
            stderr,
            events.clone(),
            self.config.stderr_tail_lines,
        ));

        let mut state = ForwardState::default();
        let forwarded = tokio::select! {
            result = forward(
                stdout,
                sink,
                self.config.read_chunk_bytes,
                start,
                &mut state,
                events.as_ref(),
            ) => Some(result),
            _ = cancel.cancelled() => None,
        };

        let status = match forwarded {
            None => return Err(abort(child, drain, &state, TranscodeError::Cancelled).await),
            Some(Err(ForwardError::Sink(e))) => {
                debug!(error = %e, "Client sink closed");
                return Err(abort(child, drain, &state, TranscodeError::SinkClosed(e)).await);
            }
            Some(Err(ForwardError::Read(e))) => {
                return Err(abort(child, drain, &state, TranscodeError::Io(e)).await);
            }
            Some(Ok(())) => {
                let exited = tokio::select! {
                    status = child.wait() => Some(status),
                    _ = cancel.cancelled() => None,
                };
                match exited {
                    Some(status) => status?,
                    None => {
                        return Err(abort(child, drain, &state, TranscodeError::Cancelled).await)
                    }
                }
            }
        };

        // Descendants of the pipeline may keep stderr open after it exits.
        let joined = tokio::select! {
            tail = &mut drain => Some(tail.unwrap_or_default()),
            _ = cancel.cancelled() => None,
        };
        let Some(stderr_tail) = joined else {
            return Err(abort(child, drain, &state, TranscodeError::Cancelled).await);
        };

        let summary = StreamSummary {
            bytes_forwarded: state.bytes,
            time_to_first_byte_ms: state.first_byte.map(|d| d.as_millis() as u64),
            duration_ms: start.elapsed().as_millis() as u64,
            exit_code: status.code(),
            truncated: !status.success(),
        };

        if status.success() {
            PIPELINE_RESULTS.with_label_values(&["completed"]).inc();
            info!(
                bytes = summary.bytes_forwarded,
                duration_ms = summary.duration_ms,
                "Pipeline completed"
            );
            Ok(summary)
        } else if state.bytes == 0 {
            PIPELINE_RESULTS.with_label_values(&["failed"]).inc();
            error!(
                exit_code = ?status.code(),
                stderr = %stderr_tail.join("\n"),
                "Pipeline failed before producing output"
            );
            Err(TranscodeError::pipeline_failed(status.code(), &stderr_tail))
        } else {
            // Headers are already committed; the client sees a short stream.
            PIPELINE_RESULTS.with_label_values(&["truncated"]).inc();
            warn!(
                exit_code = ?status.code(),
                bytes = summary.bytes_forwarded,
                stderr = %stderr_tail.join("\n"),
                "Pipeline failed after output started"
            );
            Ok(summary)
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegStreamer {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn stream(
        &self,
        plan: &PipelinePlan,
        sink: &mut (dyn AsyncWrite + Send + Unpin),
        cancel: &CancellationToken,
        events: Option<mpsc::Sender<StreamEvent>>,
    ) -> Result<StreamSummary, TranscodeError> {
        let video = if plan.video.is_copy() { "copy" } else { "encode" };
        let audio = if plan.audio.is_copy() { "copy" } else { "encode" };
        PIPELINES_STARTED.with_label_values(&[video, audio]).inc();
        info!(
            video_format = %plan.video_format_id,
            audio_format = ?plan.audio_format_id,
            video,
            audio,
            separate_audio = plan.has_separate_audio_input(),
            "Starting ffmpeg pipeline"
        );

        let command = self.build_command(plan);
        self.run_command(&command, sink, cancel, events).await
    }

    async fn validate(&self) -> Result<(), TranscodeError> {
        let output = Command::new(&self.config.ffmpeg_path)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    TranscodeError::FfmpegNotFound {
                        path: self.config.ffmpeg_path.clone(),
                    }
                } else {
                    TranscodeError::Io(e)
                }
            })?;

        if !output.status.success() {
            return Err(TranscodeError::FfmpegNotFound {
                path: self.config.ffmpeg_path.clone(),
            });
        }

        Ok(())
    }
}

/// Keeps the active pipelines gauge accurate on every exit path.
struct ActivePipeline;

impl ActivePipeline {
    fn enter() -> Self {
        PIPELINES_ACTIVE.inc();
        Self
    }
}

impl Drop for ActivePipeline {
    fn drop(&mut self) {
        PIPELINES_ACTIVE.dec();
    }
}

#[derive(Debug, Default)]
struct ForwardState {
    bytes: u64,
    first_byte: Option<Duration>,
}

enum ForwardError {
    Read(std::io::Error),
    Sink(std::io::Error),
}

/// Copies `reader` into `sink` chunk by chunk, flushing after each write.
async fn forward<R: AsyncRead + Unpin>(
    mut reader: R,
    sink: &mut (dyn AsyncWrite + Send + Unpin),
    chunk_size: usize,
    start: Instant,
    state: &mut ForwardState,
    events: Option<&mpsc::Sender<StreamEvent>>,
) -> Result<(), ForwardError> {
    let mut buf = vec![0u8; chunk_size.max(1)];

    loop {
        let n = reader.read(&mut buf).await.map_err(ForwardError::Read)?;
        if n == 0 {
            return Ok(());
        }

        sink.write_all(&buf[..n]).await.map_err(ForwardError::Sink)?;
        sink.flush().await.map_err(ForwardError::Sink)?;
        state.bytes += n as u64;
        BYTES_FORWARDED.inc_by(n as u64);

        if state.first_byte.is_none() {
            let elapsed = start.elapsed();
            state.first_byte = Some(elapsed);
            TIME_TO_FIRST_BYTE
                .with_label_values(&[])
                .observe(elapsed.as_secs_f64());
            info!(ttfb_ms = elapsed.as_millis() as u64, "First byte sent to client");

            if let Some(tx) = events {
                let _ = tx
                    .send(StreamEvent::FirstByte {
                        elapsed_ms: elapsed.as_millis() as u64,
                    })
                    .await;
            }
        }
    }
}

/// Kills the pipeline after an early exit and reports `reason`.
async fn abort(
    mut child: Child,
    drain: JoinHandle<Vec<String>>,
    state: &ForwardState,
    reason: TranscodeError,
) -> TranscodeError {
    if let Err(e) = child.start_kill() {
        debug!(error = %e, "Pipeline already exited");
    }
    let _ = child.wait().await;
    // Descendants of the pipeline may still hold stderr open.
    drain.abort();
    let _ = drain.await;

    PIPELINE_RESULTS.with_label_values(&[reason.kind()]).inc();
    info!(
        reason = %reason,
        bytes = state.bytes,
        "Pipeline stopped early"
    );
    reason
}

/// Reads pipeline diagnostics until EOF, returning the last `tail_capacity`
/// lines. Lines end at either CR or LF since progress updates use bare CRs.
async fn drain_diagnostics<R: AsyncRead + Unpin>(
    mut reader: R,
    events: Option<mpsc::Sender<StreamEvent>>,
    tail_capacity: usize,
) -> Vec<String> {
    let mut tail = DiagnosticTail::new(tail_capacity, events);
    let mut line = Vec::new();
    let mut buf = [0u8; 4096];

    loop {
        let n = match reader.read(&mut buf).await {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                debug!(error = %e, "Stopped reading pipeline diagnostics");
                break;
            }
        };

        for &byte in &buf[..n] {
            if byte == b'\r' || byte == b'\n' {
                tail.push(&line);
                line.clear();
            } else {
                line.push(byte);
            }
        }
    }
    tail.push(&line);

    tail.into_lines()
}

struct DiagnosticTail {
    lines: VecDeque<String>,
    capacity: usize,
    events: Option<mpsc::Sender<StreamEvent>>,
    last_progress_event: Option<Instant>,
}

impl DiagnosticTail {
    fn new(capacity: usize, events: Option<mpsc::Sender<StreamEvent>>) -> Self {
        Self {
            lines: VecDeque::with_capacity(capacity),
            capacity,
            events,
            last_progress_event: None,
        }
    }

    fn push(&mut self, raw: &[u8]) {
        let text = String::from_utf8_lossy(raw);
        let line = text.trim();
        if line.is_empty() {
            return;
        }

        if line.contains("speed=") {
            let progress = parse_progress(line);
            debug!(
                frame = ?progress.frame,
                time = ?progress.time,
                speed = ?progress.speed,
                "Pipeline progress"
            );
            self.send_progress(progress);
        } else {
            trace!(line = %line, "ffmpeg");
        }

        if self.capacity == 0 {
            return;
        }
        if self.lines.len() == self.capacity {
            self.lines.pop_front();
        }
        self.lines.push_back(line.to_string());
    }

    fn send_progress(&mut self, progress: TranscodeProgress) {
        let Some(ref tx) = self.events else {
            return;
        };
        let due = self
            .last_progress_event
            .map_or(true, |t| t.elapsed() >= PROGRESS_EVENT_INTERVAL);
        if due {
            // Non-blocking send
            let _ = tx.try_send(StreamEvent::Progress(progress));
            self.last_progress_event = Some(Instant::now());
        }
    }

    fn into_lines(self) -> Vec<String> {
        self.lines.into()
    }
}

/// Parses an ffmpeg status line such as
/// `frame=  240 fps= 48 q=-1.0 size=1024kB time=00:00:08.00 bitrate=1048.6kbits/s speed=1.6x`.
pub fn parse_progress(line: &str) -> TranscodeProgress {
    let capture = |re: &Regex| {
        re.captures(line)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    };

    TranscodeProgress {
        frame: capture(&FRAME_REGEX).and_then(|f| f.parse().ok()),
        time: capture(&TIME_REGEX),
        speed: capture(&SPEED_REGEX),
    }
}
