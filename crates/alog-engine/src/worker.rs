//! Per-device log worker.
//!
//! One worker runs per registered device. It opens the device's log stream
//! (retrying a bounded number of times), then turns every line into a
//! colorized record until the stream ends or the device is cancelled.
//!
//! The worker owns the device's [`RegistrationGuard`], so the registry entry
//! is removed on every exit path, including retry exhaustion. A device that
//! comes back is picked up by discovery as a fresh device.
//!
//! # Cancellation
//!
//! Reads, console writes and retry delays are raced against the device's
//! cancellation token, so shutdown never waits for the next log line or for
//! a stalled console.

use std::sync::Arc;
use std::time::Duration;

use alog_core::{DeviceId, LogLineParser};
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tokio_util::task::TaskTracker;
use tracing::{debug, error, info, warn};

use crate::bridge::{DeviceBridge, LogStream};
use crate::output::OutputSink;
use crate::registry::{Device, DeviceRegistry, RegistrationGuard};
use crate::render::render_record;
use crate::tags::TagColors;

// ============================================================================
// Constants
// ============================================================================

/// Default number of attempts to open a device's log stream.
pub const DEFAULT_OPEN_ATTEMPTS: u32 = 10;

/// Default delay between failed open attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

// ============================================================================
// Context
// ============================================================================

/// Retry policy for opening a stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Total attempts, including the first
    pub open_attempts: u32,
    pub retry_delay: Duration,
}

impl Default for WorkerSettings {
    fn default() -> Self {
        Self {
            open_attempts: DEFAULT_OPEN_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
        }
    }
}

/// Everything a worker shares with the rest of the engine.
///
/// Cheap to clone; every field is reference-counted.
#[derive(Clone)]
pub struct WorkerContext {
    pub bridge: Arc<dyn DeviceBridge>,
    pub registry: Arc<DeviceRegistry>,
    pub tags: Arc<TagColors>,
    pub output: Arc<OutputSink>,
    pub parser: Arc<LogLineParser>,
    pub settings: WorkerSettings,
}

impl WorkerContext {
    pub fn new(
        bridge: Arc<dyn DeviceBridge>,
        registry: Arc<DeviceRegistry>,
        tags: Arc<TagColors>,
        output: Arc<OutputSink>,
        parser: Arc<LogLineParser>,
        settings: WorkerSettings,
    ) -> Self {
        Self {
            bridge,
            registry,
            tags,
            output,
            parser,
            settings,
        }
    }
}

// ============================================================================
// Outcome
// ============================================================================

/// Why a worker stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerExit {
    /// The device's stream closed (device unplugged or `adb` exited)
    StreamEnded,
    /// Shutdown or device cancellation
    Cancelled,
    /// Every open attempt failed
    OpenFailed,
    /// Reading the stream failed
    ReadFailed,
    /// The console could not be written
    OutputClosed,
}

/// Summary of one worker's lifetime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerOutcome {
    pub device: DeviceId,
    pub exit: WorkerExit,
    /// Open attempts made
    pub attempts: u32,
    /// Records written to the console
    pub records: u64,
    /// Lines that did not parse
    pub rejected: u64,
    /// Records with at least one truncated field
    pub truncated: u64,
}

impl WorkerOutcome {
    fn new(device: DeviceId) -> Self {
        Self {
            device,
            exit: WorkerExit::StreamEnded,
            attempts: 0,
            records: 0,
            rejected: 0,
            truncated: 0,
        }
    }
}

// ============================================================================
// Worker
// ============================================================================

/// Streams one device's log to the shared console.
pub struct DeviceWorker {
    ctx: WorkerContext,
    device: Device,
    guard: RegistrationGuard,
}

impl DeviceWorker {
    /// Creates a worker for a device that is already registered.
    ///
    /// The registration guard is taken here, so the entry is removed even if
    /// the worker is dropped without running.
    pub fn new(ctx: WorkerContext, device: Device) -> Self {
        let guard = ctx.registry.guard(device.id.clone());
        Self { ctx, device, guard }
    }

    /// Runs the worker to completion.
    pub async fn run(mut self) -> WorkerOutcome {
        let mut outcome = WorkerOutcome::new(self.device.id.clone());

        if let Some(mut stream) = self.open_with_retry(&mut outcome).await {
            info!(device = %self.device.id, attempts = outcome.attempts, "Streaming device log");
            outcome.exit = self.pump(&mut stream, &mut outcome).await;
            // Dropping the stream kills the logcat process
            drop(stream);
        }

        let removed = self.guard.release();
        debug!(
            device = %outcome.device,
            exit = ?outcome.exit,
            records = outcome.records,
            rejected = outcome.rejected,
            truncated = outcome.truncated,
            removed,
            "Device worker finished"
        );
        if outcome.exit == WorkerExit::StreamEnded {
            info!(device = %outcome.device, "Device disconnected");
        }

        outcome
    }

    /// Opens the stream, one open per attempt.
    ///
    /// Returns `None` (with `outcome.exit` set) if every attempt failed or the
    /// device was cancelled while waiting.
    async fn open_with_retry(&self, outcome: &mut WorkerOutcome) -> Option<LogStream> {
        let id = &self.device.id;
        let cancel = self.device.cancel_token();
        let max_attempts = self.ctx.settings.open_attempts.max(1);

        loop {
            if cancel.is_cancelled() {
                outcome.exit = WorkerExit::Cancelled;
                return None;
            }

            outcome.attempts += 1;
            let opened = tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome.exit = WorkerExit::Cancelled;
                    return None;
                }
                opened = self.ctx.bridge.open_log_stream(id) => opened,
            };

            let err = match opened {
                Ok(stream) => return Some(stream),
                Err(e) => e,
            };

            if outcome.attempts >= max_attempts {
                error!(
                    device = %id,
                    attempts = outcome.attempts,
                    error = %err,
                    "Failed to start log stream, giving up on device"
                );
                outcome.exit = WorkerExit::OpenFailed;
                return None;
            }

            warn!(
                device = %id,
                attempt = outcome.attempts,
                max_attempts,
                error = %err,
                "Failed to open log stream, retrying"
            );

            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    outcome.exit = WorkerExit::Cancelled;
                    return None;
                }
                _ = sleep(self.ctx.settings.retry_delay) => {}
            }
        }
    }

    /// Reads lines until end of stream, cancellation or an I/O failure.
    async fn pump(&self, stream: &mut LogStream, outcome: &mut WorkerOutcome) -> WorkerExit {
        let cancel = self.device.cancel_token();

        loop {
            let next = tokio::select! {
                biased;
                _ = cancel.cancelled() => return WorkerExit::Cancelled,
                next = stream.next_line() => next,
            };

            let raw = match next {
                Ok(Some(raw)) => raw,
                Ok(None) => return WorkerExit::StreamEnded,
                Err(e) => {
                    warn!(device = %self.device.id, error = %e, "Failed to read log stream");
                    return WorkerExit::ReadFailed;
                }
            };

            let line = match self.ctx.parser.parse(&raw) {
                Ok(line) => line,
                Err(_) => {
                    outcome.rejected += 1;
                    warn!(device = %self.device.id, line = %raw, "Received line that did not match pattern");
                    continue;
                }
            };

            let tag_color = self.ctx.tags.resolve(&line.tag);
            let record = render_record(&self.device.id, self.device.color, &line, tag_color);

            let written = tokio::select! {
                biased;
                _ = cancel.cancelled() => return WorkerExit::Cancelled,
                written = self.ctx.output.write_record(&record) => written,
            };

            if let Err(e) = written {
                error!(device = %self.device.id, error = %e, "Failed to write to console");
                return WorkerExit::OutputClosed;
            }

            outcome.records += 1;
            if line.truncated {
                outcome.truncated += 1;
            }
        }
    }
}

/// Spawns a worker for `device` on `tracker`.
pub fn spawn_worker(
    tracker: &TaskTracker,
    ctx: WorkerContext,
    device: Device,
) -> JoinHandle<WorkerOutcome> {
    let worker = DeviceWorker::new(ctx, device);
    tracker.spawn(worker.run())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings() {
        let settings = WorkerSettings::default();
        assert_eq!(settings.open_attempts, 10);
        assert_eq!(settings.retry_delay, Duration::from_secs(1));
    }

    #[test]
    fn test_outcome_starts_empty() {
        let outcome = WorkerOutcome::new(DeviceId::new("abc"));
        assert_eq!(outcome.attempts, 0);
        assert_eq!(outcome.records, 0);
        assert_eq!(outcome.rejected, 0);
        assert_eq!(outcome.exit, WorkerExit::StreamEnded);
    }
}
