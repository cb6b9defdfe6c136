//! Engine - wires the shared registries, discovery and workers together.
//!
//! # Lifecycle
//!
//! 1. [`Engine::new`] validates the tunables, compiles the line and device
//!    patterns (fatal on failure) and creates the process-scoped registries,
//!    pre-seeding the tag colors.
//! 2. [`Engine::run`] starts discovery, reports "waiting on device" if the
//!    warm-up window passes with nothing registered, and waits for shutdown.
//! 3. On shutdown it joins discovery and every worker, then tears the
//!    registries down.
//!
//! One task runs per attached device. The count is unbounded by design and
//! bounded in practice by the hardware plugged into the host.

use std::sync::Arc;
use std::time::Duration;

use alog_core::{DeviceIdPattern, DomainError, LogLineParser};
use thiserror::Error;
use tokio::time::sleep;
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::bridge::DeviceBridge;
use crate::config::{ConfigError, EngineConfig};
use crate::discovery::{spawn_discovery_task, DiscoveryService};
use crate::output::OutputSink;
use crate::registry::DeviceRegistry;
use crate::tags::TagColors;
use crate::worker::WorkerContext;

/// Default time the first discovery pass gets before "no devices" is reported.
pub const DEFAULT_WARMUP: Duration = Duration::from_secs(1);

/// Errors that prevent the engine from starting.
#[derive(Debug, Error)]
pub enum EngineError {
    /// A built-in pattern failed to compile
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// A tunable is out of range
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Totals reported when the engine stops.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EngineSummary {
    /// Records written to the console
    pub records_written: u64,
    /// Distinct tags with an assigned color (including seeded ones)
    pub tags_colored: usize,
    /// Registry entries still present at teardown
    pub devices_at_shutdown: usize,
}

/// The device lifecycle engine.
pub struct Engine {
    config: EngineConfig,
    ctx: WorkerContext,
    pattern: DeviceIdPattern,
}

impl Engine {
    /// Builds an engine.
    ///
    /// # Errors
    ///
    /// - `EngineError::Config` if a tunable is out of range
    /// - `EngineError::Domain` if a built-in pattern does not compile
    pub fn new(
        config: EngineConfig,
        bridge: Arc<dyn DeviceBridge>,
        output: Arc<OutputSink>,
    ) -> Result<Self, EngineError> {
        config.validate()?;

        let parser = Arc::new(LogLineParser::new()?);
        let pattern = DeviceIdPattern::new()?;

        let ctx = WorkerContext::new(
            bridge,
            Arc::new(DeviceRegistry::new()),
            Arc::new(TagColors::new()),
            output,
            parser,
            config.worker_settings(),
        );

        Ok(Self {
            config,
            ctx,
            pattern,
        })
    }

    /// The device registry shared with discovery and workers.
    pub fn registry(&self) -> &Arc<DeviceRegistry> {
        &self.ctx.registry
    }

    /// The tag color map shared with workers.
    pub fn tags(&self) -> &Arc<TagColors> {
        &self.ctx.tags
    }

    /// Runs until `shutdown` is cancelled, then joins all tasks and tears down.
    pub async fn run(self, shutdown: CancellationToken) -> EngineSummary {
        let tracker = TaskTracker::new();

        let discovery = DiscoveryService::new(
            self.ctx.clone(),
            self.pattern.clone(),
            tracker.clone(),
            shutdown.clone(),
        )
        .with_poll_interval(self.config.poll_interval);
        let discovery_handle = spawn_discovery_task(discovery);

        // Give the immediate first pass a moment before saying nothing is attached
        tokio::select! {
            biased;
            _ = shutdown.cancelled() => {}
            _ = sleep(self.config.warmup) => {
                if self.ctx.registry.count() == 0 {
                    info!("Waiting on device to connect");
                }
            }
        }

        shutdown.cancelled().await;
        info!("Engine shutting down");

        if let Err(e) = discovery_handle.await {
            warn!(error = %e, "Discovery task failed");
        }

        tracker.close();
        tracker.wait().await;
        debug!("All device workers stopped");

        let summary = EngineSummary {
            records_written: self.ctx.output.records_written(),
            tags_colored: self.ctx.tags.len(),
            devices_at_shutdown: self.ctx.registry.clear(),
        };
        self.ctx.tags.clear();

        info!(
            records = summary.records_written,
            tags = summary.tags_colored,
            "Engine stopped"
        );
        summary
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bridge::AdbBridge;

    #[test]
    fn test_new_rejects_invalid_config() {
        let config = EngineConfig {
            open_attempts: 0,
            ..EngineConfig::default()
        };
        let result = Engine::new(
            config,
            Arc::new(AdbBridge::new("adb")),
            Arc::new(OutputSink::new(std::io::sink()).unwrap()),
        );
        assert!(matches!(result, Err(EngineError::Config(_))));
    }

    #[test]
    fn test_new_seeds_tags() {
        let engine = Engine::new(
            EngineConfig::default(),
            Arc::new(AdbBridge::new("adb")),
            Arc::new(OutputSink::new(std::io::sink()).unwrap()),
        )
        .unwrap();

        assert_eq!(engine.tags().len(), 4);
        assert_eq!(engine.registry().count(), 0);
    }
}
