//! Device discovery - finds attached devices and starts their workers.
//!
//! Polls the bridge's device listing on a fixed period. Every listed id that
//! is not yet in the registry gets the next device color, a registry entry
//! and a worker. Ids that disappear from the listing are left alone; their
//! workers remove them when the stream closes.
//!
//! # Panic-Free Guarantees
//!
//! This module follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Listing errors are logged but never fatal

use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use alog_core::{ColorCycle, DeviceIdPattern, PaletteColor};
use tokio::time::{interval, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;
use tracing::{debug, info, warn};

use crate::registry::Device;
use crate::worker::{spawn_worker, WorkerContext};

// ============================================================================
// Constants
// ============================================================================

/// Default time between device listings.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(3);

/// Lower bound applied to the poll interval (`interval` rejects zero).
const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

// ============================================================================
// Result Type
// ============================================================================

/// Result of one discovery pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiscoveryResult {
    /// Devices registered and handed to a new worker
    pub discovered: u32,
    /// Listed devices that already had a worker
    pub known: u32,
    /// Listing failures
    pub failed: u32,
}

// ============================================================================
// Discovery Service
// ============================================================================

/// Periodic device discovery.
///
/// Owns the device color cursor; workers are spawned on the shared
/// [`TaskTracker`] so the engine can wait for them at shutdown.
pub struct DiscoveryService {
    ctx: WorkerContext,
    pattern: DeviceIdPattern,
    device_colors: Mutex<ColorCycle>,
    tracker: TaskTracker,
    shutdown: CancellationToken,
    poll_interval: Duration,
}

impl DiscoveryService {
    /// Creates a discovery service with the default poll interval.
    #[must_use]
    pub fn new(
        ctx: WorkerContext,
        pattern: DeviceIdPattern,
        tracker: TaskTracker,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            ctx,
            pattern,
            device_colors: Mutex::new(ColorCycle::new()),
            tracker,
            shutdown,
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }

    /// Overrides the poll interval.
    #[must_use]
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    fn next_device_color(&self) -> PaletteColor {
        self.device_colors
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .advance()
    }

    /// Runs one discovery pass.
    ///
    /// Lists devices, registers unseen ones and spawns their workers.
    /// Errors are logged and counted, never returned.
    pub async fn discover(&self) -> DiscoveryResult {
        let mut result = DiscoveryResult::default();

        let listing = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => return result,
            listing = self.ctx.bridge.list_devices() => listing,
        };

        let listing = match listing {
            Ok(listing) => listing,
            Err(e) => {
                warn!(error = %e, "Failed to list devices");
                result.failed += 1;
                return result;
            }
        };

        for id in self.pattern.extract(&listing) {
            if self.shutdown.is_cancelled() {
                break;
            }

            if self.ctx.registry.contains(&id) {
                result.known += 1;
                continue;
            }

            let color = self.next_device_color();
            let device = Device::new(id.clone(), color, self.shutdown.child_token());

            if let Err(e) = self.ctx.registry.insert(device.clone()) {
                debug!(error = %e, "Device registered concurrently, skipping");
                result.known += 1;
                continue;
            }

            info!(device = %id, color = %color, "Device attached");
            spawn_worker(&self.tracker, self.ctx.clone(), device);
            result.discovered += 1;
        }

        result
    }

    /// Polls until shutdown. The first pass runs immediately.
    pub async fn run(self) {
        let mut tick = interval(self.poll_interval.max(MIN_POLL_INTERVAL));
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(
            interval_secs = self.poll_interval.as_secs_f64(),
            "Device discovery started"
        );

        loop {
            tokio::select! {
                biased;

                _ = self.shutdown.cancelled() => {
                    info!("Device discovery shutting down");
                    break;
                }

                _ = tick.tick() => {
                    let result = self.discover().await;
                    if result.discovered > 0 || result.failed > 0 {
                        debug!(
                            discovered = result.discovered,
                            known = result.known,
                            failed = result.failed,
                            "Discovery pass complete"
                        );
                    }
                }
            }
        }

        debug!("Device discovery task completed");
    }
}

/// Spawns the discovery loop.
pub fn spawn_discovery_task(service: DiscoveryService) -> tokio::task::JoinHandle<()> {
    tokio::spawn(service.run())
}
