//! Device registry - the set of devices that currently have a worker.
//!
//! The registry is the source of truth for "is this device already being
//! streamed?". Discovery inserts a [`Device`] before spawning its worker; the
//! worker removes it again through a [`RegistrationGuard`] on every exit path,
//! including retry exhaustion and shutdown.
//!
//! # Locking
//!
//! One `std::sync::Mutex` guards the whole map. Every method takes the lock,
//! performs a single map operation and releases it before returning, so the
//! lock is never held across an `.await`.
//!
//! # Panic-Free Guarantees
//!
//! A poisoned lock is recovered with `PoisonError::into_inner`; the map only
//! ever holds fully constructed entries.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use alog_core::{DeviceId, PaletteColor};
use thiserror::Error;
use tokio_util::sync::CancellationToken;
use tracing::debug;

// ============================================================================
// Errors
// ============================================================================

/// Errors that can occur during registry operations.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// A device with this id is already registered
    #[error("device already registered: {0}")]
    DeviceAlreadyPresent(DeviceId),
}

// ============================================================================
// Device
// ============================================================================

/// A device with a live (or starting) worker.
#[derive(Debug, Clone)]
pub struct Device {
    /// Serial number, the registry key
    pub id: DeviceId,

    /// Color of the device name column
    pub color: PaletteColor,

    /// Stops this device's worker; a child of the process-wide shutdown token
    cancel: CancellationToken,
}

impl Device {
    pub fn new(id: DeviceId, color: PaletteColor, cancel: CancellationToken) -> Self {
        Self { id, color, cancel }
    }

    /// Token observed by the device's worker.
    pub fn cancel_token(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Asks the device's worker to stop.
    pub fn stop(&self) {
        self.cancel.cancel();
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Concurrent map of device id to [`Device`].
#[derive(Debug, Default)]
pub struct DeviceRegistry {
    devices: Mutex<HashMap<DeviceId, Device>>,
}

impl DeviceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<DeviceId, Device>> {
        self.devices.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the device registered under `id`.
    pub fn lookup(&self, id: &DeviceId) -> Option<Device> {
        self.lock().get(id).cloned()
    }

    /// Returns true if `id` is registered.
    pub fn contains(&self, id: &DeviceId) -> bool {
        self.lock().contains_key(id)
    }

    /// Registers a device.
    ///
    /// # Errors
    ///
    /// - `RegistryError::DeviceAlreadyPresent` if the id is already registered;
    ///   the existing entry is left untouched.
    pub fn insert(&self, device: Device) -> Result<(), RegistryError> {
        let mut devices = self.lock();
        if devices.contains_key(&device.id) {
            return Err(RegistryError::DeviceAlreadyPresent(device.id));
        }
        devices.insert(device.id.clone(), device);
        Ok(())
    }

    /// Removes a device, returning it. Removing an absent id is a no-op.
    pub fn remove(&self, id: &DeviceId) -> Option<Device> {
        self.lock().remove(id)
    }

    /// Number of registered devices.
    pub fn count(&self) -> usize {
        self.lock().len()
    }

    /// Stops every worker and empties the registry. Used at teardown.
    ///
    /// Returns the number of entries that were still registered.
    pub fn clear(&self) -> usize {
        let drained: Vec<Device> = self.lock().drain().map(|(_, d)| d).collect();
        for device in &drained {
            device.stop();
        }
        drained.len()
    }

    /// Creates a guard that removes `id` from this registry when dropped.
    pub fn guard(self: &Arc<Self>, id: DeviceId) -> RegistrationGuard {
        RegistrationGuard {
            registry: Arc::clone(self),
            id,
            released: false,
        }
    }
}

// ============================================================================
// Registration Guard
// ============================================================================

/// Removes a device from the registry exactly once.
///
/// Owned by the device's worker. Removal happens on [`release`](Self::release)
/// or, failing that, on drop, so an early return or a dropped task still
/// frees the id for rediscovery.
#[derive(Debug)]
pub struct RegistrationGuard {
    registry: Arc<DeviceRegistry>,
    id: DeviceId,
    released: bool,
}

impl RegistrationGuard {
    /// Removes the device now. Returns true if an entry was removed.
    ///
    /// Calling it again is a no-op that returns false.
    pub fn release(&mut self) -> bool {
        if self.released {
            return false;
        }
        self.released = true;
        let removed = self.registry.remove(&self.id).is_some();
        debug!(device = %self.id, removed, "Device unregistered");
        removed
    }
}

impl Drop for RegistrationGuard {
    fn drop(&mut self) {
        self.release();
    }
}
