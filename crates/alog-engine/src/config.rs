//! Engine tunables.
//!
//! The binary always runs with [`EngineConfig::default`], whose values are
//! the fixed constants (`adb` on `PATH`, 3 s poll, 10 open attempts 1 s
//! apart, 1 s warm-up). The struct exists so the engine can be built with
//! shorter timings in tests; nothing is read from files, flags or the
//! environment.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

use crate::discovery::DEFAULT_POLL_INTERVAL;
use crate::engine::DEFAULT_WARMUP;
use crate::worker::{WorkerSettings, DEFAULT_OPEN_ATTEMPTS, DEFAULT_RETRY_DELAY};

/// `adb` executable, looked up on `PATH`.
pub const DEFAULT_ADB_PROGRAM: &str = "adb";

/// A tunable is out of range.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("invalid {field}: {reason}")]
pub struct ConfigError {
    pub field: &'static str,
    pub reason: &'static str,
}

/// Tunables for discovery and workers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EngineConfig {
    pub adb_path: PathBuf,
    /// Time between device listings
    pub poll_interval: Duration,
    /// Total attempts to open a device's log stream
    pub open_attempts: u32,
    /// Delay between failed open attempts
    pub retry_delay: Duration,
    /// Time given to the first discovery pass before reporting "no devices"
    pub warmup: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            adb_path: PathBuf::from(DEFAULT_ADB_PROGRAM),
            poll_interval: DEFAULT_POLL_INTERVAL,
            open_attempts: DEFAULT_OPEN_ATTEMPTS,
            retry_delay: DEFAULT_RETRY_DELAY,
            warmup: DEFAULT_WARMUP,
        }
    }
}

impl EngineConfig {
    /// Checks value ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval.is_zero() {
            return Err(ConfigError {
                field: "poll_interval",
                reason: "must be non-zero",
            });
        }
        if self.open_attempts == 0 {
            return Err(ConfigError {
                field: "open_attempts",
                reason: "must be at least 1",
            });
        }
        if self.adb_path.as_os_str().is_empty() {
            return Err(ConfigError {
                field: "adb_path",
                reason: "must not be empty",
            });
        }
        Ok(())
    }

    /// Retry policy handed to workers.
    pub fn worker_settings(&self) -> WorkerSettings {
        WorkerSettings {
            open_attempts: self.open_attempts,
            retry_delay: self.retry_delay,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_fixed_constants() {
        let config = EngineConfig::default();
        assert_eq!(config.adb_path, PathBuf::from("adb"));
        assert_eq!(config.poll_interval, Duration::from_secs(3));
        assert_eq!(config.warmup, Duration::from_secs(1));
        assert_eq!(config.open_attempts, 10);
        assert_eq!(config.worker_settings(), WorkerSettings::default());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_values() {
        let config = EngineConfig {
            poll_interval: Duration::ZERO,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "poll_interval");

        let config = EngineConfig {
            open_attempts: 0,
            ..EngineConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "open_attempts");

        let config = EngineConfig {
            adb_path: PathBuf::new(),
            ..EngineConfig::default()
        };
        assert_eq!(config.validate().unwrap_err().field, "adb_path");
    }
}
