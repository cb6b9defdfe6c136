//! Device identifiers and extraction from `adb devices` output.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DomainError, DomainResult};

/// Matches one attached device in `adb devices` output: a hexadecimal serial,
/// whitespace, then the `device` state. Other states (`offline`,
/// `unauthorized`) and the header line do not match.
pub const DEVICE_ID_PATTERN: &str = r"^([0-9A-Fa-f]+)[ \t]+device\b";

// ============================================================================
// Type-Safe Identifiers
// ============================================================================

/// Serial number of an attached device (e.g., "0123456789ABCDEF").
///
/// Used as the registry key; stable for as long as the device is attached.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Creates a new DeviceId from a string.
    ///
    /// Note: This does not validate the serial format; ids coming from
    /// discovery already matched [`DEVICE_ID_PATTERN`].
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Returns the underlying string reference.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<String> for DeviceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl From<&str> for DeviceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl AsRef<str> for DeviceId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

// ============================================================================
// Listing Parser
// ============================================================================

/// Compiled [`DEVICE_ID_PATTERN`].
///
/// Build once at startup and share; compilation failure is fatal to the caller.
#[derive(Debug, Clone)]
pub struct DeviceIdPattern {
    regex: Regex,
}

impl DeviceIdPattern {
    /// Compiles the device id pattern.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::InvalidPattern` if the pattern does not compile.
    pub fn new() -> DomainResult<Self> {
        let regex = Regex::new(DEVICE_ID_PATTERN)
            .map_err(|e| DomainError::invalid_pattern(DEVICE_ID_PATTERN, &e))?;
        Ok(Self { regex })
    }

    /// Extracts the id from a single listing line, if it names an attached device.
    pub fn match_line(&self, line: &str) -> Option<DeviceId> {
        let caps = self.regex.captures(line)?;
        let serial = caps.get(1)?.as_str();
        if serial.is_empty() {
            return None;
        }
        Some(DeviceId::new(serial))
    }

    /// Extracts every attached device id from the full listing output.
    ///
    /// Non-matching lines are skipped silently. Order follows the listing.
    pub fn extract(&self, listing: &str) -> Vec<DeviceId> {
        listing
            .lines()
            .filter_map(|line| self.match_line(line))
            .collect()
    }
}
