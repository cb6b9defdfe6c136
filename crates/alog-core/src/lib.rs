//! alog Core - Shared types for multi-device logcat rendering
//!
//! This crate provides the domain types shared by the engine and the
//! `alog` binary: the display palette, device identifiers and the
//! logcat line parser.
//!
//! All code follows the panic-free policy: no `.unwrap()`, `.expect()`,
//! `panic!()`, `unreachable!()`, `todo!()`, or direct indexing `[i]`.

pub mod color;
pub mod device;
pub mod error;
pub mod line;

// Re-exports for convenience
pub use color::{ColorCycle, PaletteColor, PALETTE_SIZE};
pub use device::{DeviceId, DeviceIdPattern, DEVICE_ID_PATTERN};
pub use error::{DomainError, DomainResult};
pub use line::{
    LogLine, LogLineParser, Severity, LOG_LINE_PATTERN, MAX_MESSAGE_CHARS, MAX_OWNER_CHARS,
    MAX_TAG_CHARS,
};
