//! alog Engine - device discovery and log multiplexing
//!
//! This crate provides the concurrent device lifecycle behind `alog`:
//! - `discovery` - periodic `adb devices` polling and worker spawning
//! - `worker` - one task per device streaming `logcat` to the console
//! - `registry` - devices that currently have a worker
//! - `tags` - stable tag colors
//! - `output` - serialized console writes
//! - `render` - colorized record layout
//! - `bridge` - the `adb` collaborators behind a trait
//!
//! # Architecture
//!
//! ```text
//! ┌───────────────────┐  insert   ┌──────────────────┐
//! │ DiscoveryService  │──────────▶│  DeviceRegistry  │◀─────┐
//! │ (adb devices)     │           └──────────────────┘      │ remove
//! └─────────┬─────────┘                                     │ (guard)
//!           │ spawn                                         │
//!           ▼                                               │
//! ┌───────────────────┐  parse  ┌────────────┐  render  ┌───┴──────────┐
//! │ DeviceWorker × N  │────────▶│ TagColors  │─────────▶│  OutputSink  │
//! │ (adb logcat)      │         └────────────┘          │  (stdout)    │
//! └───────────────────┘                                 └──────────────┘
//! ```
//!
//! # Panic-Free Guarantees
//!
//! All production code in this crate follows the panic-free policy:
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - All fallible operations return `Result` or `Option`
//! - Poisoned locks are recovered rather than propagated

pub mod bridge;
pub mod config;
pub mod discovery;
pub mod engine;
pub mod output;
pub mod registry;
pub mod render;
pub mod tags;
pub mod worker;

pub use bridge::{AdbBridge, BridgeError, DeviceBridge, LogStream};
pub use config::{ConfigError, EngineConfig, DEFAULT_ADB_PROGRAM};
pub use discovery::{DiscoveryResult, DiscoveryService};
pub use engine::{Engine, EngineError, EngineSummary};
pub use output::{CapturedOutput, OutputSink};
pub use registry::{Device, DeviceRegistry, RegistrationGuard, RegistryError};
pub use tags::TagColors;
pub use worker::{DeviceWorker, WorkerContext, WorkerExit, WorkerOutcome, WorkerSettings};
