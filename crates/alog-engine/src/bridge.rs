//! Debug bridge collaborators.
//!
//! [`DeviceBridge`] is the seam between the engine and the outside world:
//! one call lists attached devices, the other opens a live log stream for
//! one device. [`AdbBridge`] implements it with the `adb` command line tool;
//! tests substitute scripted implementations.

use std::path::PathBuf;
use std::process::Stdio;

use alog_core::DeviceId;
use async_trait::async_trait;
use thiserror::Error;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::{Child, Command};
use tracing::debug;

// ============================================================================
// Errors
// ============================================================================

/// Errors raised by bridge collaborators.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// The command could not be started
    #[error("failed to run {command}: {source}")]
    Spawn {
        command: String,
        #[source]
        source: std::io::Error,
    },

    /// The command ran but reported failure
    #[error("{command} exited with {status}")]
    CommandFailed { command: String, status: String },

    /// The child process did not expose a stdout pipe
    #[error("{command} has no stdout pipe")]
    MissingStdout { command: String },

    /// Catch-all for non-process bridges
    #[error("bridge unavailable: {0}")]
    Unavailable(String),
}

// ============================================================================
// Log Stream
// ============================================================================

/// Longest raw line kept, in bytes. The rest of a longer line is discarded.
pub const MAX_LINE_BYTES: u64 = 32 * 1024;

/// An open, line-oriented log stream for one device.
///
/// Owns the producing child process (if any); dropping the stream kills it.
pub struct LogStream {
    reader: Box<dyn AsyncBufRead + Send + Unpin>,
    buf: Vec<u8>,
    child: Option<Child>,
}

impl LogStream {
    /// Wraps an arbitrary buffered reader (used by tests and non-process bridges).
    pub fn from_reader(reader: impl AsyncBufRead + Send + Unpin + 'static) -> Self {
        Self {
            reader: Box::new(reader),
            buf: Vec::new(),
            child: None,
        }
    }

    fn from_child(mut child: Child, command: &str) -> Result<Self, BridgeError> {
        let stdout = child.stdout.take().ok_or_else(|| BridgeError::MissingStdout {
            command: command.to_string(),
        })?;
        Ok(Self {
            reader: Box::new(BufReader::new(stdout)),
            buf: Vec::new(),
            child: Some(child),
        })
    }

    /// Reads the next line, without its line terminator.
    ///
    /// At most [`MAX_LINE_BYTES`] of a line are returned; the remainder up to
    /// the next newline is skipped. Invalid UTF-8 is replaced rather than
    /// rejected. Returns `Ok(None)` at end of stream.
    pub async fn next_line(&mut self) -> std::io::Result<Option<String>> {
        self.buf.clear();
        let read = (&mut self.reader)
            .take(MAX_LINE_BYTES)
            .read_until(b'\n', &mut self.buf)
            .await?;
        if read == 0 {
            return Ok(None);
        }
        if self.buf.last() != Some(&b'\n') && self.buf.len() as u64 >= MAX_LINE_BYTES {
            self.skip_rest_of_line().await?;
        }
        let line = String::from_utf8_lossy(&self.buf);
        Ok(Some(line.trim_end_matches(['\r', '\n']).to_string()))
    }

    /// Consumes input up to and including the next newline.
    async fn skip_rest_of_line(&mut self) -> std::io::Result<()> {
        loop {
            let available = self.reader.fill_buf().await?;
            if available.is_empty() {
                return Ok(());
            }
            let (consumed, found) = match available.iter().position(|b| *b == b'\n') {
                Some(i) => (i + 1, true),
                None => (available.len(), false),
            };
            self.reader.consume(consumed);
            if found {
                return Ok(());
            }
        }
    }
}

impl std::fmt::Debug for LogStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogStream")
            .field("child", &self.child.as_ref().and_then(Child::id))
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bridge Trait
// ============================================================================

/// Source of device listings and per-device log streams.
#[async_trait]
pub trait DeviceBridge: Send + Sync {
    /// Returns the raw text of the device listing.
    async fn list_devices(&self) -> Result<String, BridgeError>;

    /// Opens the live log stream for `device`.
    async fn open_log_stream(&self, device: &DeviceId) -> Result<LogStream, BridgeError>;
}

// ============================================================================
// adb
// ============================================================================

/// [`DeviceBridge`] backed by the `adb` executable.
///
/// - listing: `adb devices`
/// - stream: `adb -s <id> logcat -v time`
#[derive(Debug, Clone)]
pub struct AdbBridge {
    adb: PathBuf,
}

impl AdbBridge {
    pub fn new(adb: impl Into<PathBuf>) -> Self {
        Self { adb: adb.into() }
    }

    /// Arguments used to stream one device's log.
    pub fn logcat_args(device: &DeviceId) -> [&str; 5] {
        ["-s", device.as_str(), "logcat", "-v", "time"]
    }

    fn describe(&self, args: &[&str]) -> String {
        let mut command = self.adb.display().to_string();
        for arg in args {
            command.push(' ');
            command.push_str(arg);
        }
        command
    }
}

#[async_trait]
impl DeviceBridge for AdbBridge {
    async fn list_devices(&self) -> Result<String, BridgeError> {
        let command = self.describe(&["devices"]);
        let output = Command::new(&self.adb)
            .arg("devices")
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .await
            .map_err(|source| BridgeError::Spawn {
                command: command.clone(),
                source,
            })?;

        if !output.status.success() {
            return Err(BridgeError::CommandFailed {
                command,
                status: output.status.to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).into_owned())
    }

    async fn open_log_stream(&self, device: &DeviceId) -> Result<LogStream, BridgeError> {
        let args = Self::logcat_args(device);
        let command = self.describe(&args);

        let child = Command::new(&self.adb)
            .args(args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| BridgeError::Spawn {
                command: command.clone(),
                source,
            })?;

        debug!(device = %device, pid = ?child.id(), "Started log stream process");
        LogStream::from_child(child, &command)
    }
}
