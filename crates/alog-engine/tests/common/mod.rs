//! Shared helpers for engine integration tests.
//!
//! Tests CAN use `.unwrap()` and `.expect()` - this is allowed.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::io::Cursor;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use alog_core::{DeviceId, LogLineParser, PaletteColor};
use alog_engine::{
    BridgeError, CapturedOutput, Device, DeviceBridge, DeviceRegistry, LogStream, OutputSink,
    TagColors, WorkerContext, WorkerSettings,
};
use async_trait::async_trait;
use regex::Regex;
use tokio::io::{BufReader, DuplexStream};
use tokio_util::sync::CancellationToken;
use tracing::subscriber::DefaultGuard;

pub const LISTING_HEADER: &str = "List of devices attached\n";

pub const LINE_ACTIVITY: &str = "08-15 10:22:33.123 D/ActivityManager(1234): started service";
pub const LINE_APP: &str = "08-15 10:22:34.001 I/MyApp( 4321): hello from the app";
pub const LINE_ERROR: &str = "08-15 10:22:35.500 E/MyApp( 4321): something broke";
pub const LINE_NOISE: &str = "--------- beginning of main";

/// What the next `open_log_stream` call for a device does.
#[derive(Debug, Clone)]
pub enum StreamScript {
    /// Open fails
    Fail,
    /// Open succeeds; the stream yields these lines then ends
    Lines(Vec<String>),
    /// Open succeeds; the stream never yields and never ends
    Hold,
}

impl StreamScript {
    pub fn lines(lines: &[&str]) -> Self {
        Self::Lines(lines.iter().map(|l| (*l).to_string()).collect())
    }
}

/// In-memory [`DeviceBridge`] driven by per-device scripts.
///
/// When a device's script queue is empty, opens default to [`StreamScript::Hold`].
#[derive(Debug)]
pub struct ScriptedBridge {
    listing: Mutex<Result<String, String>>,
    streams: Mutex<HashMap<String, VecDeque<StreamScript>>>,
    opens: Mutex<HashMap<String, u32>>,
    held: Mutex<Vec<DuplexStream>>,
}

impl ScriptedBridge {
    pub fn new() -> Arc<Self> {
        Arc::new(Self {
            listing: Mutex::new(Ok(LISTING_HEADER.to_string())),
            streams: Mutex::new(HashMap::new()),
            opens: Mutex::new(HashMap::new()),
            held: Mutex::new(Vec::new()),
        })
    }

    /// Sets the listing to the header plus `<id>\tdevice` per id.
    pub fn set_devices(&self, ids: &[&str]) {
        let mut text = LISTING_HEADER.to_string();
        for id in ids {
            text.push_str(&format!("{id}\tdevice\n"));
        }
        self.set_listing(&text);
    }

    pub fn set_listing(&self, text: &str) {
        *self.listing.lock().unwrap() = Ok(text.to_string());
    }

    pub fn fail_listing(&self, reason: &str) {
        *self.listing.lock().unwrap() = Err(reason.to_string());
    }

    pub fn push_stream(&self, id: &str, script: StreamScript) {
        self.streams
            .lock()
            .unwrap()
            .entry(id.to_string())
            .or_default()
            .push_back(script);
    }

    pub fn open_count(&self, id: &str) -> u32 {
        self.opens.lock().unwrap().get(id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl DeviceBridge for ScriptedBridge {
    async fn list_devices(&self) -> Result<String, BridgeError> {
        self.listing
            .lock()
            .unwrap()
            .clone()
            .map_err(BridgeError::Unavailable)
    }

    async fn open_log_stream(&self, device: &DeviceId) -> Result<LogStream, BridgeError> {
        *self
            .opens
            .lock()
            .unwrap()
            .entry(device.as_str().to_string())
            .or_insert(0) += 1;

        let script = self
            .streams
            .lock()
            .unwrap()
            .get_mut(device.as_str())
            .and_then(VecDeque::pop_front)
            .unwrap_or(StreamScript::Hold);

        match script {
            StreamScript::Fail => Err(BridgeError::Unavailable(format!(
                "scripted open failure for {device}"
            ))),
            StreamScript::Lines(lines) => {
                let mut text = lines.join("\n");
                text.push('\n');
                Ok(LogStream::from_reader(Cursor::new(text.into_bytes())))
            }
            StreamScript::Hold => {
                let (client, server) = tokio::io::duplex(1024);
                self.held.lock().unwrap().push(server);
                Ok(LogStream::from_reader(BufReader::new(client)))
            }
        }
    }
}

/// Builds a worker context over `bridge` writing into a captured buffer.
pub fn test_context(
    bridge: Arc<ScriptedBridge>,
    settings: WorkerSettings,
) -> (WorkerContext, CapturedOutput) {
    let captured = CapturedOutput::new();
    let ctx = WorkerContext::new(
        bridge,
        Arc::new(DeviceRegistry::new()),
        Arc::new(TagColors::new()),
        Arc::new(OutputSink::new(captured.clone()).unwrap()),
        Arc::new(LogLineParser::new().unwrap()),
        settings,
    );
    (ctx, captured)
}

/// Fast retry policy for tests that do not run on paused time.
pub fn fast_settings() -> WorkerSettings {
    WorkerSettings {
        open_attempts: 3,
        retry_delay: Duration::from_millis(10),
    }
}

/// Registers a device the way discovery does and returns it.
pub fn register(ctx: &WorkerContext, id: &str, color: PaletteColor) -> Device {
    let device = Device::new(DeviceId::new(id), color, CancellationToken::new());
    ctx.registry.insert(device.clone()).unwrap();
    device
}

/// Routes diagnostics on this thread into a buffer until the guard drops.
///
/// Use with the current-thread test runtime so spawned tasks log here too.
pub fn capture_diagnostics() -> (CapturedOutput, DefaultGuard) {
    let captured = CapturedOutput::new();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::DEBUG)
        .with_ansi(false)
        .finish();
    (captured, tracing::subscriber::set_default(subscriber))
}

/// Removes SGR escape sequences.
pub fn strip_ansi(s: &str) -> String {
    let re = Regex::new(r"\x1b\[[0-9;]*m").unwrap();
    re.replace_all(s, "").into_owned()
}

/// Captured lines with styling removed.
pub fn plain_lines(captured: &CapturedOutput) -> Vec<String> {
    captured.lines().iter().map(|l| strip_ansi(l)).collect()
}

/// Polls `condition` every few milliseconds until it holds or `limit` passes.
pub async fn wait_until(limit: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = tokio::time::Instant::now() + limit;
    while tokio::time::Instant::now() < deadline {
        if condition() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    condition()
}
