//! Serialized console output.
//!
//! All workers share one [`OutputSink`]. The console itself is owned by a
//! dedicated writer thread; workers send it whole records over a bounded
//! channel and await a oneshot acknowledgement. The writer performs one
//! `write_all` plus `flush` per record, so two records never interleave, and
//! a console that blocks (full pipe, paused pager) only blocks that thread,
//! never a runtime worker. Diagnostics never go through this sink.
//!
//! # Panic-Free Guarantees
//!
//! - No `.unwrap()`, `.expect()`, `panic!()`, `unreachable!()`, `todo!()`
//! - Channel errors are mapped to `io::ErrorKind::BrokenPipe`

use std::io::{self, Write};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{mpsc, oneshot};
use tracing::debug;

/// Records that may wait for the console before senders are held back.
pub const OUTPUT_QUEUE_CAPACITY: usize = 256;

type Target = Box<dyn Write + Send>;

/// One record on its way to the console.
struct WriteRequest {
    /// Record text including the trailing newline
    line: String,
    respond_to: oneshot::Sender<io::Result<()>>,
}

// ============================================================================
// Writer
// ============================================================================

/// Sole owner of the console; runs on its own thread.
struct ConsoleWriter {
    target: Target,
    receiver: mpsc::Receiver<WriteRequest>,
    records: Arc<AtomicU64>,
}

impl ConsoleWriter {
    fn run(mut self) {
        while let Some(request) = self.receiver.blocking_recv() {
            let result = self.write_line(&request.line);
            if result.is_ok() {
                self.records.fetch_add(1, Ordering::Relaxed);
            }
            // The worker may have been cancelled while waiting
            let _ = request.respond_to.send(result);
        }
        debug!("Console writer stopped");
    }

    fn write_line(&mut self, line: &str) -> io::Result<()> {
        self.target.write_all(line.as_bytes())?;
        self.target.flush()
    }
}

fn writer_gone() -> io::Error {
    io::Error::new(io::ErrorKind::BrokenPipe, "console writer stopped")
}

// ============================================================================
// Sink
// ============================================================================

/// Shared record sink.
///
/// Dropping the last handle closes the channel; the writer drains what was
/// already queued and exits.
pub struct OutputSink {
    sender: mpsc::Sender<WriteRequest>,
    records: Arc<AtomicU64>,
}

impl OutputSink {
    /// Starts a writer thread over any writer.
    ///
    /// # Errors
    ///
    /// Returns the OS error if the writer thread cannot be started.
    pub fn new(target: impl Write + Send + 'static) -> io::Result<Self> {
        let (sender, receiver) = mpsc::channel(OUTPUT_QUEUE_CAPACITY);
        let records = Arc::new(AtomicU64::new(0));

        let writer = ConsoleWriter {
            target: Box::new(target),
            receiver,
            records: Arc::clone(&records),
        };
        std::thread::Builder::new()
            .name("alog-console".to_string())
            .spawn(move || writer.run())?;

        Ok(Self { sender, records })
    }

    /// Starts a writer over the process's standard output.
    pub fn stdout() -> io::Result<Self> {
        Self::new(io::stdout())
    }

    /// Writes one record followed by a newline as an uninterrupted unit.
    ///
    /// Resolves once the record has been flushed to the console.
    ///
    /// # Errors
    ///
    /// Returns the underlying I/O error (e.g. a closed pipe), or
    /// `BrokenPipe` if the writer thread is gone. The record counter is only
    /// advanced on success.
    pub async fn write_record(&self, record: &str) -> io::Result<()> {
        let mut line = String::with_capacity(record.len() + 1);
        line.push_str(record);
        line.push('\n');

        let (respond_to, response) = oneshot::channel();
        self.sender
            .send(WriteRequest { line, respond_to })
            .await
            .map_err(|_| writer_gone())?;

        response.await.map_err(|_| writer_gone())?
    }

    /// Number of records successfully written.
    pub fn records_written(&self) -> u64 {
        self.records.load(Ordering::Relaxed)
    }
}

impl std::fmt::Debug for OutputSink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OutputSink")
            .field("records", &self.records_written())
            .finish_non_exhaustive()
    }
}

/// In-memory writer whose contents can be read back.
///
/// Clones share the same buffer; hand one to [`OutputSink::new`] and keep
/// the other to inspect what was written.
#[derive(Debug, Clone, Default)]
pub struct CapturedOutput {
    buffer: Arc<Mutex<Vec<u8>>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything written so far, lossily decoded.
    pub fn contents(&self) -> String {
        let buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        String::from_utf8_lossy(&buffer).into_owned()
    }

    /// Written lines, without trailing newlines.
    pub fn lines(&self) -> Vec<String> {
        self.contents().lines().map(str::to_string).collect()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut buffer = self.buffer.lock().unwrap_or_else(PoisonError::into_inner);
        buffer.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}
