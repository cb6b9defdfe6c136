//! alog - colorized logcat for every attached Android device
//!
//! Polls `adb devices`, starts `adb logcat` for each attached device and
//! prints all of their logs, interleaved and colorized, on stdout.
//! Diagnostics go to stderr.
//!
//! # Usage
//!
//! ```bash
//! # Stream every attached device
//! alog
//!
//! # Enable debug diagnostics
//! RUST_LOG=alog_engine=debug alog
//! ```
//!
//! # Signal Handling
//!
//! - SIGTERM/SIGINT: stop discovery, stop every device worker, exit

use std::process;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use alog_engine::{AdbBridge, Engine, EngineConfig, OutputSink};

/// Diagnostics shown when `RUST_LOG` is unset or invalid.
const DEFAULT_LOG_DIRECTIVES: &str = "alog=info,alog_engine=info,alog_core=info";

/// alog - multi-device colorized logcat
#[derive(Parser, Debug)]
#[command(name = "alog", version, about)]
struct Args {}

/// Builds the diagnostics filter. `RUST_LOG` wins over the defaults as a whole.
fn log_filter(rust_log: Option<&str>) -> EnvFilter {
    rust_log
        .and_then(|directives| EnvFilter::try_new(directives).ok())
        .unwrap_or_else(|| EnvFilter::new(DEFAULT_LOG_DIRECTIVES))
}

#[tokio::main]
async fn main() -> Result<()> {
    let _args = Args::parse();

    // Diagnostics on stderr; stdout carries only log records
    let rust_log = std::env::var("RUST_LOG").ok();
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(log_filter(rust_log.as_deref()))
        .init();

    let config = EngineConfig::default();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        pid = process::id(),
        adb = %config.adb_path.display(),
        "alog starting"
    );

    // Create cancellation token for graceful shutdown
    let cancel_token = CancellationToken::new();

    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        if let Err(e) = wait_for_shutdown_signal().await {
            error!(error = %e, "Error waiting for shutdown signal");
        }
        info!("Shutdown signal received");
        shutdown_token.cancel();
    });

    let bridge = Arc::new(AdbBridge::new(config.adb_path.clone()));
    let output = Arc::new(OutputSink::stdout().context("Failed to start console writer")?);
    let engine = Engine::new(config, bridge, output).context("Failed to start engine")?;

    let summary = engine.run(cancel_token).await;

    info!(
        records = summary.records_written,
        devices = summary.devices_at_shutdown,
        "alog stopped"
    );
    Ok(())
}

/// Waits for a shutdown signal (SIGTERM or SIGINT).
async fn wait_for_shutdown_signal() -> Result<()> {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut sigterm = signal(SignalKind::terminate())?;
        let mut sigint = signal(SignalKind::interrupt())?;

        tokio::select! {
            _ = sigterm.recv() => {
                info!("Received SIGTERM");
            }
            _ = sigint.recv() => {
                info!("Received SIGINT");
            }
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c().await?;
        info!("Received Ctrl+C");
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use alog_engine::CapturedOutput;
    use clap::CommandFactory;

    /// Emits one event per level and target through `filter`, returning the text.
    fn emitted_with(filter: EnvFilter) -> String {
        let captured = CapturedOutput::new();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_env_filter(filter)
            .with_ansi(false)
            .finish();

        tracing::subscriber::with_default(subscriber, || {
            tracing::debug!(target: "alog_engine", "engine-debug");
            tracing::info!(target: "alog_engine", "engine-info");
            tracing::debug!(target: "alog_core", "core-debug");
            tracing::info!(target: "other_crate", "other-info");
        });
        captured.contents()
    }

    #[test]
    fn test_cli_definition() {
        Args::command().debug_assert();
    }

    #[test]
    fn test_cli_takes_no_options() {
        assert!(Args::try_parse_from(["alog"]).is_ok());
        assert!(Args::try_parse_from(["alog", "--adb", "/opt/adb"]).is_err());
        assert!(Args::try_parse_from(["alog", "--poll-interval", "1"]).is_err());
    }

    #[test]
    fn test_default_filter_shows_info_only() {
        let logs = emitted_with(log_filter(None));
        assert!(logs.contains("engine-info"));
        assert!(!logs.contains("engine-debug"));
        assert!(!logs.contains("core-debug"));
        assert!(!logs.contains("other-info"));
    }

    #[test]
    fn test_rust_log_enables_engine_debug() {
        let logs = emitted_with(log_filter(Some("alog_engine=debug")));
        assert!(logs.contains("engine-debug"));
        assert!(logs.contains("engine-info"));
        assert!(!logs.contains("core-debug"));
    }

    #[test]
    fn test_invalid_rust_log_falls_back_to_defaults() {
        let logs = emitted_with(log_filter(Some("alog_engine=loud")));
        assert!(logs.contains("engine-info"));
        assert!(!logs.contains("engine-debug"));
    }
}
