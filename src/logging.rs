//! Structured logging: a per-session newline-delimited JSON file under
//! `<gandalf_home>/logs/`, plus the (separate) MCP `notifications/message`
//! channel wired up in [`crate::server`].
//!
//! Built on `tracing` + `tracing-subscriber`, exactly as the ambient
//! logging stack elsewhere in this codebase family: stdout is reserved
//! for JSON-RPC framing, so every subscriber layer here writes to stderr
//! or to the session log file, never to stdout.

use std::path::{Path, PathBuf};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer};

/// Guard returned by [`init`]; dropping it flushes the non-blocking file
/// appender. Must be held for the lifetime of the process.
pub struct LoggingGuard {
    _file_guard: Option<tracing_appender::non_blocking::WorkerGuard>,
}

/// Initializes the global `tracing` subscriber with two layers:
/// - a human-readable layer on stderr, gated by `RUST_LOG` (or `info`
///   by default),
/// - a JSON-formatted layer writing to `<gandalf_home>/logs/<session_id>.jsonl`,
///   matching the `{timestamp, level, message, logger?, session_id, data?}`
///   session log shape.
pub fn init(gandalf_home: &Path, session_id: &str) -> anyhow::Result<LoggingGuard> {
    let log_dir = gandalf_home.join("logs");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = tracing_appender::rolling::never(&log_dir, format!("{session_id}.jsonl"));
    let (non_blocking, file_guard) = tracing_appender::non_blocking(file_appender);

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false);

    let json_layer = tracing_subscriber::fmt::layer()
        .json()
        .with_writer(non_blocking)
        .with_current_span(false)
        .with_span_list(false);

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(stderr_layer)
        .with(json_layer.with_filter(EnvFilter::new("info")))
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to install tracing subscriber: {e}"))?;

    Ok(LoggingGuard { _file_guard: Some(file_guard) })
}

/// Path to the logs directory under a given Gandalf home.
#[must_use]
pub fn log_dir(gandalf_home: &Path) -> PathBuf {
    gandalf_home.join("logs")
}
