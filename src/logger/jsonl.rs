//! JSONL run-event log: append-only line-delimited JSON.
//!
//! Each line is a self-contained JSON object, assembled in memory and written
//! with a single `write_all` so a tailing process never sees a partial line.
//! Degradation chain: primary file → stderr with a `[BLF-JSONL]` prefix →
//! silent discard. A forecast run must never fail because its log could not
//! be written.

#![allow(missing_docs)]

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Severity level for log events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

/// Run lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    RunStarted,
    RunCompleted,
    RunAborted,
    EstimatePublished,
    Error,
}

/// A single JSONL log entry — all fields optional except `ts`, `event`,
/// `severity`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogEntry {
    /// ISO 8601 UTC timestamp.
    pub ts: String,
    pub event: EventType,
    pub severity: Severity,
    /// Configured iteration target for the run.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub iterations: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub success_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure_count: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_seconds: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub median_seconds: Option<f64>,
    /// Published estimate date, RFC 3339.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub estimated_completion: Option<String>,
    /// Wall-clock duration of the run in milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
}

impl LogEntry {
    /// Create a new entry stamped with the current UTC time.
    #[must_use]
    pub fn new(event: EventType, severity: Severity) -> Self {
        Self {
            ts: format_utc_now(),
            event,
            severity,
            iterations: None,
            success_count: None,
            failure_count: None,
            average_seconds: None,
            median_seconds: None,
            estimated_completion: None,
            duration_ms: None,
            error_code: None,
            error_message: None,
            details: None,
        }
    }
}

/// Degradation state of the JSONL writer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WriterState {
    Normal,
    Stderr,
    Discard,
}

/// Append-only JSONL log writer with stderr fallback.
pub struct JsonlWriter {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    state: WriterState,
}

impl JsonlWriter {
    /// Open the JSONL log file, degrading to stderr on failure.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        match open_append(&path) {
            Ok(file) => Self {
                path,
                writer: Some(BufWriter::with_capacity(16 * 1024, file)),
                state: WriterState::Normal,
            },
            Err(_) => {
                let _ = writeln!(
                    io::stderr(),
                    "[BLF-JSONL] cannot open {}, logging to stderr",
                    path.display()
                );
                Self {
                    path,
                    writer: None,
                    state: WriterState::Stderr,
                }
            }
        }
    }

    /// Write a single log entry as one atomic JSONL line.
    pub fn write_entry(&mut self, entry: &LogEntry) {
        let line = match serde_json::to_string(entry) {
            Ok(json) => format!("{json}\n"),
            Err(e) => {
                // Serialization failure is a programming error; surface it.
                let _ = writeln!(io::stderr(), "[BLF-JSONL] serialize error: {e}");
                return;
            }
        };

        match self.state {
            WriterState::Normal => {
                if let Some(w) = self.writer.as_mut() {
                    if w.write_all(line.as_bytes()).is_err() {
                        self.degrade();
                        let _ = write!(io::stderr(), "[BLF-JSONL] {line}");
                    }
                } else {
                    self.degrade();
                }
            }
            WriterState::Stderr => {
                if write!(io::stderr(), "[BLF-JSONL] {line}").is_err() {
                    self.state = WriterState::Discard;
                }
            }
            WriterState::Discard => {}
        }
    }

    /// Flush buffers.
    pub fn flush(&mut self) {
        if let Some(w) = self.writer.as_mut() {
            let _ = w.flush();
        }
    }

    /// Current degradation state.
    #[must_use]
    pub const fn state(&self) -> &'static str {
        match self.state {
            WriterState::Normal => "normal",
            WriterState::Stderr => "stderr",
            WriterState::Discard => "discard",
        }
    }

    /// Log file path (whether or not it is currently writable).
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn degrade(&mut self) {
        self.writer = None;
        self.state = WriterState::Stderr;
        let _ = writeln!(
            io::stderr(),
            "[BLF-JSONL] write to {} failed, using stderr",
            self.path.display()
        );
    }
}

impl Drop for JsonlWriter {
    fn drop(&mut self) {
        self.flush();
    }
}

/// Open or create a file for appending, creating parent directories.
fn open_append(path: &Path) -> io::Result<File> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    OpenOptions::new().create(true).append(true).open(path)
}

/// Format current UTC time as ISO 8601.
fn format_utc_now() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
