//! Run-event logging: JSONL append-only log plus a shareable wrapper.

pub mod jsonl;

use std::path::PathBuf;

use parking_lot::Mutex;

use self::jsonl::{EventType, JsonlWriter, LogEntry, Severity};

use crate::report::ForecastReport;

/// Thread-safe run logger: a [`JsonlWriter`] behind a mutex with convenience
/// methods for the run lifecycle events.
pub struct RunLogger {
    writer: Mutex<JsonlWriter>,
}

impl RunLogger {
    /// Open (or degrade) the underlying JSONL writer.
    #[must_use]
    pub fn open(path: impl Into<PathBuf>) -> Self {
        Self {
            writer: Mutex::new(JsonlWriter::open(path)),
        }
    }

    /// Log the start of a simulation run.
    pub fn run_started(&self, iterations: u64) {
        let mut entry = LogEntry::new(EventType::RunStarted, Severity::Info);
        entry.iterations = Some(iterations);
        self.write(&entry);
    }

    /// Log a finished run, completed or aborted, from its report.
    pub fn run_finished(&self, report: &ForecastReport, duration_ms: u64) {
        let (event, severity) = match report.aborted {
            None => (EventType::RunCompleted, Severity::Info),
            Some(_) => (EventType::RunAborted, Severity::Warning),
        };
        let mut entry = LogEntry::new(event, severity);
        entry.iterations = Some(report.iterations_requested);
        entry.success_count = Some(report.success_count);
        entry.failure_count = Some(report.failure_count);
        entry.average_seconds = report.average_seconds;
        entry.median_seconds = report.median_seconds;
        entry.estimated_completion = report
            .estimated_completion
            .map(|d| d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
        entry.duration_ms = Some(duration_ms);
        entry.details = report.aborted.map(|kind| kind.as_str().to_string());
        self.write(&entry);
    }

    /// Log a published estimate summary line.
    pub fn estimate_published(&self, report: &ForecastReport) {
        let mut entry = LogEntry::new(EventType::EstimatePublished, Severity::Info);
        entry.median_seconds = report.median_seconds;
        entry.estimated_completion = report
            .estimated_completion
            .map(|d| d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true));
        entry.details = Some(report.summary_line());
        self.write(&entry);
    }

    /// Log an error with its stable code.
    pub fn error(&self, code: &str, message: &str) {
        let mut entry = LogEntry::new(EventType::Error, Severity::Critical);
        entry.error_code = Some(code.to_string());
        entry.error_message = Some(message.to_string());
        self.write(&entry);
    }

    /// Flush the underlying writer.
    pub fn flush(&self) {
        self.writer.lock().flush();
    }

    fn write(&self, entry: &LogEntry) {
        self.writer.lock().write_entry(entry);
    }
}
