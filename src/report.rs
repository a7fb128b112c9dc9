//! Forecast report: everything the persistence side consumes from a run —
//! the distribution summary, the user-facing estimate date, and a
//! human-readable run summary line.
//!
//! The report layer is where [`EmptyDistribution`] is caught: a run with no
//! successful iterations publishes absent estimates instead of an error.
//!
//! [`EmptyDistribution`]: crate::sim::distribution::EmptyDistribution

#![allow(missing_docs)]
#![allow(clippy::cast_possible_truncation)]

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Value, json};

use crate::sim::distribution::Distribution;
use crate::sim::runner::RunError;

/// Which abort policy terminated a truncated run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortKind {
    IncreasingBacklog,
    Timeout,
}

impl AbortKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::IncreasingBacklog => "increasing_backlog",
            Self::Timeout => "timeout",
        }
    }
}

impl From<&RunError> for AbortKind {
    fn from(err: &RunError) -> Self {
        match err {
            RunError::IncreasingBacklog { .. } => Self::IncreasingBacklog,
            RunError::Timeout { .. } => Self::Timeout,
        }
    }
}

/// One histogram row for serialized storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct HistogramRow {
    /// Bucket key: simulated seconds floored to the bucket width.
    pub bucket_start_seconds: u64,
    /// Successful runs landing in this bucket.
    pub runs: u64,
}

/// Summarized outcome of one simulation run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ForecastReport {
    pub generated_at: DateTime<Utc>,
    /// Iterations the run was configured to perform.
    pub iterations_requested: u64,
    pub success_count: u64,
    pub failure_count: u64,
    /// Weighted-average simulated drain time; absent when no run succeeded.
    pub average_seconds: Option<f64>,
    /// Median simulated drain time; absent when no run succeeded.
    pub median_seconds: Option<f64>,
    /// `generated_at + median`; the user-facing estimate date.
    pub estimated_completion: Option<DateTime<Utc>>,
    /// Present when the run was truncated by an abort policy.
    pub aborted: Option<AbortKind>,
    pub histogram: Vec<HistogramRow>,
}

impl ForecastReport {
    /// Summarize a (possibly partial) distribution.
    ///
    /// Average/median failures on an empty distribution are absorbed into
    /// absent estimates here — the one place that recoverable error is
    /// expected and handled.
    #[must_use]
    pub fn from_distribution(
        distribution: &Distribution,
        iterations_requested: u64,
        interpolate_median: bool,
        generated_at: DateTime<Utc>,
        aborted: Option<AbortKind>,
    ) -> Self {
        let average_seconds = distribution.average().ok();
        let median_seconds = distribution.median(interpolate_median).ok();
        let estimated_completion = median_seconds
            .map(|median| generated_at + chrono::Duration::seconds(median.round() as i64));

        let histogram = distribution
            .sorted_buckets()
            .into_iter()
            .map(|(bucket_start_seconds, runs)| HistogramRow {
                bucket_start_seconds,
                runs,
            })
            .collect();

        Self {
            generated_at,
            iterations_requested,
            success_count: distribution.success_count(),
            failure_count: distribution.failure_count(),
            average_seconds,
            median_seconds,
            estimated_completion,
            aborted,
            histogram,
        }
    }

    /// Summarize either a completed run or the partial distribution carried
    /// by a run-level abort.
    #[must_use]
    pub fn from_outcome(
        outcome: &Result<Distribution, RunError>,
        iterations_requested: u64,
        interpolate_median: bool,
        generated_at: DateTime<Utc>,
    ) -> Self {
        match outcome {
            Ok(distribution) => Self::from_distribution(
                distribution,
                iterations_requested,
                interpolate_median,
                generated_at,
                None,
            ),
            Err(err) => Self::from_distribution(
                err.partial(),
                iterations_requested,
                interpolate_median,
                generated_at,
                Some(AbortKind::from(err)),
            ),
        }
    }

    /// Human-readable one-line run summary.
    #[must_use]
    pub fn summary_line(&self) -> String {
        let completed = self.success_count + self.failure_count;
        let runs = match self.aborted {
            Some(kind) => format!(
                "aborted ({}) after {completed} of {} runs",
                kind.as_str(),
                self.iterations_requested
            ),
            None => format!("completed {completed} runs"),
        };
        let counts = format!("{} ok, {} failed", self.success_count, self.failure_count);

        match (self.median_seconds, self.estimated_completion) {
            (Some(median), Some(date)) => {
                format!(
                    "{runs} ({counts}); median drain {}, estimated completion {}",
                    format_days(median),
                    date.format("%Y-%m-%d")
                )
            }
            _ => format!("{runs} ({counts}); no estimate available"),
        }
    }

    /// JSON value for serialized storage.
    #[must_use]
    pub fn to_json(&self) -> Value {
        json!({
            "generated_at": self.generated_at.to_rfc3339_opts(chrono::SecondsFormat::Millis, true),
            "iterations_requested": self.iterations_requested,
            "success_count": self.success_count,
            "failure_count": self.failure_count,
            "average_seconds": self.average_seconds,
            "median_seconds": self.median_seconds,
            "estimated_completion": self
                .estimated_completion
                .map(|d| d.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)),
            "aborted": self.aborted.map(AbortKind::as_str),
            "histogram": self
                .histogram
                .iter()
                .map(|row| json!({"bucket_start_seconds": row.bucket_start_seconds, "runs": row.runs}))
                .collect::<Vec<Value>>(),
        })
    }
}

/// Render simulated seconds as a day count with one decimal.
#[allow(clippy::cast_precision_loss)]
fn format_days(seconds: f64) -> String {
    let days = seconds / 86_400.0;
    if days < 1.0 {
        format!("{:.1} hours", seconds / 3_600.0)
    } else {
        format!("{days:.1} days")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 10, 12, 0, 0).unwrap()
    }

    fn populated() -> Distribution {
        let mut d = Distribution::new();
        d.record_success(0);
        d.record_success(86_400);
        d.record_success(172_800);
        d.record_failure();
        d
    }

    #[test]
    fn report_carries_counts_and_histogram() {
        let report = ForecastReport::from_distribution(&populated(), 100, false, now(), None);
        assert_eq!(report.success_count, 3);
        assert_eq!(report.failure_count, 1);
        assert_eq!(report.histogram.len(), 3);
        assert_eq!(report.histogram[0].bucket_start_seconds, 0);
        assert_eq!(report.histogram[2].bucket_start_seconds, 172_800);
    }

    #[test]
    fn estimate_date_is_now_plus_median() {
        let report = ForecastReport::from_distribution(&populated(), 100, false, now(), None);
        assert!((report.median_seconds.unwrap() - 86_400.0).abs() < f64::EPSILON);
        assert_eq!(
            report.estimated_completion.unwrap(),
            now() + chrono::Duration::days(1)
        );
    }

    #[test]
    fn empty_distribution_publishes_absent_estimates() {
        let report =
            ForecastReport::from_distribution(&Distribution::new(), 100, true, now(), None);
        assert_eq!(report.average_seconds, None);
        assert_eq!(report.median_seconds, None);
        assert_eq!(report.estimated_completion, None);
        assert!(report.summary_line().contains("no estimate available"));
    }

    #[test]
    fn summary_line_for_completed_run() {
        let report = ForecastReport::from_distribution(&populated(), 100, false, now(), None);
        let line = report.summary_line();
        assert!(line.contains("completed 4 runs"), "{line}");
        assert!(line.contains("3 ok, 1 failed"), "{line}");
        assert!(line.contains("2024-06-11"), "{line}");
    }

    #[test]
    fn summary_line_marks_aborted_runs() {
        let report = ForecastReport::from_distribution(
            &populated(),
            100,
            false,
            now(),
            Some(AbortKind::Timeout),
        );
        let line = report.summary_line();
        assert!(line.contains("aborted (timeout) after 4 of 100 runs"), "{line}");
    }

    #[test]
    fn from_outcome_maps_abort_kind() {
        let err = RunError::IncreasingBacklog {
            partial: populated(),
            completed_runs: 4,
        };
        let outcome: Result<Distribution, RunError> = Err(err);
        let report = ForecastReport::from_outcome(&outcome, 100, true, now());
        assert_eq!(report.aborted, Some(AbortKind::IncreasingBacklog));
        // Partial distributions still summarize.
        assert!(report.median_seconds.is_some());
    }

    #[test]
    fn json_shape_is_stable() {
        let report = ForecastReport::from_distribution(&populated(), 100, false, now(), None);
        let value = report.to_json();
        assert!(value.get("generated_at").is_some());
        assert_eq!(value["success_count"], 3);
        assert_eq!(value["failure_count"], 1);
        assert_eq!(value["aborted"], Value::Null);
        assert_eq!(value["histogram"].as_array().unwrap().len(), 3);
        assert_eq!(value["histogram"][1]["bucket_start_seconds"], 86_400);
    }

    #[test]
    fn format_days_picks_sensible_units() {
        assert_eq!(format_days(43_200.0), "12.0 hours");
        assert_eq!(format_days(86_400.0), "1.0 days");
        assert_eq!(format_days(1_036_800.0), "12.0 days");
    }
}
