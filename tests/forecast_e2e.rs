//! End-to-end pipeline tests: backlog records → sample history → run
//! controller → forecast report.

use chrono::{TimeZone, Utc};

use backlog_forecast::prelude::*;

fn record(day: u32, count: u64) -> BacklogRecord {
    BacklogRecord {
        when: Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap(),
        count,
    }
}

fn test_config(iterations: u64, workers: usize) -> SimulationConfig {
    SimulationConfig {
        iterations,
        bucket_size_seconds: 86_400,
        time_limit_seconds: 3_600,
        increasing_failure_threshold_ratio: 0.1,
        increasing_failure_ratio: 0.5,
        divergence_multiplier: 3,
        workers,
    }
}

#[test]
fn steadily_draining_history_forecasts_completion() {
    // 100 open issues, ten resolved per day, observed daily.
    let records: Vec<BacklogRecord> = (1..=11)
        .map(|day| record(day, 100 - 10 * (u64::from(day) - 1)))
        .collect();
    let history = SampleHistory::from_records(records).unwrap();
    assert_eq!(history.anchor().count, 0, "series drained to zero");

    // Anchor at zero: every iteration succeeds instantly with duration 0.
    let runner = SimulationRunner::new(test_config(1_000, 2));
    let dist = runner.run_parallel(&history.source()).unwrap();
    assert_eq!(dist.success_count(), 1_000);
    assert_eq!(dist.failure_count(), 0);
    assert!((dist.average().unwrap() - 0.0).abs() < f64::EPSILON);
}

#[test]
fn open_backlog_estimate_lands_in_plausible_range() {
    // 60 open issues, resolving 10..15 per day across the observed window.
    let counts = [120_u64, 110, 95, 85, 70, 60];
    let records: Vec<BacklogRecord> = counts
        .iter()
        .enumerate()
        .map(|(i, &count)| record(u32::try_from(i).unwrap() + 1, count))
        .collect();
    let history = SampleHistory::from_records(records).unwrap();
    assert_eq!(history.anchor().count, 60);

    let runner = SimulationRunner::new(test_config(2_000, 4));
    let dist = runner.run_parallel(&history.source()).unwrap();

    assert_eq!(dist.success_count(), 2_000);
    assert_eq!(dist.failure_count(), 0);

    // Drain rates span 10–15/day, so 60 issues take 4 to 6 simulated days;
    // every walk ends on a whole-day bucket inside that window.
    let median = dist.median(true).unwrap();
    assert!(median >= 4.0 * 86_400.0, "median {median} too low");
    assert!(median <= 6.0 * 86_400.0, "median {median} too high");
}

#[test]
fn growing_backlog_aborts_and_still_summarizes() {
    // Backlog grows every day: every iteration diverges, the run aborts
    // once the warm-up window has passed.
    let records: Vec<BacklogRecord> = (1..=6).map(|day| record(day, 40 + 10 * u64::from(day))).collect();
    let history = SampleHistory::from_records(records).unwrap();

    let runner = SimulationRunner::new(test_config(100, 1));
    let err = runner.run_parallel(&history.source()).unwrap_err();

    match &err {
        RunError::IncreasingBacklog {
            partial,
            completed_runs,
        } => {
            assert_eq!(*completed_runs, 11, "sequential abort fires at run 11");
            assert_eq!(partial.failure_count(), 11);
            assert_eq!(partial.success_count(), 0);
        }
        RunError::Timeout { .. } => panic!("expected IncreasingBacklog abort"),
    }

    // The aborted run still produces a usable (estimate-less) report.
    let outcome: std::result::Result<Distribution, RunError> = Err(err);
    let report = ForecastReport::from_outcome(&outcome, 100, true, Utc::now());
    assert_eq!(report.aborted, Some(AbortKind::IncreasingBacklog));
    assert_eq!(report.median_seconds, None);
    assert_eq!(report.estimated_completion, None);
    assert!(report.summary_line().contains("aborted (increasing_backlog)"));
}

#[test]
fn exhausted_budget_aborts_with_partial_distribution() {
    let counts = [80_u64, 75, 72, 66, 60];
    let records: Vec<BacklogRecord> = counts
        .iter()
        .enumerate()
        .map(|(i, &count)| record(u32::try_from(i).unwrap() + 1, count))
        .collect();
    let history = SampleHistory::from_records(records).unwrap();

    let mut config = test_config(1_000_000, 2);
    config.time_limit_seconds = 0;
    let runner = SimulationRunner::new(config);

    let err = runner.run_parallel(&history.source()).unwrap_err();
    match &err {
        RunError::Timeout { partial, .. } => {
            assert!(partial.failure_count() >= 1);
            assert!(
                partial.total_runs() < 1_000_000,
                "abort must stop new iterations"
            );
        }
        RunError::IncreasingBacklog { .. } => panic!("expected Timeout abort"),
    }

    let report = ForecastReport::from_outcome(&Err(err), 1_000_000, true, Utc::now());
    assert_eq!(report.aborted, Some(AbortKind::Timeout));
}

#[test]
fn json_history_file_drives_full_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.json");
    std::fs::write(
        &path,
        r#"[
            {"when": "2024-06-01T00:00:00Z", "count": 30},
            {"when": "2024-06-02T00:00:00Z", "count": 20},
            {"when": "2024-06-03T00:00:00Z", "count": 10}
        ]"#,
    )
    .unwrap();

    let history = SampleHistory::load_json(&path).unwrap();
    let runner = SimulationRunner::new(test_config(500, 2));
    let outcome = runner.run_parallel(&history.source());

    let generated_at = Utc.with_ymd_and_hms(2024, 6, 3, 0, 0, 0).unwrap();
    let report = ForecastReport::from_outcome(&outcome, 500, true, generated_at);

    assert_eq!(report.aborted, None);
    assert_eq!(report.success_count, 500);
    // Uniform 10-per-day drain from 10 open issues: exactly one day.
    assert_eq!(report.median_seconds, Some(86_400.0));
    assert_eq!(
        report.estimated_completion,
        Some(Utc.with_ymd_and_hms(2024, 6, 4, 0, 0, 0).unwrap())
    );

    let value = report.to_json();
    assert_eq!(value["success_count"], 500);
    assert_eq!(value["aborted"], serde_json::Value::Null);
}

#[test]
fn run_events_are_logged_across_the_pipeline() {
    let dir = tempfile::tempdir().unwrap();
    let log_path = dir.path().join("runs.jsonl");
    let logger = RunLogger::open(&log_path);

    let history =
        SampleHistory::from_records(vec![record(1, 20), record(2, 10), record(3, 0)]).unwrap();
    let runner = SimulationRunner::new(test_config(200, 1));

    logger.run_started(200);
    let outcome = runner.run_parallel(&history.source());
    let report = ForecastReport::from_outcome(&outcome, 200, true, Utc::now());
    logger.run_finished(&report, 7);
    logger.flush();

    let contents = std::fs::read_to_string(&log_path).unwrap();
    let events: Vec<serde_json::Value> = contents
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();
    assert_eq!(events.len(), 2);
    assert_eq!(events[0]["event"], "run_started");
    assert_eq!(events[1]["event"], "run_completed");
    assert_eq!(events[1]["success_count"], 200);
}

#[test]
fn sequential_and_parallel_controllers_agree_on_deterministic_history() {
    // A single transition draws deterministically, so both controllers
    // produce the identical distribution.
    let history = SampleHistory::from_records(vec![record(1, 75), record(2, 50)]).unwrap();

    let mut sequential_source = history.source();
    let sequential = SimulationRunner::new(test_config(64, 1))
        .run(&mut sequential_source)
        .unwrap();
    let parallel = SimulationRunner::new(test_config(64, 4))
        .run_parallel(&history.source())
        .unwrap();

    assert_eq!(sequential, parallel);
    assert_eq!(sequential.success_count(), 64);
    // 50 open at 25/day: two draws of one day each.
    assert_eq!(sequential.buckets().get(&172_800), Some(&64));
}

#[test]
fn derived_estimate_wrappers_propagate_abort() {
    let records: Vec<BacklogRecord> = (1..=4).map(|day| record(day, 10 * u64::from(day))).collect();
    let history = SampleHistory::from_records(records).unwrap();

    let runner = SimulationRunner::new(test_config(100, 1));
    let mut source = history.source();
    match runner.run_median(&mut source, true) {
        Err(EstimateError::Run(RunError::IncreasingBacklog { .. })) => {}
        other => panic!("expected propagated IncreasingBacklog abort, got {other:?}"),
    }
}
