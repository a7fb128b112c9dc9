//! History-backed sample source: turns an observed series of backlog sizes
//! into transition samples and draws uniformly at random from them.
//!
//! This is the default collaborator behind the [`SampleSource`] contract.
//! How observations are gathered (and any time-based draw weighting) is the
//! business of whatever produced the records; here a record is just a
//! timestamped backlog size.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_wrap, clippy::cast_sign_loss)]

use std::fs;
use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::core::errors::{BlfError, Result};
use crate::sim::sample::{Sample, SampleSource};

/// One raw observation: the open-issue count at a point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BacklogRecord {
    /// Observation timestamp.
    pub when: DateTime<Utc>,
    /// Open issues at `when`.
    pub count: u64,
}

/// An ordered backlog history reduced to transition samples.
///
/// Consecutive records become one [`Sample`] each: `duration` is the elapsed
/// seconds between them, `resolved` the net backlog shrinkage (negative when
/// the backlog grew). The newest record anchors the simulation.
#[derive(Debug, Clone)]
pub struct SampleHistory {
    anchor: Sample,
    transitions: Arc<[Sample]>,
}

impl SampleHistory {
    /// Build a history from raw records; sorts by timestamp first.
    ///
    /// Needs at least two records — a single observation has no transition
    /// to replay.
    pub fn from_records(mut records: Vec<BacklogRecord>) -> Result<Self> {
        if records.len() < 2 {
            return Err(BlfError::InsufficientHistory {
                needed: 2,
                got: records.len(),
            });
        }
        records.sort_by_key(|record| record.when);

        let transitions: Vec<Sample> = records
            .windows(2)
            .map(|pair| {
                let (prev, next) = (pair[0], pair[1]);
                let duration = (next.when - prev.when).num_seconds().max(0) as u64;
                let resolved = prev.count as i64 - next.count as i64;
                Sample::transition(next.when, next.count, resolved, duration)
            })
            .collect();

        let Some(newest) = records.last() else {
            return Err(BlfError::InsufficientHistory { needed: 2, got: 0 });
        };

        Ok(Self {
            anchor: Sample::anchor(newest.when, newest.count),
            transitions: transitions.into(),
        })
    }

    /// Load records from a JSON array file (`[{"when": ..., "count": ...}]`).
    pub fn load_json(path: &Path) -> Result<Self> {
        let raw = fs::read_to_string(path).map_err(|source| BlfError::io(path, source))?;
        let records: Vec<BacklogRecord> = serde_json::from_str(&raw)?;
        Self::from_records(records)
    }

    /// The most recent observed backlog state.
    #[must_use]
    pub const fn anchor(&self) -> Sample {
        self.anchor
    }

    /// The derived transition samples, oldest first.
    #[must_use]
    pub fn transitions(&self) -> &[Sample] {
        &self.transitions
    }

    /// A drawing source over this history. Cheap to call repeatedly: the
    /// transition slice is shared, not copied.
    #[must_use]
    pub fn source(&self) -> HistorySource {
        HistorySource {
            anchor: self.anchor,
            transitions: Arc::clone(&self.transitions),
        }
    }
}

/// Uniform-random [`SampleSource`] over a shared transition slice.
///
/// Draws use the thread-local RNG, so clones handed to worker threads draw
/// independent streams without any shared mutable state.
#[derive(Debug, Clone)]
pub struct HistorySource {
    anchor: Sample,
    transitions: Arc<[Sample]>,
}

impl SampleSource for HistorySource {
    fn last_sample(&mut self) -> Sample {
        self.anchor
    }

    fn random_sample(&mut self) -> Sample {
        // from_records guarantees a non-empty transition slice.
        let index = rand::rng().random_range(0..self.transitions.len());
        self.transitions[index]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn record(day: u32, count: u64) -> BacklogRecord {
        BacklogRecord {
            when: Utc.with_ymd_and_hms(2024, 6, day, 0, 0, 0).unwrap(),
            count,
        }
    }

    #[test]
    fn consecutive_records_become_transitions() {
        let history =
            SampleHistory::from_records(vec![record(1, 100), record(2, 90), record(3, 95)])
                .unwrap();

        let transitions = history.transitions();
        assert_eq!(transitions.len(), 2);

        // Day 1 → 2: ten issues resolved over one day.
        assert_eq!(transitions[0].resolved, 10);
        assert_eq!(transitions[0].duration, 86_400);
        assert_eq!(transitions[0].count, 90);

        // Day 2 → 3: backlog grew by five.
        assert_eq!(transitions[1].resolved, -5);
        assert_eq!(transitions[1].duration, 86_400);
        assert_eq!(transitions[1].count, 95);
    }

    #[test]
    fn anchor_is_newest_record() {
        let history =
            SampleHistory::from_records(vec![record(5, 42), record(1, 100), record(3, 70)])
                .unwrap();
        assert_eq!(history.anchor().count, 42);
        assert_eq!(
            history.anchor().when,
            Utc.with_ymd_and_hms(2024, 6, 5, 0, 0, 0).unwrap()
        );
    }

    #[test]
    fn unsorted_records_are_sorted_before_derivation() {
        let history =
            SampleHistory::from_records(vec![record(3, 80), record(1, 100), record(2, 90)])
                .unwrap();
        let transitions = history.transitions();
        // Chronological deltas regardless of input order: 100→90→80.
        assert_eq!(transitions[0].resolved, 10);
        assert_eq!(transitions[1].resolved, 10);
    }

    #[test]
    fn too_few_records_error() {
        let err = SampleHistory::from_records(vec![record(1, 10)]).unwrap_err();
        assert_eq!(err.code(), "BLF-2001");

        let err = SampleHistory::from_records(Vec::new()).unwrap_err();
        assert_eq!(err.code(), "BLF-2001");
    }

    #[test]
    fn source_draws_only_derived_transitions() {
        let history =
            SampleHistory::from_records(vec![record(1, 100), record(2, 90), record(4, 60)])
                .unwrap();
        let transitions = history.transitions().to_vec();
        let mut source = history.source();

        assert_eq!(source.last_sample(), history.anchor());
        for _ in 0..200 {
            let drawn = source.random_sample();
            assert!(
                transitions.contains(&drawn),
                "drew a sample outside the history: {drawn:?}"
            );
        }
    }

    #[test]
    fn single_transition_draws_deterministically() {
        let history = SampleHistory::from_records(vec![record(1, 10), record(2, 7)]).unwrap();
        let mut source = history.source();
        for _ in 0..10 {
            let drawn = source.random_sample();
            assert_eq!(drawn.resolved, 3);
            assert_eq!(drawn.duration, 86_400);
        }
    }

    #[test]
    fn load_json_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("history.json");
        std::fs::write(
            &path,
            r#"[
                {"when": "2024-06-01T00:00:00Z", "count": 100},
                {"when": "2024-06-02T00:00:00Z", "count": 97}
            ]"#,
        )
        .unwrap();

        let history = SampleHistory::load_json(&path).unwrap();
        assert_eq!(history.anchor().count, 97);
        assert_eq!(history.transitions().len(), 1);
        assert_eq!(history.transitions()[0].resolved, 3);
    }

    #[test]
    fn load_json_rejects_malformed_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("garbage.json");
        std::fs::write(&path, "not json at all").unwrap();
        let err = SampleHistory::load_json(&path).unwrap_err();
        assert_eq!(err.code(), "BLF-2101");
    }

    #[test]
    fn load_json_missing_file_is_io_error() {
        let err =
            SampleHistory::load_json(Path::new("/nonexistent_blf_test/history.json")).unwrap_err();
        assert_eq!(err.code(), "BLF-3002");
    }
}
