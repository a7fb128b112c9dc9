//! Distribution aggregator: bucketed success histogram plus failure counters.
//!
//! Bucketing trades precision for a bounded, serializable summary that is
//! independent of the number of iterations: average and median are computed
//! from bucket keys and occurrence counts without retaining every individual
//! simulated duration.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Requested a summary statistic over a distribution with zero successes.
///
/// The one expected recoverable error at the reporting boundary: callers
/// catch it and publish an absent estimate instead of a computed one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("[BLF-4201] distribution holds no successful runs to summarize")]
pub struct EmptyDistribution;

/// Floor a simulated duration to its histogram bucket key.
///
/// `bucket_size` is treated as at least 1; durations are unsigned, so the
/// flooring is plain modulo arithmetic with no negative-value edge.
#[inline]
#[must_use]
pub const fn bucket_key(duration: u64, bucket_size: u64) -> u64 {
    let width = if bucket_size == 0 { 1 } else { bucket_size };
    duration - duration % width
}

/// Aggregate outcome of a simulation run.
///
/// Mutated only through [`record_success`](Self::record_success),
/// [`record_failure`](Self::record_failure), and [`merge`](Self::merge) —
/// all monotonic, commutative, and associative, so per-worker partials
/// combine into the same distribution regardless of ordering.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Distribution {
    buckets: HashMap<u64, u64>,
    success_count: u64,
    failure_count: u64,
}

impl Distribution {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one successful run under the given bucket key.
    pub fn record_success(&mut self, bucket_key: u64) {
        *self.buckets.entry(bucket_key).or_insert(0) += 1;
        self.success_count += 1;
    }

    /// Record one failed run. Failures carry no duration and no bucket.
    pub fn record_failure(&mut self) {
        self.failure_count += 1;
    }

    /// Fold another distribution into this one, bucket-wise.
    pub fn merge(&mut self, other: &Self) {
        for (&key, &count) in &other.buckets {
            *self.buckets.entry(key).or_insert(0) += count;
        }
        self.success_count += other.success_count;
        self.failure_count += other.failure_count;
    }

    #[must_use]
    pub const fn success_count(&self) -> u64 {
        self.success_count
    }

    #[must_use]
    pub const fn failure_count(&self) -> u64 {
        self.failure_count
    }

    /// Total recorded runs, successes and failures.
    #[must_use]
    pub const fn total_runs(&self) -> u64 {
        self.success_count + self.failure_count
    }

    #[must_use]
    pub const fn buckets(&self) -> &HashMap<u64, u64> {
        &self.buckets
    }

    /// Histogram as `(bucket_key, count)` pairs sorted by key ascending.
    #[must_use]
    pub fn sorted_buckets(&self) -> Vec<(u64, u64)> {
        let mut rows: Vec<(u64, u64)> = self.buckets.iter().map(|(&k, &c)| (k, c)).collect();
        rows.sort_unstable_by_key(|&(key, _)| key);
        rows
    }

    /// Weighted mean of bucket keys by their occurrence counts.
    pub fn average(&self) -> Result<f64, EmptyDistribution> {
        if self.success_count == 0 {
            return Err(EmptyDistribution);
        }
        let weighted: f64 = self
            .buckets
            .iter()
            .map(|(&key, &count)| key as f64 * count as f64)
            .sum();
        Ok(weighted / self.success_count as f64)
    }

    /// Median bucket value, by cumulative rank over the sorted histogram.
    ///
    /// For an even success count with `interpolate`, the two middle ranks'
    /// bucket keys are averaged (the linear midpoint when they differ);
    /// otherwise the raw key of the bucket holding the upper middle rank is
    /// returned. Odd counts have a single middle rank either way.
    pub fn median(&self, interpolate: bool) -> Result<f64, EmptyDistribution> {
        if self.success_count == 0 {
            return Err(EmptyDistribution);
        }
        let sorted = self.sorted_buckets();
        let n = self.success_count;
        if interpolate && n % 2 == 0 {
            let lower = key_at_rank(&sorted, n / 2);
            let upper = key_at_rank(&sorted, n / 2 + 1);
            Ok((lower as f64 + upper as f64) / 2.0)
        } else {
            Ok(key_at_rank(&sorted, n / 2 + 1) as f64)
        }
    }
}

/// Bucket key holding the 1-indexed `rank`-th success.
///
/// `rank` must be in `1..=success_count`; the walk is over buckets already
/// sorted ascending by key.
fn key_at_rank(sorted: &[(u64, u64)], rank: u64) -> u64 {
    debug_assert!(rank >= 1);
    let mut cumulative = 0_u64;
    for &(key, count) in sorted {
        cumulative += count;
        if cumulative >= rank {
            return key;
        }
    }
    // Unreachable when rank <= success_count; fall back to the top bucket.
    sorted.last().map_or(0, |&(key, _)| key)
}
