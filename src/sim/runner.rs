//! Run controller: drives many iterations under the abort policies and feeds
//! outcomes into a [`Distribution`].
//!
//! Two controllers share the same per-iteration semantics:
//!
//! - [`SimulationRunner::run`] — the strictly sequential loop. Failure-ratio
//!   and timeout aborts are evaluated at every iteration boundary against the
//!   private distribution.
//! - [`SimulationRunner::run_parallel`] — worker threads pull iteration
//!   tickets from a shared atomic counter, accumulate private partial
//!   distributions, and synchronize only on the shared completed/failure
//!   counters the abort checks read. Once an abort fires no new iteration
//!   starts; in-flight iterations finish and the partials merge into the
//!   final (possibly partial) distribution.
//!
//! Both return run-level aborts as typed failures carrying the partial
//! distribution, so a truncated run can still be summarized.

#![allow(missing_docs)]
#![allow(clippy::cast_precision_loss)]

use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};
use std::time::Instant;

use crossbeam_channel as channel;
use thiserror::Error;

use crate::core::config::SimulationConfig;
use crate::sim::distribution::{Distribution, EmptyDistribution, bucket_key};
use crate::sim::iteration::{IterationEngine, IterationError};
use crate::sim::sample::SampleSource;

/// Terminal run-level abort, carrying the distribution accumulated so far.
#[derive(Debug, Error)]
pub enum RunError {
    #[error("[BLF-4101] run aborted after {completed_runs} runs: increasing-backlog failure ratio exceeded")]
    IncreasingBacklog {
        partial: Distribution,
        completed_runs: u64,
    },

    #[error("[BLF-4102] wall-clock time limit reached after {completed_runs} runs")]
    Timeout {
        partial: Distribution,
        completed_runs: u64,
    },
}

impl RunError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::IncreasingBacklog { .. } => "BLF-4101",
            Self::Timeout { .. } => "BLF-4102",
        }
    }

    /// The partial distribution accumulated before the abort.
    #[must_use]
    pub const fn partial(&self) -> &Distribution {
        match self {
            Self::IncreasingBacklog { partial, .. } | Self::Timeout { partial, .. } => partial,
        }
    }

    /// Consume the error, keeping the partial distribution.
    #[must_use]
    pub fn into_partial(self) -> Distribution {
        match self {
            Self::IncreasingBacklog { partial, .. } | Self::Timeout { partial, .. } => partial,
        }
    }

    /// Runs that finished (success or failure) before the abort.
    #[must_use]
    pub const fn completed_runs(&self) -> u64 {
        match self {
            Self::IncreasingBacklog { completed_runs, .. }
            | Self::Timeout { completed_runs, .. } => *completed_runs,
        }
    }
}

/// Failure of the derived average/median convenience runs: either the run
/// itself aborted, or it completed without a single success to summarize.
#[derive(Debug, Error)]
pub enum EstimateError {
    #[error(transparent)]
    Run(#[from] RunError),
    #[error(transparent)]
    Empty(#[from] EmptyDistribution),
}

// Shared abort flag values for the parallel controller.
const ABORT_NONE: u8 = 0;
const ABORT_INCREASING: u8 = 1;
const ABORT_TIMEOUT: u8 = 2;

/// Drives a configured number of simulated depletion runs.
#[derive(Debug, Clone)]
pub struct SimulationRunner {
    config: SimulationConfig,
}

impl SimulationRunner {
    #[must_use]
    pub fn new(config: SimulationConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub const fn config(&self) -> &SimulationConfig {
        &self.config
    }

    /// Run the full sequential simulation.
    ///
    /// Per-iteration failures are recorded, never propagated: an
    /// `IncreasingBacklog` iteration only aborts the run once the warm-up
    /// window has passed and the overall failure ratio exceeds the
    /// configured bound; a `Timeout` iteration aborts unconditionally.
    pub fn run<S: SampleSource>(&self, source: &mut S) -> Result<Distribution, RunError> {
        let engine = IterationEngine::new(self.config.divergence_multiplier);
        let deadline = Instant::now() + self.config.time_limit();
        let warmup = self.config.iterations as f64 * self.config.increasing_failure_threshold_ratio;
        let mut distribution = Distribution::new();

        for run in 1..=self.config.iterations {
            match engine.run(source, Some(deadline)) {
                Ok(duration) => {
                    distribution.record_success(bucket_key(duration, self.config.bucket_size_seconds));
                }
                Err(IterationError::IncreasingBacklog) => {
                    distribution.record_failure();
                    if run as f64 > warmup
                        && distribution.failure_count() as f64 / run as f64
                            > self.config.increasing_failure_ratio
                    {
                        return Err(RunError::IncreasingBacklog {
                            partial: distribution,
                            completed_runs: run,
                        });
                    }
                }
                Err(IterationError::Timeout) => {
                    distribution.record_failure();
                    return Err(RunError::Timeout {
                        partial: distribution,
                        completed_runs: run,
                    });
                }
            }
        }

        Ok(distribution)
    }

    /// Run the simulation across worker threads.
    ///
    /// Iterations are handed out as tickets from a shared counter, so no new
    /// iteration starts once an abort condition has fired; workers that are
    /// mid-iteration finish and their partial distributions are still merged.
    /// Timeout dominates a concurrent failure-ratio abort.
    pub fn run_parallel<S>(&self, source: &S) -> Result<Distribution, RunError>
    where
        S: SampleSource + Clone + Send,
    {
        let workers = self.config.workers.max(1);
        if workers == 1 {
            return self.run(&mut source.clone());
        }

        let engine = IterationEngine::new(self.config.divergence_multiplier);
        let deadline = Instant::now() + self.config.time_limit();
        let iterations = self.config.iterations;
        let warmup = iterations as f64 * self.config.increasing_failure_threshold_ratio;
        let failure_ratio = self.config.increasing_failure_ratio;
        let bucket_size = self.config.bucket_size_seconds;

        let tickets = AtomicU64::new(0);
        let completed = AtomicU64::new(0);
        let failures = AtomicU64::new(0);
        let abort = AtomicU8::new(ABORT_NONE);
        let (partial_tx, partial_rx) = channel::unbounded::<Distribution>();

        std::thread::scope(|scope| {
            for _ in 0..workers {
                let mut worker_source = source.clone();
                let partial_tx = partial_tx.clone();
                let tickets = &tickets;
                let completed = &completed;
                let failures = &failures;
                let abort = &abort;

                scope.spawn(move || {
                    let mut local = Distribution::new();
                    loop {
                        if abort.load(Ordering::Acquire) != ABORT_NONE {
                            break;
                        }
                        if tickets.fetch_add(1, Ordering::AcqRel) >= iterations {
                            break;
                        }

                        match engine.run(&mut worker_source, Some(deadline)) {
                            Ok(duration) => {
                                local.record_success(bucket_key(duration, bucket_size));
                                completed.fetch_add(1, Ordering::AcqRel);
                            }
                            Err(IterationError::IncreasingBacklog) => {
                                local.record_failure();
                                let run = completed.fetch_add(1, Ordering::AcqRel) + 1;
                                let failed = failures.fetch_add(1, Ordering::AcqRel) + 1;
                                if run as f64 > warmup && failed as f64 / run as f64 > failure_ratio
                                {
                                    let _ = abort.compare_exchange(
                                        ABORT_NONE,
                                        ABORT_INCREASING,
                                        Ordering::AcqRel,
                                        Ordering::Acquire,
                                    );
                                    break;
                                }
                            }
                            Err(IterationError::Timeout) => {
                                local.record_failure();
                                completed.fetch_add(1, Ordering::AcqRel);
                                failures.fetch_add(1, Ordering::AcqRel);
                                abort.store(ABORT_TIMEOUT, Ordering::Release);
                                break;
                            }
                        }
                    }
                    let _ = partial_tx.send(local);
                });
            }
        });
        drop(partial_tx);

        let mut merged = Distribution::new();
        for partial in partial_rx.try_iter() {
            merged.merge(&partial);
        }

        let completed_runs = merged.total_runs();
        match abort.load(Ordering::Acquire) {
            ABORT_INCREASING => Err(RunError::IncreasingBacklog {
                partial: merged,
                completed_runs,
            }),
            ABORT_TIMEOUT => Err(RunError::Timeout {
                partial: merged,
                completed_runs,
            }),
            _ => Ok(merged),
        }
    }

    /// Run the full distribution and reduce it to its weighted average.
    pub fn run_average<S: SampleSource>(&self, source: &mut S) -> Result<f64, EstimateError> {
        let distribution = self.run(source)?;
        Ok(distribution.average()?)
    }

    /// Run the full distribution and reduce it to its median.
    pub fn run_median<S: SampleSource>(
        &self,
        source: &mut S,
        interpolate: bool,
    ) -> Result<f64, EstimateError> {
        let distribution = self.run(source)?;
        Ok(distribution.median(interpolate)?)
    }
}
