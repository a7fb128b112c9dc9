//! Single-iteration engine: one simulated depletion of the backlog.
//!
//! A random walk over historical transition samples: starting from the
//! current backlog size, each drawn sample advances simulated time by its
//! `duration` and shrinks (or grows) the backlog by its `resolved` amount.
//! The walk ends when the backlog empties, returning the simulated elapsed
//! seconds, or fails via one of two guards:
//!
//! - **Divergence failsafe** — the simulated backlog grew past
//!   `divergence_multiplier ×` the highest issue count ever seen in the walk.
//!   Treated as a modeling failure, not a valid outcome.
//! - **Deadline** — the caller's wall-clock budget is exhausted.
//!
//! There is no other loop bound: a degenerate sample source (all zero
//! resolutions) walks forever, so callers performing long simulations MUST
//! supply a deadline.

#![allow(missing_docs)]
#![allow(clippy::cast_possible_wrap)]

use std::time::Instant;

use thiserror::Error;

use crate::sim::sample::SampleSource;

/// Historical divergence failsafe multiplier.
pub const DEFAULT_DIVERGENCE_MULTIPLIER: u64 = 3;

/// Why a single iteration failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum IterationError {
    #[error("simulated backlog diverged past its historical peak")]
    IncreasingBacklog,
    #[error("wall-clock deadline reached mid-iteration")]
    Timeout,
}

/// Runs one simulated depletion to completion or failure.
#[derive(Debug, Clone, Copy)]
pub struct IterationEngine {
    divergence_multiplier: u64,
}

impl Default for IterationEngine {
    fn default() -> Self {
        Self::new(DEFAULT_DIVERGENCE_MULTIPLIER)
    }
}

impl IterationEngine {
    /// `divergence_multiplier` is clamped to at least 1 (a zero multiplier
    /// would fail every non-empty walk on its first step).
    #[must_use]
    pub fn new(divergence_multiplier: u64) -> Self {
        Self {
            divergence_multiplier: divergence_multiplier.max(1),
        }
    }

    /// Simulate one backlog depletion, returning elapsed simulated seconds.
    ///
    /// An already-empty backlog returns 0 without drawing a sample. The
    /// deadline is checked before every draw; once `Instant::now()` reaches
    /// or passes it the iteration fails with [`IterationError::Timeout`] and
    /// its partial work is discarded.
    pub fn run<S: SampleSource>(
        &self,
        source: &mut S,
        deadline: Option<Instant>,
    ) -> Result<u64, IterationError> {
        let anchor = source.last_sample();
        let mut open = anchor.count as i64;
        let mut highest = open;
        let mut elapsed: u64 = 0;
        let ceiling_factor = self.divergence_multiplier as i64;

        while open > 0 {
            if let Some(deadline) = deadline
                && Instant::now() >= deadline
            {
                return Err(IterationError::Timeout);
            }

            let step = source.random_sample();
            elapsed = elapsed.saturating_add(step.duration);
            open -= step.resolved;
            highest = highest.max(step.count as i64).max(step.resolved);

            if open > highest.saturating_mul(ceiling_factor) {
                return Err(IterationError::IncreasingBacklog);
            }
        }

        Ok(elapsed)
    }
}
