//! Backlog samples and the source contract the simulation draws from.

#![allow(missing_docs)]

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One observed backlog transition.
///
/// `resolved` and `duration` are relative to the preceding observation in the
/// sample's series: `resolved` is the net number of issues closed (negative
/// when the backlog grew), `duration` the elapsed seconds. Durations are
/// non-negative by construction of the type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Sample {
    /// Observation timestamp.
    pub when: DateTime<Utc>,
    /// Backlog size at `when`.
    pub count: u64,
    /// Net issues resolved since the preceding sample.
    pub resolved: i64,
    /// Seconds elapsed since the preceding sample.
    pub duration: u64,
}

impl Sample {
    /// A transition sample with explicit deltas.
    #[must_use]
    pub const fn transition(when: DateTime<Utc>, count: u64, resolved: i64, duration: u64) -> Self {
        Self {
            when,
            count,
            resolved,
            duration,
        }
    }

    /// An anchor sample: a point-in-time backlog state with no preceding
    /// observation (zero deltas).
    #[must_use]
    pub const fn anchor(when: DateTime<Utc>, count: u64) -> Self {
        Self {
            when,
            count,
            resolved: 0,
            duration: 0,
        }
    }
}

/// Supplier of backlog samples for the simulation.
///
/// `random_sample` may be invoked unboundedly many times per iteration and
/// across iterations — O(iterations × average-steps-to-empty) overall —
/// so implementations must make single draws cheap.
pub trait SampleSource {
    /// The most recent known backlog state; anchors every iteration.
    fn last_sample(&mut self) -> Sample;

    /// A freshly drawn historical transition sample.
    fn random_sample(&mut self) -> Sample;
}

impl<S: SampleSource + ?Sized> SampleSource for &mut S {
    fn last_sample(&mut self) -> Sample {
        (**self).last_sample()
    }

    fn random_sample(&mut self) -> Sample {
        (**self).random_sample()
    }
}
