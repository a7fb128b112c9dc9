//! Monte Carlo simulation core: samples, single-iteration engine,
//! distribution aggregation, and the run controller.

pub mod distribution;
pub mod iteration;
pub mod runner;
pub mod sample;

pub use distribution::{Distribution, EmptyDistribution, bucket_key};
pub use iteration::{IterationEngine, IterationError};
pub use runner::{EstimateError, RunError, SimulationRunner};
pub use sample::{Sample, SampleSource};
