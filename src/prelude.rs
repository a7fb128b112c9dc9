//! Convenience re-exports for library consumers.
//!
//! ```rust,no_run
//! use backlog_forecast::prelude::*;
//! ```

// Core
pub use crate::core::config::{Config, ReportConfig, SimulationConfig};
pub use crate::core::errors::{BlfError, Result};

// Simulation
pub use crate::sim::distribution::{Distribution, EmptyDistribution, bucket_key};
pub use crate::sim::iteration::{IterationEngine, IterationError};
pub use crate::sim::runner::{EstimateError, RunError, SimulationRunner};
pub use crate::sim::sample::{Sample, SampleSource};

// Sources
pub use crate::source::history::{BacklogRecord, HistorySource, SampleHistory};

// Reporting
pub use crate::report::{AbortKind, ForecastReport};

// Logging
pub use crate::logger::RunLogger;
