#![forbid(unsafe_code)]

//! backlog_forecast (blf) — Monte Carlo completion-date forecaster for issue
//! backlogs.
//!
//! Repeatedly simulates the backlog draining at its historically observed
//! rate: each iteration random-walks transition samples until the simulated
//! backlog empties, and the resulting durations aggregate into a bucketed
//! [`Distribution`](sim::Distribution) from which median/average completion
//! estimates are derived.
//!
//! # Library usage
//!
//! Use the [`prelude`] for convenient access to the most common types:
//!
//! ```rust,no_run
//! use backlog_forecast::prelude::*;
//! ```
//!
//! Individual modules can also be imported directly:
//!
//! ```rust,no_run
//! use backlog_forecast::core::config::Config;
//! use backlog_forecast::sim::runner::SimulationRunner;
//! ```

pub mod prelude;

pub mod core;
pub mod logger;
pub mod report;
pub mod sim;
pub mod source;
