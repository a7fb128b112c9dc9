//! Sample-source implementations backing the simulation's draw contract.

pub mod history;

pub use history::{BacklogRecord, HistorySource, SampleHistory};
