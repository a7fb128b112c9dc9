//! BLF-prefixed error types with structured error codes.
//!
//! Run-level simulation failures carry a partial [`Distribution`] payload and
//! live in [`crate::sim::runner`]; this module is the crate-wide error type
//! for everything around the simulation core (config, IO, sample history).
//!
//! [`Distribution`]: crate::sim::distribution::Distribution

#![allow(missing_docs)]

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Shared `Result` alias for the project.
pub type Result<T> = std::result::Result<T, BlfError>;

/// Top-level error type for the backlog forecaster.
#[derive(Debug, Error)]
pub enum BlfError {
    #[error("[BLF-1001] invalid configuration: {details}")]
    InvalidConfig { details: String },

    #[error("[BLF-1002] missing configuration file: {path}")]
    MissingConfig { path: PathBuf },

    #[error("[BLF-1003] configuration parse failure in {context}: {details}")]
    ConfigParse {
        context: &'static str,
        details: String,
    },

    #[error("[BLF-2001] insufficient backlog history: need at least {needed} records, got {got}")]
    InsufficientHistory { needed: usize, got: usize },

    #[error("[BLF-2101] serialization failure in {context}: {details}")]
    Serialization {
        context: &'static str,
        details: String,
    },

    #[error("[BLF-3002] IO failure at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("[BLF-3900] runtime failure: {details}")]
    Runtime { details: String },
}

impl BlfError {
    /// Stable machine-parseable error code.
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::InvalidConfig { .. } => "BLF-1001",
            Self::MissingConfig { .. } => "BLF-1002",
            Self::ConfigParse { .. } => "BLF-1003",
            Self::InsufficientHistory { .. } => "BLF-2001",
            Self::Serialization { .. } => "BLF-2101",
            Self::Io { .. } => "BLF-3002",
            Self::Runtime { .. } => "BLF-3900",
        }
    }

    /// Whether retrying might resolve the failure.
    #[must_use]
    pub const fn is_retryable(&self) -> bool {
        matches!(self, Self::Io { .. } | Self::Runtime { .. })
    }

    /// Convenience constructor for IO errors with a known path.
    #[must_use]
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }
}

impl From<serde_json::Error> for BlfError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization {
            context: "serde_json",
            details: value.to_string(),
        }
    }
}

impl From<toml::de::Error> for BlfError {
    fn from(value: toml::de::Error) -> Self {
        Self::ConfigParse {
            context: "toml",
            details: value.to_string(),
        }
    }
}
