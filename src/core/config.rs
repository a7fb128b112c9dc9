//! Configuration system: TOML file + env var overrides + documented defaults.

#![allow(missing_docs)]

use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::core::errors::{BlfError, Result};

/// Full forecaster configuration model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
#[derive(Default)]
pub struct Config {
    pub simulation: SimulationConfig,
    pub report: ReportConfig,
    pub paths: PathsConfig,
}

/// Simulation run knobs.
///
/// The ratio pair implements the two-stage abort policy: failures are
/// tolerated unconditionally during the warm-up window
/// (`run <= iterations * increasing_failure_threshold_ratio`); after it, the
/// run aborts once `failure_count / run` exceeds `increasing_failure_ratio`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimulationConfig {
    /// Target number of simulated depletion runs.
    pub iterations: u64,
    /// Histogram bucket width in seconds of simulated time.
    pub bucket_size_seconds: u64,
    /// Wall-clock budget for the whole run, in seconds.
    pub time_limit_seconds: u64,
    /// Fraction of iterations that must complete before the failure-ratio
    /// abort check activates.
    pub increasing_failure_threshold_ratio: f64,
    /// Failure fraction above which the run aborts.
    pub increasing_failure_ratio: f64,
    /// Divergence failsafe: an iteration fails once the simulated backlog
    /// exceeds this multiple of its highest observed size.
    pub divergence_multiplier: u64,
    /// Worker threads for the parallel run controller.
    pub workers: usize,
}

/// Summary-statistics knobs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ReportConfig {
    /// Interpolate the median between buckets for even success counts.
    pub interpolate_median: bool,
}

/// Filesystem paths used by blf.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct PathsConfig {
    pub config_file: PathBuf,
    pub samples_file: PathBuf,
    pub jsonl_log: PathBuf,
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            iterations: 100_000,
            bucket_size_seconds: 86_400,
            time_limit_seconds: 3_600,
            increasing_failure_threshold_ratio: 0.1,
            increasing_failure_ratio: 0.5,
            divergence_multiplier: 3,
            workers: std::thread::available_parallelism()
                .map_or(2, |n| n.get().saturating_div(2).max(1)),
        }
    }
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            interpolate_median: true,
        }
    }
}

impl Default for PathsConfig {
    fn default() -> Self {
        let home_dir = env::var_os("HOME").map_or_else(
            || {
                eprintln!("[BLF-CONFIG] WARNING: HOME not set, falling back to /tmp for data paths");
                PathBuf::from("/tmp")
            },
            PathBuf::from,
        );
        let cfg = home_dir.join(".config").join("blf").join("config.toml");
        let data = home_dir.join(".local").join("share").join("blf");
        Self {
            config_file: cfg,
            samples_file: data.join("backlog_history.json"),
            jsonl_log: data.join("runs.jsonl"),
        }
    }
}

impl SimulationConfig {
    /// Wall-clock budget as a [`Duration`].
    #[must_use]
    pub const fn time_limit(&self) -> Duration {
        Duration::from_secs(self.time_limit_seconds)
    }
}

impl Config {
    /// Default configuration path.
    #[must_use]
    pub fn default_path() -> PathBuf {
        PathsConfig::default().config_file
    }

    /// Load config from default or explicit path, then apply env overrides.
    ///
    /// Missing config file is not an error when loading from default path;
    /// defaults are used.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let path_buf = path.map_or_else(Self::default_path, Path::to_path_buf);
        let is_explicit_path = path.is_some();

        let mut cfg = if path_buf.exists() {
            let raw = fs::read_to_string(&path_buf).map_err(|source| BlfError::Io {
                path: path_buf.clone(),
                source,
            })?;
            let parsed: Self = toml::from_str(&raw)?;
            parsed
        } else if is_explicit_path {
            return Err(BlfError::MissingConfig { path: path_buf });
        } else {
            Self::default()
        };

        cfg.paths.config_file = path_buf;
        cfg.apply_env_overrides()?;
        cfg.validate()?;
        Ok(cfg)
    }

    fn apply_env_overrides(&mut self) -> Result<()> {
        self.apply_env_overrides_from(env_var)
    }

    fn apply_env_overrides_from<F>(&mut self, mut lookup: F) -> Result<()>
    where
        F: FnMut(&str) -> Option<String>,
    {
        // simulation
        set_env_u64("BLF_SIM_ITERATIONS", &mut self.simulation.iterations, &mut lookup)?;
        set_env_u64(
            "BLF_SIM_BUCKET_SIZE_SECONDS",
            &mut self.simulation.bucket_size_seconds,
            &mut lookup,
        )?;
        set_env_u64(
            "BLF_SIM_TIME_LIMIT_SECONDS",
            &mut self.simulation.time_limit_seconds,
            &mut lookup,
        )?;
        set_env_f64(
            "BLF_SIM_INCREASING_FAILURE_THRESHOLD_RATIO",
            &mut self.simulation.increasing_failure_threshold_ratio,
            &mut lookup,
        )?;
        set_env_f64(
            "BLF_SIM_INCREASING_FAILURE_RATIO",
            &mut self.simulation.increasing_failure_ratio,
            &mut lookup,
        )?;
        set_env_u64(
            "BLF_SIM_DIVERGENCE_MULTIPLIER",
            &mut self.simulation.divergence_multiplier,
            &mut lookup,
        )?;
        set_env_usize("BLF_SIM_WORKERS", &mut self.simulation.workers, &mut lookup)?;

        // report
        set_env_bool(
            "BLF_REPORT_INTERPOLATE_MEDIAN",
            &mut self.report.interpolate_median,
            &mut lookup,
        )?;

        // paths
        if let Some(raw) = lookup("BLF_PATHS_SAMPLES_FILE") {
            self.paths.samples_file = PathBuf::from(raw);
        }
        if let Some(raw) = lookup("BLF_PATHS_JSONL_LOG") {
            self.paths.jsonl_log = PathBuf::from(raw);
        }

        Ok(())
    }

    fn validate(&self) -> Result<()> {
        let sim = &self.simulation;

        for (name, val) in [
            ("iterations", sim.iterations),
            ("bucket_size_seconds", sim.bucket_size_seconds),
            ("time_limit_seconds", sim.time_limit_seconds),
        ] {
            if val == 0 {
                return Err(BlfError::InvalidConfig {
                    details: format!("simulation.{name} must be > 0"),
                });
            }
        }

        validate_ratio(
            "simulation.increasing_failure_threshold_ratio",
            sim.increasing_failure_threshold_ratio,
        )?;
        validate_ratio(
            "simulation.increasing_failure_ratio",
            sim.increasing_failure_ratio,
        )?;

        if sim.divergence_multiplier == 0 {
            return Err(BlfError::InvalidConfig {
                details: "simulation.divergence_multiplier must be >= 1".to_string(),
            });
        }
        if sim.workers == 0 {
            return Err(BlfError::InvalidConfig {
                details: "simulation.workers must be >= 1".to_string(),
            });
        }

        Ok(())
    }
}

fn validate_ratio(name: &str, value: f64) -> Result<()> {
    if !(0.0..=1.0).contains(&value) {
        return Err(BlfError::InvalidConfig {
            details: format!("{name} must be in [0,1], got {value}"),
        });
    }
    Ok(())
}

fn env_var(name: &str) -> Option<String> {
    env::var(name).ok().filter(|raw| !raw.trim().is_empty())
}

fn set_env_f64<F>(name: &str, slot: &mut f64, lookup: &mut F) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.parse::<f64>().map_err(|error| BlfError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_env_u64<F>(name: &str, slot: &mut u64, lookup: &mut F) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.parse::<u64>().map_err(|error| BlfError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_env_usize<F>(name: &str, slot: &mut usize, lookup: &mut F) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = raw.parse::<usize>().map_err(|error| BlfError::ConfigParse {
            context: "env",
            details: format!("{name}={raw:?}: {error}"),
        })?;
    }
    Ok(())
}

fn set_env_bool<F>(name: &str, slot: &mut bool, lookup: &mut F) -> Result<()>
where
    F: FnMut(&str) -> Option<String>,
{
    if let Some(raw) = lookup(name) {
        *slot = match raw.trim().to_ascii_lowercase().as_str() {
            "1" | "true" | "yes" | "on" => true,
            "0" | "false" | "no" | "off" => false,
            other => {
                return Err(BlfError::ConfigParse {
                    context: "env",
                    details: format!("{name}={other:?}: expected a boolean"),
                });
            }
        };
    }
    Ok(())
}
