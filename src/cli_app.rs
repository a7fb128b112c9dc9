//! Top-level CLI definition and dispatch.

#![allow(clippy::cast_precision_loss, clippy::cast_possible_truncation)]

use std::io::IsTerminal;
use std::path::PathBuf;
use std::time::Instant;

use clap::{Args, Parser, Subcommand};
use colored::{Colorize, control};

use backlog_forecast::core::config::Config;
use backlog_forecast::core::errors::{BlfError, Result};
use backlog_forecast::logger::RunLogger;
use backlog_forecast::report::ForecastReport;
use backlog_forecast::sim::runner::SimulationRunner;
use backlog_forecast::source::history::SampleHistory;

/// Backlog Forecast — Monte Carlo completion-date estimation.
#[derive(Debug, Parser)]
#[command(
    name = "blf",
    author,
    version,
    about = "Backlog Forecast - Monte Carlo completion estimation",
    long_about = None,
    arg_required_else_help = true
)]
pub struct Cli {
    /// Override config file path.
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Force JSON output mode.
    #[arg(long, global = true)]
    json: bool,
    /// Disable colored output.
    #[arg(long, global = true)]
    no_color: bool,
    /// Subcommand to execute.
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Clone, Subcommand)]
enum Command {
    /// Run a forecast over a backlog history file.
    Run(RunArgs),
    /// Show the effective configuration.
    Config(ConfigArgs),
}

#[derive(Debug, Clone, Args)]
struct RunArgs {
    /// Backlog history JSON file (defaults to the configured samples path).
    #[arg(long, value_name = "PATH")]
    samples: Option<PathBuf>,
    /// Override the configured iteration count.
    #[arg(long, value_name = "N")]
    iterations: Option<u64>,
    /// Override the configured bucket size in seconds.
    #[arg(long, value_name = "SECONDS")]
    bucket_size: Option<u64>,
    /// Override the configured wall-clock budget in seconds.
    #[arg(long, value_name = "SECONDS")]
    time_limit: Option<u64>,
    /// Override the configured worker-thread count.
    #[arg(long, value_name = "N")]
    workers: Option<usize>,
    /// Force the single-threaded run controller.
    #[arg(long)]
    sequential: bool,
}

#[derive(Debug, Clone, Args)]
struct ConfigArgs {
    /// Print only the resolved config file path.
    #[arg(long)]
    path: bool,
}

/// Dispatch the parsed CLI, returning the process exit code.
pub fn run(cli: &Cli) -> Result<i32> {
    if cli.no_color || !std::io::stdout().is_terminal() {
        control::set_override(false);
    }

    let config = Config::load(cli.config.as_deref())?;

    match &cli.command {
        Command::Run(args) => cmd_run(&config, args, cli.json),
        Command::Config(args) => cmd_config(&config, args, cli.json),
    }
}

fn cmd_run(config: &Config, args: &RunArgs, json: bool) -> Result<i32> {
    let mut simulation = config.simulation.clone();
    if let Some(iterations) = args.iterations {
        simulation.iterations = iterations;
    }
    if let Some(bucket_size) = args.bucket_size {
        simulation.bucket_size_seconds = bucket_size;
    }
    if let Some(time_limit) = args.time_limit {
        simulation.time_limit_seconds = time_limit;
    }
    if let Some(workers) = args.workers {
        simulation.workers = workers;
    }
    if args.sequential {
        simulation.workers = 1;
    }
    if simulation.iterations == 0 || simulation.bucket_size_seconds == 0 {
        return Err(BlfError::InvalidConfig {
            details: "iterations and bucket size must be > 0".to_string(),
        });
    }

    let samples_path = args
        .samples
        .clone()
        .unwrap_or_else(|| config.paths.samples_file.clone());
    let history = SampleHistory::load_json(&samples_path).inspect_err(|err| {
        RunLogger::open(&config.paths.jsonl_log).error(err.code(), &err.to_string());
    })?;

    let logger = RunLogger::open(&config.paths.jsonl_log);
    logger.run_started(simulation.iterations);

    let iterations = simulation.iterations;
    let runner = SimulationRunner::new(simulation);
    let started = Instant::now();
    let outcome = runner.run_parallel(&history.source());
    let duration_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);

    let report = ForecastReport::from_outcome(
        &outcome,
        iterations,
        config.report.interpolate_median,
        chrono::Utc::now(),
    );
    logger.run_finished(&report, duration_ms);
    if report.estimated_completion.is_some() {
        logger.estimate_published(&report);
    }
    logger.flush();

    if json {
        println!("{}", serde_json::to_string_pretty(&report.to_json())?);
    } else {
        render_report(&report);
    }

    Ok(if report.aborted.is_some() { 2 } else { 0 })
}

fn cmd_config(config: &Config, args: &ConfigArgs, json: bool) -> Result<i32> {
    if args.path {
        println!("{}", config.paths.config_file.display());
        return Ok(0);
    }
    if json {
        let value = serde_json::to_value(config)?;
        println!("{}", serde_json::to_string_pretty(&value)?);
    } else {
        let rendered = toml::to_string_pretty(config).map_err(|e| BlfError::Serialization {
            context: "toml",
            details: e.to_string(),
        })?;
        print!("{rendered}");
    }
    Ok(0)
}

fn render_report(report: &ForecastReport) {
    println!("{}", "Backlog forecast".bold());
    match report.aborted {
        Some(kind) => println!(
            "  status:     {}",
            format!("aborted ({})", kind.as_str()).red()
        ),
        None => println!("  status:     {}", "completed".green()),
    }
    println!(
        "  runs:       {} ok, {} failed (of {} requested)",
        report.success_count, report.failure_count, report.iterations_requested
    );
    match (report.median_seconds, report.average_seconds) {
        (Some(median), Some(average)) => {
            println!("  median:     {}", format_span(median));
            println!("  average:    {}", format_span(average));
        }
        _ => println!("  estimate:   {}", "none (no successful runs)".yellow()),
    }
    if let Some(date) = report.estimated_completion {
        println!(
            "  completion: {}",
            date.format("%Y-%m-%d").to_string().green().bold()
        );
    }

    if !report.histogram.is_empty() {
        println!("\n  {}", "distribution".bold());
        let max_runs = report
            .histogram
            .iter()
            .map(|row| row.runs)
            .max()
            .unwrap_or(1)
            .max(1);
        for row in &report.histogram {
            let width = (row.runs * 24).div_ceil(max_runs) as usize;
            println!(
                "  {:>10}  {} {}",
                format_span(row.bucket_start_seconds as f64),
                "▇".repeat(width),
                row.runs
            );
        }
    }
}

/// Seconds as a short human span.
#[allow(clippy::cast_precision_loss)]
fn format_span(seconds: f64) -> String {
    let days = seconds / 86_400.0;
    if days >= 1.0 {
        format!("{days:.1} d")
    } else {
        format!("{:.1} h", seconds / 3_600.0)
    }
}
