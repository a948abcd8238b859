use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::metrics::DurationField;

use super::parsers::{parse_failure_rate, parse_positive_u32};
use super::types::{FailureRate, OutputFormat, PositiveU32};

#[derive(Debug, Parser, Clone)]
#[command(
    version,
    about = "Launch, watch, and analyse JDBC stress runs - the worker is tracked through its pid file, so runs survive restarts of this tool."
)]
pub struct RunnerArgs {
    #[command(subcommand)]
    pub command: Command,

    /// Path to config file (TOML/JSON). Defaults to ./stress-runner.toml or ./stress-runner.json if present.
    #[arg(long, global = true, env = "STRESS_RUNNER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Directory that holds one sub-directory per run
    #[arg(long = "data-root", global = true, env = "STRESS_RUNNER_DATA_ROOT")]
    pub data_root: Option<PathBuf>,

    /// Enable verbose logging (sets log level to debug unless overridden by STRESS_RUNNER_LOG/RUST_LOG)
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    /// Disable colored log output
    #[arg(long = "no-color", global = true)]
    pub no_color: bool,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Start a worker run, then follow its log until it ends
    Launch(LaunchArgs),
    /// Follow a run started earlier, possibly by another process
    Watch(WatchArgs),
    /// Ask a running worker to terminate
    Stop(StopArgs),
    /// List runs, newest first, or show a single run
    Status(StatusArgs),
    /// Analyse the results of a run
    Report(ReportArgs),
    /// Remove a finished run and its files
    Delete(DeleteArgs),
}

impl Command {
    /// Launches in the foreground and watches stream the worker until it
    /// exits.
    #[must_use]
    pub const fn follows_worker(&self) -> bool {
        match self {
            Command::Launch(launch) => !launch.detach,
            Command::Watch(_) => true,
            Command::Stop(_) | Command::Status(_) | Command::Report(_) | Command::Delete(_) => {
                false
            }
        }
    }
}

/// Output options shared by every command that prints a report.
#[derive(Debug, Args, Clone, Copy)]
pub struct ReportOptions {
    /// Duration that drives the series and profile
    #[arg(long = "duration-field", value_enum, default_value_t = DurationField::Client)]
    pub duration_field: DurationField,

    /// Report output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub format: OutputFormat,
}

#[derive(Debug, Args, Clone)]
pub struct LaunchArgs {
    /// Worker connection config file
    #[arg(long = "conf", short = 'c')]
    pub conf: Option<PathBuf>,

    /// SQL files to execute (repeatable, comma separated lists allowed)
    #[arg(long = "sql", short = 'q')]
    pub sql: Vec<String>,

    /// Times each SQL file is executed
    #[arg(long, short = 'r', value_parser = parse_positive_u32)]
    pub repeat: Option<PositiveU32>,

    /// Worker thread count
    #[arg(long, short = 't', value_parser = parse_positive_u32)]
    pub threads: Option<PositiveU32>,

    /// Failure percentage (0-100) at which the worker aborts
    #[arg(long = "failure-rate", short = 'f', value_parser = parse_failure_rate)]
    pub failure_rate: Option<FailureRate>,

    /// Prefix passed through to the worker
    #[arg(long)]
    pub prefix: Option<String>,

    /// Extra jar appended to the classpath (repeatable)
    #[arg(long = "jar")]
    pub jars: Vec<PathBuf>,

    /// Leave the default JDBC driver off the classpath
    #[arg(long = "no-default-driver")]
    pub no_default_driver: bool,

    /// Run name (defaults to <timestamp>_<conf file stem>)
    #[arg(long)]
    pub name: Option<String>,

    /// JVM parameters, whitespace separated (e.g. "-Xmx8g -XX:+UseG1GC")
    #[arg(long = "jvm-params", allow_hyphen_values = true)]
    pub jvm_params: Option<String>,

    /// Pass the Java 9+ module opens flag
    #[arg(long)]
    pub java9: bool,

    /// Return right after the worker starts
    #[arg(long)]
    pub detach: bool,

    #[command(flatten)]
    pub report: ReportOptions,
}

#[derive(Debug, Args, Clone)]
pub struct WatchArgs {
    /// Run name
    pub name: String,

    #[command(flatten)]
    pub report: ReportOptions,
}

#[derive(Debug, Args, Clone)]
pub struct StopArgs {
    /// Run name
    pub name: String,

    /// Wait for the worker to exit
    #[arg(long)]
    pub wait: bool,
}

#[derive(Debug, Args, Clone)]
pub struct StatusArgs {
    /// Run name; lists every run when omitted
    pub name: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct ReportArgs {
    /// Run name
    pub name: String,

    #[command(flatten)]
    pub report: ReportOptions,
}

#[derive(Debug, Args, Clone)]
pub struct DeleteArgs {
    /// Run name
    pub name: String,
}
