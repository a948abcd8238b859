//! CLI argument types and parsing helpers.
mod cli;
pub(crate) mod parsers;
mod types;


pub use cli::{
    Command, DeleteArgs, LaunchArgs, ReportArgs, ReportOptions, RunnerArgs, StatusArgs, StopArgs,
    WatchArgs,
};
pub use types::{FailureRate, OutputFormat, PositiveU32};
