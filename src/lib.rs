//! Run controller and metrics pipeline for JDBC stress tests.
//!
//! The `stress-runner` binary launches the Java stress worker, tracks it
//! through a pid file so any later invocation can attach to or stop it,
//! streams its log while it runs, and turns the per-request timing CSV it
//! writes into latency breakdowns, percentile series, and per-SQL profiles.
//! The library modules are what the binary is built from; their APIs follow
//! the CLI.
pub mod aggregate;
pub mod args;
pub mod config;
pub mod error;
pub mod metrics;
pub mod run;
pub mod tail;

mod app;
mod entry;
mod logger;
mod shutdown;

pub use entry::run;
