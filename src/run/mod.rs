//! Run controller: starts the worker, persists its pid marker, and lets any
//! later process attach to, stop, or wait on it.
mod command;
mod handle;
mod marker;
mod paths;
pub mod process;
mod store;

#[cfg(test)]
mod tests;

use std::fmt;

use serde::Serialize;

pub use command::{
    DEFAULT_DRIVER_PREFIXES, DEFAULT_JVM_PARAMS, DEFAULT_MAIN_CLASS, DEFAULT_PROGRAM,
    DEFAULT_TOOL_JAR, DRIVER_ENV, DriverSearch, JAVA9_OPEN_FLAG, JvmSettings, LaunchRequest,
    WorkerInvocation, split_jvm_params,
};
pub use handle::{ATTACH_POLL_INTERVAL, RunHandle, RunOutcome, StopHandle, WorkerExit};
pub use paths::{LOG_FILE, MARKER_FILE, RESULTS_FILE, RunPaths, derive_run_name, validate_run_name};
pub use store::{RunInfo, RunStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    /// Directory exists but the worker has not produced a log yet.
    Pending,
    Running,
    Finished,
    /// Ended through an explicit terminate.
    Stopped,
}

impl RunStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Running => "running",
            Self::Finished => "finished",
            Self::Stopped => "stopped",
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
