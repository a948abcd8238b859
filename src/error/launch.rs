use std::path::PathBuf;

use thiserror::Error;

/// Failures of the run controller. A launch that fails never leaves a run
/// marked as running.
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("No config selected.")]
    NoConfigSelected,
    #[error("No SQL selected.")]
    NoSqlSelected,
    #[error("Invalid run name '{name}'. Names must be non-empty and must not contain path separators.")]
    InvalidRunName { name: String },
    #[error("Run '{name}' already exists.")]
    RunExists { name: String },
    #[error("Run '{name}' does not exist.")]
    RunMissing { name: String },
    #[error("Run '{name}' is still active (pid {pid}).")]
    RunActive { name: String, pid: u32 },
    #[error("No default driver jar found in '{dir}'. Pass --jar or --no-default-driver.")]
    DriverNotFound { dir: PathBuf },
    #[error("Failed to build classpath: {source}")]
    Classpath {
        #[source]
        source: std::env::JoinPathsError,
    },
    #[error("Failed to create run directory '{path}': {source}")]
    CreateRunDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to open log file '{path}': {source}")]
    OpenLog {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to start worker '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Worker started without a process id.")]
    MissingPid,
    #[error("Failed to write pid marker '{path}': {source}")]
    WriteMarker {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to wait for worker pid {pid}: {source}")]
    Wait {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("Failed to signal worker pid {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: std::io::Error,
    },
    #[error("Process signals are not supported on this platform.")]
    SignalsUnsupported,
    #[error("Cannot wait on attached run (pid {pid}): process probes need a unix platform.")]
    AttachedWaitUnsupported { pid: u32 },
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
}
