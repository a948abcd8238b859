use std::fs::File;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::SystemTime;

use chrono::{DateTime, Local};
use tokio::process::Command;
use tracing::{info, warn};

use super::command::{JvmSettings, LaunchRequest, WorkerInvocation};
use super::handle::RunHandle;
use super::marker::{read_marker, write_marker};
use super::paths::{RunPaths, derive_run_name, validate_run_name};
use super::{RunStatus, process};
use crate::error::LaunchError;

/// Everything known about a run from its directory alone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunInfo {
    pub name: String,
    pub paths: RunPaths,
    pub created: Option<DateTime<Local>>,
    pub status: RunStatus,
    /// Pid from the marker, if one is on disk.
    pub pid: Option<u32>,
    pub has_log: bool,
    pub has_results: bool,
}

/// Runs live in `<data_root>/<name>/`. Nothing is cached in memory; every
/// query goes back to the directory.
#[derive(Debug, Clone)]
pub struct RunStore {
    root: PathBuf,
}

impl RunStore {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn paths(&self, name: &str) -> RunPaths {
        RunPaths::new(&self.root, name)
    }

    /// Start the worker for `request` in `working_dir`.
    ///
    /// The log is truncated and receives both stdout and stderr. The pid
    /// marker is on disk before this returns. Must be called inside a tokio
    /// runtime.
    ///
    /// # Errors
    ///
    /// Returns a `LaunchError` when the request is incomplete, the run
    /// already exists, or its directory, log, process, or marker cannot be
    /// created. Nothing is left marked as running on failure.
    pub fn launch(
        &self,
        jvm: &JvmSettings,
        request: &LaunchRequest,
        working_dir: &Path,
    ) -> Result<RunHandle, LaunchError> {
        let config = request.validate()?;
        let name = match request.name.as_deref() {
            Some(name) => name.to_owned(),
            None => derive_run_name(config, Local::now()),
        };
        validate_run_name(&name)?;
        let paths = self.paths(&name);

        let results = std::path::absolute(&paths.results).map_err(|source| LaunchError::Io {
            context: "resolving results path",
            source,
        })?;
        let invocation = WorkerInvocation::build(jvm, request, &results)?;

        std::fs::create_dir_all(&self.root).map_err(|source| LaunchError::CreateRunDir {
            path: self.root.clone(),
            source,
        })?;
        match std::fs::create_dir(&paths.dir) {
            Ok(()) => {}
            Err(err) if err.kind() == std::io::ErrorKind::AlreadyExists => {
                return Err(LaunchError::RunExists { name });
            }
            Err(source) => {
                return Err(LaunchError::CreateRunDir {
                    path: paths.dir.clone(),
                    source,
                });
            }
        }

        match spawn_worker(&invocation, &paths, working_dir) {
            Ok((pid, child)) => {
                info!("Launched run '{}' (pid {}): {}", name, pid, invocation.display());
                Ok(RunHandle::owned(name, paths, pid, child))
            }
            Err(err) => {
                if let Err(cleanup) = std::fs::remove_dir_all(&paths.dir) {
                    warn!(
                        "Failed to remove run directory {} after launch failure: {}",
                        paths.dir.display(),
                        cleanup
                    );
                }
                Err(err)
            }
        }
    }

    /// A handle built from the marker, or `None` when no marker exists.
    pub async fn attach(&self, name: &str) -> Option<RunHandle> {
        if validate_run_name(name).is_err() {
            return None;
        }
        let paths = self.paths(name);
        let pid = read_marker(&paths.marker).await?;
        info!("Attached to run '{}' (pid {})", name, pid);
        Some(RunHandle::attached(name.to_owned(), paths, pid))
    }

    /// True while the run's marker exists.
    #[must_use]
    pub fn is_active(&self, name: &str) -> bool {
        validate_run_name(name).is_ok() && self.paths(name).marker.exists()
    }

    /// Resolve an existing run directory, renaming legacy file names first.
    ///
    /// # Errors
    ///
    /// Returns `InvalidRunName` or `RunMissing`.
    pub fn open(&self, name: &str) -> Result<RunPaths, LaunchError> {
        validate_run_name(name)?;
        let paths = self.paths(name);
        if !paths.dir.is_dir() {
            return Err(LaunchError::RunMissing {
                name: name.to_owned(),
            });
        }
        for (legacy, current) in paths.legacy_files(name) {
            if legacy.is_file() && !current.exists() {
                match std::fs::rename(&legacy, current) {
                    Ok(()) => info!(
                        "Renamed legacy file {} to {}",
                        legacy.display(),
                        current.display()
                    ),
                    Err(err) => warn!("Failed to rename legacy file {}: {}", legacy.display(), err),
                }
            }
        }
        Ok(paths)
    }

    /// # Errors
    ///
    /// Returns `InvalidRunName` or `RunMissing`.
    pub async fn describe(&self, name: &str) -> Result<RunInfo, LaunchError> {
        let paths = self.open(name)?;
        let created = std::fs::metadata(&paths.dir)
            .ok()
            .and_then(|meta| meta.created().or_else(|_| meta.modified()).ok())
            .map(DateTime::<Local>::from);
        let pid = read_marker(&paths.marker).await;
        let has_log = paths.log.is_file();
        let has_results = paths.results.is_file();
        let status = match pid {
            Some(pid) if process::is_alive(pid) => RunStatus::Running,
            Some(pid) => {
                warn!("Run '{}' has a stale pid marker (pid {} is gone)", name, pid);
                RunStatus::Finished
            }
            None if !has_log => RunStatus::Pending,
            None => RunStatus::Finished,
        };
        Ok(RunInfo {
            name: name.to_owned(),
            paths,
            created,
            status,
            pid,
            has_log,
            has_results,
        })
    }

    /// All runs, newest directory first.
    ///
    /// # Errors
    ///
    /// Returns `LaunchError::Io` when the data root exists but cannot be
    /// listed.
    pub async fn list(&self) -> Result<Vec<RunInfo>, LaunchError> {
        let entries = match std::fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(source) => {
                return Err(LaunchError::Io {
                    context: "listing runs",
                    source,
                });
            }
        };

        let mut names: Vec<(SystemTime, String)> = Vec::new();
        for entry in entries.flatten() {
            let Ok(meta) = entry.metadata() else {
                continue;
            };
            if !meta.is_dir() {
                continue;
            }
            let Ok(name) = entry.file_name().into_string() else {
                continue;
            };
            let modified = meta.modified().unwrap_or(SystemTime::UNIX_EPOCH);
            names.push((modified, name));
        }
        names.sort_by(|left, right| right.cmp(left));

        let mut runs = Vec::with_capacity(names.len());
        for (_, name) in names {
            match self.describe(&name).await {
                Ok(info) => runs.push(info),
                Err(err) => warn!("Skipping run '{}': {}", name, err),
            }
        }
        Ok(runs)
    }

    /// Remove a run directory. Active runs are refused.
    ///
    /// # Errors
    ///
    /// Returns `RunMissing`, `RunActive`, or `LaunchError::Io`.
    pub async fn delete(&self, name: &str) -> Result<(), LaunchError> {
        let info = self.describe(name).await?;
        if let (RunStatus::Running, Some(pid)) = (info.status, info.pid) {
            return Err(LaunchError::RunActive {
                name: name.to_owned(),
                pid,
            });
        }
        tokio::fs::remove_dir_all(&info.paths.dir)
            .await
            .map_err(|source| LaunchError::Io {
                context: "deleting run directory",
                source,
            })?;
        info!("Deleted run '{}'", name);
        Ok(())
    }
}

fn spawn_worker(
    invocation: &WorkerInvocation,
    paths: &RunPaths,
    working_dir: &Path,
) -> Result<(u32, tokio::process::Child), LaunchError> {
    let open_log = |source| LaunchError::OpenLog {
        path: paths.log.clone(),
        source,
    };
    let stdout = File::create(&paths.log).map_err(open_log)?;
    let stderr = stdout.try_clone().map_err(open_log)?;

    let mut command = Command::new(&invocation.program);
    command
        .args(&invocation.args)
        .current_dir(working_dir)
        .stdin(Stdio::null())
        .stdout(Stdio::from(stdout))
        .stderr(Stdio::from(stderr));
    // Keep terminal signals away from the worker; stopping goes through us.
    #[cfg(unix)]
    command.process_group(0);

    let mut child = command.spawn().map_err(|source| LaunchError::Spawn {
        program: invocation.program.clone(),
        source,
    })?;
    let Some(pid) = child.id() else {
        return Err(LaunchError::MissingPid);
    };
    if let Err(err) = write_marker(&paths.marker, pid) {
        if let Err(kill_err) = child.start_kill() {
            warn!("Failed to stop untracked worker pid {}: {}", pid, kill_err);
        }
        return Err(err);
    }
    Ok((pid, child))
}
