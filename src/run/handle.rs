use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use serde::Serialize;
use tokio::process::Child;
use tracing::info;

use super::marker::clear_marker;
use super::paths::RunPaths;
use super::process;
use super::RunStatus;
use crate::error::LaunchError;

/// Interval used to poll an attached pid we are not the parent of.
pub const ATTACH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// A live run. Waiting consumes the handle, so a handle has one waiter.
#[derive(Debug)]
pub struct RunHandle {
    name: String,
    pid: u32,
    paths: RunPaths,
    child: Option<Child>,
    stop_requested: Arc<AtomicBool>,
    poll_interval: Duration,
}

/// Clonable terminate-only view of a run, usable while another task waits.
#[derive(Debug, Clone)]
pub struct StopHandle {
    name: String,
    pid: u32,
    stop_requested: Arc<AtomicBool>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum WorkerExit {
    /// Exit observed on our own child.
    Exited {
        code: Option<i32>,
        signal: Option<i32>,
    },
    /// The attached pid disappeared; its exit status is not ours to read.
    Vanished,
}

impl WorkerExit {
    fn from_status(status: std::process::ExitStatus) -> Self {
        #[cfg(unix)]
        let signal = std::os::unix::process::ExitStatusExt::signal(&status);
        #[cfg(not(unix))]
        let signal = None;
        Self::Exited {
            code: status.code(),
            signal,
        }
    }

    #[cfg(unix)]
    const fn terminated_by_request(self) -> bool {
        matches!(
            self,
            Self::Exited {
                signal: Some(libc::SIGTERM),
                ..
            }
        )
    }

    #[cfg(not(unix))]
    const fn terminated_by_request(self) -> bool {
        false
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RunOutcome {
    pub name: String,
    pub pid: u32,
    pub status: RunStatus,
    pub exit: WorkerExit,
    /// Whether this waiter removed the marker.
    pub marker_cleared: bool,
}

impl RunHandle {
    pub(crate) fn owned(name: String, paths: RunPaths, pid: u32, child: Child) -> Self {
        Self {
            name,
            pid,
            paths,
            child: Some(child),
            stop_requested: Arc::new(AtomicBool::new(false)),
            poll_interval: ATTACH_POLL_INTERVAL,
        }
    }

    pub(crate) fn attached(name: String, paths: RunPaths, pid: u32) -> Self {
        Self {
            name,
            pid,
            paths,
            child: None,
            stop_requested: Arc::new(AtomicBool::new(false)),
            poll_interval: ATTACH_POLL_INTERVAL,
        }
    }

    #[must_use]
    pub const fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    #[must_use]
    pub const fn paths(&self) -> &RunPaths {
        &self.paths
    }

    /// True while the marker is on disk.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.paths.marker.exists()
    }

    #[must_use]
    pub fn stopper(&self) -> StopHandle {
        StopHandle {
            name: self.name.clone(),
            pid: self.pid,
            stop_requested: self.stop_requested.clone(),
        }
    }

    /// # Errors
    ///
    /// See [`StopHandle::terminate`].
    pub fn terminate(&self) -> Result<bool, LaunchError> {
        self.stopper().terminate()
    }

    /// Block until the worker is gone, then clear the marker if it still
    /// names this pid.
    ///
    /// # Errors
    ///
    /// Returns `LaunchError::Wait` when the exit status of our own child
    /// cannot be collected, and `LaunchError::AttachedWaitUnsupported` for an
    /// attached handle on a platform without pid probes.
    pub async fn wait(mut self) -> Result<RunOutcome, LaunchError> {
        let pid = self.pid;
        let exit = match self.child.take() {
            Some(mut child) => {
                let status = child
                    .wait()
                    .await
                    .map_err(|source| LaunchError::Wait { pid, source })?;
                WorkerExit::from_status(status)
            }
            None => {
                if !process::CAN_PROBE_PIDS {
                    return Err(LaunchError::AttachedWaitUnsupported { pid });
                }
                while process::is_alive(pid) {
                    tokio::time::sleep(self.poll_interval).await;
                }
                WorkerExit::Vanished
            }
        };

        let marker_cleared = clear_marker(&self.paths.marker, pid).await;
        let status = if self.stop_requested.load(Ordering::SeqCst) || exit.terminated_by_request()
        {
            RunStatus::Stopped
        } else {
            RunStatus::Finished
        };
        info!(
            "Run '{}' (pid {}) ended: {} ({:?})",
            self.name, pid, status, exit
        );
        Ok(RunOutcome {
            name: self.name,
            pid,
            status,
            exit,
            marker_cleared,
        })
    }
}

impl StopHandle {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub const fn pid(&self) -> u32 {
        self.pid
    }

    /// Send SIGTERM without waiting. Returns false when the worker was already
    /// gone, which is not an error; there is no kill escalation.
    ///
    /// # Errors
    ///
    /// Returns `LaunchError::Signal` when the signal is refused and
    /// `LaunchError::SignalsUnsupported` on platforms without signals.
    pub fn terminate(&self) -> Result<bool, LaunchError> {
        self.stop_requested.store(true, Ordering::SeqCst);
        let delivered = process::send_terminate(self.pid)?;
        if delivered {
            info!("Sent SIGTERM to run '{}' (pid {})", self.name, self.pid);
        } else {
            tracing::debug!("Run '{}' (pid {}) already exited", self.name, self.pid);
        }
        Ok(delivered)
    }
}
