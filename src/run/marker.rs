//! The pid marker: the only liveness state shared across restarts.
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::LaunchError;

const READ_ATTEMPTS: u8 = 3;
const READ_RETRY_DELAY: Duration = Duration::from_millis(20);

/// Write `pid` atomically so readers never see a half-written marker.
///
/// # Errors
///
/// Returns `LaunchError::WriteMarker` when the temporary file cannot be
/// written or renamed into place.
pub(crate) fn write_marker(path: &Path, pid: u32) -> Result<(), LaunchError> {
    let staging = staging_path(path);
    std::fs::write(&staging, pid.to_string())
        .and_then(|()| std::fs::rename(&staging, path))
        .map_err(|source| LaunchError::WriteMarker {
            path: path.to_path_buf(),
            source,
        })
}

/// Read the pid from the marker. Absence is `None`; garbage or transient
/// read errors are retried a few times and then also reported as `None`.
pub(crate) async fn read_marker(path: &Path) -> Option<u32> {
    for attempt in 1..=READ_ATTEMPTS {
        match tokio::fs::read_to_string(path).await {
            Ok(text) => match text.trim().parse::<u32>() {
                Ok(pid) if pid > 0 => return Some(pid),
                Ok(_) | Err(_) => {
                    tracing::debug!(
                        "Unreadable pid marker {} (attempt {}): {:?}",
                        path.display(),
                        attempt,
                        text
                    );
                }
            },
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return None,
            Err(err) => {
                tracing::debug!(
                    "Failed to read pid marker {} (attempt {}): {}",
                    path.display(),
                    attempt,
                    err
                );
            }
        }
        tokio::time::sleep(READ_RETRY_DELAY).await;
    }
    None
}

/// Delete the marker if it still names `pid`. Returns whether a file was
/// removed; a marker already gone or owned by another pid is left alone.
pub(crate) async fn clear_marker(path: &Path, pid: u32) -> bool {
    if read_marker(path).await != Some(pid) {
        return false;
    }
    match tokio::fs::remove_file(path).await {
        Ok(()) => true,
        Err(err) => {
            if err.kind() != std::io::ErrorKind::NotFound {
                tracing::warn!("Failed to remove pid marker {}: {}", path.display(), err);
            }
            false
        }
    }
}

fn staging_path(path: &Path) -> PathBuf {
    let mut staging = path.as_os_str().to_owned();
    staging.push(".tmp");
    PathBuf::from(staging)
}
