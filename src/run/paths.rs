use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::LaunchError;

pub const MARKER_FILE: &str = "pid";
pub const LOG_FILE: &str = "log.txt";
pub const RESULTS_FILE: &str = "data.csv";

const NAME_TIMESTAMP_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// File layout of one run under the data root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunPaths {
    pub dir: PathBuf,
    pub marker: PathBuf,
    pub log: PathBuf,
    pub results: PathBuf,
}

impl RunPaths {
    #[must_use]
    pub fn new(data_root: &Path, name: &str) -> Self {
        let dir = data_root.join(name);
        Self {
            marker: dir.join(MARKER_FILE),
            log: dir.join(LOG_FILE),
            results: dir.join(RESULTS_FILE),
            dir,
        }
    }

    /// Legacy runs kept `<name>.log` / `<name>.csv` next to the marker.
    pub(crate) fn legacy_files(&self, name: &str) -> [(PathBuf, &Path); 2] {
        [
            (self.dir.join(format!("{}.log", name)), self.log.as_path()),
            (self.dir.join(format!("{}.csv", name)), self.results.as_path()),
        ]
    }
}

/// Reject names that would not map to a single directory under the data root.
///
/// # Errors
///
/// Returns `LaunchError::InvalidRunName` for empty names, `.`/`..`, or
/// names containing a path separator.
pub fn validate_run_name(name: &str) -> Result<(), LaunchError> {
    let trimmed = name.trim();
    let invalid = trimmed.is_empty()
        || trimmed != name
        || name == "."
        || name == ".."
        || name.contains('/')
        || name.contains('\\');
    if invalid {
        return Err(LaunchError::InvalidRunName {
            name: name.to_owned(),
        });
    }
    Ok(())
}

/// `<YYYY-MM-DD_HH-MM-SS>_<config stem>` in local time.
#[must_use]
pub fn derive_run_name(config: &Path, now: DateTime<Local>) -> String {
    let stem = config
        .file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .filter(|stem| !stem.is_empty())
        .unwrap_or_else(|| "run".to_owned());
    format!("{}_{}", now.format(NAME_TIMESTAMP_FORMAT), stem)
}
