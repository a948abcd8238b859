use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("I/O error during {context}: {source}")]
    Io {
        context: &'static str,
        #[source]
        source: std::io::Error,
    },
    #[error("Result file '{path}' not found.")]
    ResultsMissing { path: PathBuf },
    #[error("Result file is missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<&'static str> },
    #[error("No request records found for this run.")]
    EmptyRun,
}

impl MetricsError {
    /// Empty runs are reported as warnings; everything else makes the run
    /// unanalyzable.
    #[must_use]
    pub const fn is_warning(&self) -> bool {
        matches!(self, MetricsError::EmptyRun)
    }
}
