mod follow;
mod launch;
mod live_view;
mod render;
mod report;
mod runs;


pub(crate) use launch::run_launch;
pub(crate) use report::run_report;
pub(crate) use runs::{run_delete, run_status, run_stop, run_watch};

use crate::config::RunnerSettings;
use crate::run::RunStore;

/// Resolved settings plus the store they point at.
pub(crate) struct AppContext {
    pub(crate) settings: RunnerSettings,
    pub(crate) store: RunStore,
}

impl AppContext {
    pub(crate) fn new(settings: RunnerSettings) -> Self {
        let store = RunStore::new(settings.data_root.clone());
        Self { settings, store }
    }
}
