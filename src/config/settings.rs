use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, ValidationError};
use crate::run::{DriverSearch, JvmSettings, split_jvm_params};
use crate::tail::DEFAULT_POLL_INTERVAL;

use super::types::ConfigFile;

pub const DEFAULT_DATA_ROOT: &str = "data";
pub const DEFAULT_REPEAT: u32 = 100;
pub const DEFAULT_CONCURRENCY: u32 = 20;
pub const DEFAULT_FAILURE_RATE: u8 = 10;
const MAX_FAILURE_RATE: u8 = 100;

/// Launch values that apply when the command line does not set them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchDefaults {
    pub repeat: u32,
    pub concurrency: u32,
    pub failure_rate: u8,
}

impl Default for LaunchDefaults {
    fn default() -> Self {
        Self {
            repeat: DEFAULT_REPEAT,
            concurrency: DEFAULT_CONCURRENCY,
            failure_rate: DEFAULT_FAILURE_RATE,
        }
    }
}

/// Built-in defaults overlaid with the config file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunnerSettings {
    pub data_root: PathBuf,
    pub jvm: JvmSettings,
    pub driver: DriverSearch,
    pub defaults: LaunchDefaults,
    pub poll_interval: Duration,
}

impl Default for RunnerSettings {
    fn default() -> Self {
        Self {
            data_root: PathBuf::from(DEFAULT_DATA_ROOT),
            jvm: JvmSettings::default(),
            driver: DriverSearch::default(),
            defaults: LaunchDefaults::default(),
            poll_interval: DEFAULT_POLL_INTERVAL,
        }
    }
}

/// Merge the optional config file over built-in defaults. `data_root`
/// given on the command line wins over both.
///
/// # Errors
///
/// Returns `ConfigError::InvalidField` for zero counts, a failure rate above
/// 100, or an unparsable poll interval.
pub fn resolve_settings(
    config: Option<&ConfigFile>,
    data_root: Option<&Path>,
) -> Result<RunnerSettings, ConfigError> {
    let mut settings = RunnerSettings::default();

    if let Some(config) = config {
        if let Some(root) = config.data_root.as_deref() {
            settings.data_root = PathBuf::from(root);
        }

        if let Some(worker) = config.worker.as_ref() {
            let jvm = &mut settings.jvm;
            if let Some(program) = worker.program.clone() {
                jvm.program = program;
            }
            if let Some(params) = worker.jvm_params.as_deref() {
                jvm.jvm_params = split_jvm_params(params);
            }
            if let Some(java9) = worker.java9 {
                jvm.java9 = java9;
            }
            if let Some(tool_jar) = worker.tool_jar.as_deref() {
                jvm.tool_jar = PathBuf::from(tool_jar);
            }
            if let Some(main_class) = worker.main_class.clone() {
                jvm.main_class = main_class;
            }

            let driver = &mut settings.driver;
            driver.configured = worker.driver_jar.as_deref().map(PathBuf::from);
            if let Some(dir) = worker.driver_search_dir.as_deref() {
                driver.dir = PathBuf::from(dir);
            }
            if let Some(prefixes) = worker.driver_prefixes.clone() {
                driver.prefixes = prefixes;
            }
        }

        if let Some(defaults) = config.defaults.as_ref() {
            if let Some(repeat) = defaults.repeat {
                settings.defaults.repeat = ensure_positive(repeat, "defaults.repeat")?;
            }
            if let Some(concurrency) = defaults.concurrency {
                settings.defaults.concurrency =
                    ensure_positive(concurrency, "defaults.concurrency")?;
            }
            if let Some(failure_rate) = defaults.failure_rate {
                if failure_rate > MAX_FAILURE_RATE {
                    return Err(ConfigError::InvalidField {
                        field: "defaults.failure_rate",
                        source: ValidationError::ValueTooLarge {
                            max: u64::from(MAX_FAILURE_RATE),
                        },
                    });
                }
                settings.defaults.failure_rate = failure_rate;
            }
        }

        if let Some(interval) = config
            .tail
            .as_ref()
            .and_then(|tail| tail.poll_interval.as_ref())
        {
            settings.poll_interval =
                interval
                    .to_duration()
                    .map_err(|source| ConfigError::InvalidField {
                        field: "tail.poll_interval",
                        source,
                    })?;
        }
    }

    if let Some(root) = data_root {
        settings.data_root = root.to_path_buf();
    }

    Ok(settings)
}

fn ensure_positive(value: u32, field: &'static str) -> Result<u32, ConfigError> {
    if value == 0 {
        return Err(ConfigError::InvalidField {
            field,
            source: ValidationError::ValueTooSmall { min: 1 },
        });
    }
    Ok(value)
}
