use std::time::Duration;

use serde::Deserialize;

use crate::error::ValidationError;

#[derive(Debug, Default, Deserialize)]
pub struct ConfigFile {
    pub data_root: Option<String>,
    pub worker: Option<WorkerConfig>,
    pub defaults: Option<DefaultsConfig>,
    pub tail: Option<TailConfig>,
}

/// `[worker]`: how the JVM and its classpath are assembled.
#[derive(Debug, Default, Deserialize)]
pub struct WorkerConfig {
    pub program: Option<String>,
    pub jvm_params: Option<String>,
    pub java9: Option<bool>,
    pub tool_jar: Option<String>,
    pub main_class: Option<String>,
    pub driver_jar: Option<String>,
    pub driver_search_dir: Option<String>,
    pub driver_prefixes: Option<Vec<String>>,
}

/// `[defaults]`: launch values used when the command line omits them.
#[derive(Debug, Default, Deserialize)]
pub struct DefaultsConfig {
    pub repeat: Option<u32>,
    pub concurrency: Option<u32>,
    pub failure_rate: Option<u8>,
}

#[derive(Debug, Default, Deserialize)]
pub struct TailConfig {
    pub poll_interval: Option<DurationValue>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum DurationValue {
    Seconds(u64),
    Text(String),
}

impl DurationValue {
    pub(crate) fn to_duration(&self) -> Result<Duration, ValidationError> {
        match self {
            DurationValue::Seconds(secs) => {
                if *secs == 0 {
                    Err(ValidationError::DurationZero)
                } else {
                    Ok(Duration::from_secs(*secs))
                }
            }
            DurationValue::Text(text) => super::parse_duration_value(text),
        }
    }
}
