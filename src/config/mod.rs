//! Configuration loading and resolution into runner settings.
mod loader;
mod parse;
mod settings;
pub mod types;


pub use loader::{DEFAULT_JSON_CONFIG, DEFAULT_TOML_CONFIG, load_config};
pub use settings::{LaunchDefaults, RunnerSettings, resolve_settings};

#[cfg(test)]
pub(crate) use loader::load_config_file;
pub(crate) use parse::parse_duration_value;
