mod app;
mod config;
mod launch;
mod metrics;
mod validation;

pub use app::{AppError, AppResult};
pub use config::ConfigError;
pub use launch::LaunchError;
pub use metrics::MetricsError;
pub use validation::ValidationError;
