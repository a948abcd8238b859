use super::types::{FailureRate, PositiveU32};
use crate::error::ValidationError;

pub(super) fn parse_positive_u32(s: &str) -> Result<PositiveU32, ValidationError> {
    s.parse::<PositiveU32>()
}

pub(super) fn parse_failure_rate(s: &str) -> Result<FailureRate, ValidationError> {
    s.parse::<FailureRate>()
}

/// Flatten repeated and comma separated `--sql` values, dropping blanks.
/// An empty result is left for the launch to reject.
pub(crate) fn split_sql_list(values: &[String]) -> Vec<String> {
    values
        .iter()
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .collect()
}
