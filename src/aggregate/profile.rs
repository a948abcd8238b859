use std::collections::BTreeMap;

use serde::Serialize;

use crate::metrics::{DecodedRecord, DurationField};

use super::percentile::DurationStats;

/// Display label of the synthetic row covering every operation.
pub const OVERALL_LABEL: &str = "-- OVERALL --";

/// Which records a profile row covers. The overall row is its own variant, so
/// an operation that happens to be named like [`OVERALL_LABEL`] stays distinct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", content = "sql_id", rename_all = "snake_case")]
pub enum ProfileScope {
    Overall,
    Operation(String),
}

impl ProfileScope {
    #[must_use]
    pub fn label(&self) -> &str {
        match self {
            ProfileScope::Overall => OVERALL_LABEL,
            ProfileScope::Operation(sql_id) => sql_id,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProfileRow {
    pub scope: ProfileScope,
    pub count: usize,
    /// Percentage of successful requests, rounded to two decimals.
    pub success_rate: f64,
    pub min: i64,
    pub p25: f64,
    pub median: f64,
    pub mean: f64,
    pub p75: f64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
    pub max: i64,
}

/// One row per operation id (sorted), preceded by the overall row. Returns an
/// empty table for no records.
#[must_use]
pub fn profile(records: &[DecodedRecord], field: DurationField) -> Vec<ProfileRow> {
    let mut groups: BTreeMap<&str, Vec<&DecodedRecord>> = BTreeMap::new();
    for record in records {
        groups
            .entry(record.record.sql_id.as_str())
            .or_default()
            .push(record);
    }

    let overall = profile_row(ProfileScope::Overall, records.iter(), field);
    let per_operation = groups.into_iter().filter_map(|(sql_id, group)| {
        profile_row(
            ProfileScope::Operation(sql_id.to_owned()),
            group.into_iter(),
            field,
        )
    });

    overall.into_iter().chain(per_operation).collect()
}

fn profile_row<'records, I>(
    scope: ProfileScope,
    records: I,
    field: DurationField,
) -> Option<ProfileRow>
where
    I: Iterator<Item = &'records DecodedRecord>,
{
    let mut values = Vec::new();
    let mut successes = 0usize;
    for record in records {
        values.push(record.duration(field));
        if record.record.is_success {
            successes = successes.saturating_add(1);
        }
    }
    let stats = DurationStats::from_values(values)?;
    Some(ProfileRow {
        scope,
        count: stats.count,
        success_rate: success_rate(successes, stats.count),
        min: stats.min,
        p25: stats.p25,
        median: stats.p50,
        mean: stats.mean,
        p75: stats.p75,
        p90: stats.p90,
        p95: stats.p95,
        p99: stats.p99,
        max: stats.max,
    })
}

#[expect(clippy::float_arithmetic, reason = "Percentages are fractional")]
fn success_rate(successes: usize, count: usize) -> f64 {
    if count == 0 {
        return 0.0;
    }
    (successes as f64 * 10_000.0 / count as f64).round() / 100.0
}
