use std::collections::BTreeMap;

use serde::Serialize;

use crate::metrics::{DecodedRecord, DecodedRun, DurationField};

use super::percentile::DurationStats;

/// Number of time buckets a run is split into, whatever its length.
pub const TARGET_BUCKETS: i64 = 300;
/// Throughput buckets are never narrower than one second.
pub const MIN_THROUGHPUT_BUCKET_MS: i64 = 1000;
/// Runs shorter than `TARGET_BUCKETS` ms would otherwise get zero-width buckets.
const MIN_DURATION_BUCKET_MS: i64 = 1;
const MS_PER_SECOND: i64 = 1000;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BucketWidths {
    pub duration_ms: i64,
    pub throughput_ms: i64,
}

/// Bucket widths for a run: the span split into [`TARGET_BUCKETS`] pieces for
/// latency, floored at [`MIN_THROUGHPUT_BUCKET_MS`] for throughput.
#[must_use]
pub fn bucket_width(run: &DecodedRun) -> BucketWidths {
    let raw = run
        .span_ms()
        .checked_div(TARGET_BUCKETS)
        .unwrap_or(MIN_DURATION_BUCKET_MS);
    let duration_ms = raw.max(MIN_DURATION_BUCKET_MS);
    BucketWidths {
        duration_ms,
        throughput_ms: duration_ms.max(MIN_THROUGHPUT_BUCKET_MS),
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregateBucket {
    /// Bucket start, run-relative milliseconds.
    pub time_ms: i64,
    pub sql_id: String,
    pub count: usize,
    pub mean: f64,
    pub min: i64,
    pub max: i64,
    pub p90: f64,
    pub p95: f64,
    pub p99: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ThroughputPoint {
    /// Bucket start, run-relative seconds.
    pub time_s: f64,
    pub count: usize,
    pub qps: f64,
}

/// Group records by (client end bucket, operation) and summarise `field`.
///
/// Buckets are keyed on the run-relative client end so the first bucket starts
/// at zero. Output is ordered by time, then operation id.
#[must_use]
pub fn duration_series(
    records: &[DecodedRecord],
    field: DurationField,
    width_ms: i64,
) -> Vec<AggregateBucket> {
    let width_ms = width_ms.max(MIN_DURATION_BUCKET_MS);
    let mut groups: BTreeMap<(i64, &str), Vec<i64>> = BTreeMap::new();
    for record in records {
        let key = (
            bucket_start(record.relative.client_end_ms, width_ms),
            record.record.sql_id.as_str(),
        );
        groups.entry(key).or_default().push(record.duration(field));
    }

    groups
        .into_iter()
        .filter_map(|((time_ms, sql_id), values)| {
            let stats = DurationStats::from_values(values)?;
            Some(AggregateBucket {
                time_ms,
                sql_id: sql_id.to_owned(),
                count: stats.count,
                mean: stats.mean,
                min: stats.min,
                max: stats.max,
                p90: stats.p90,
                p95: stats.p95,
                p99: stats.p99,
            })
        })
        .collect()
}

/// Requests per second, bucketed on run-relative client end.
#[must_use]
#[expect(clippy::float_arithmetic, reason = "Rates are fractional")]
pub fn throughput_series(records: &[DecodedRecord], width_ms: i64) -> Vec<ThroughputPoint> {
    let width_ms = width_ms.max(MIN_DURATION_BUCKET_MS);
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for record in records {
        let slot = counts
            .entry(bucket_start(record.relative.client_end_ms, width_ms))
            .or_default();
        *slot = slot.saturating_add(1);
    }

    let width_s = width_ms as f64 / MS_PER_SECOND as f64;
    counts
        .into_iter()
        .map(|(start_ms, count)| ThroughputPoint {
            time_s: start_ms as f64 / MS_PER_SECOND as f64,
            count,
            qps: count as f64 / width_s,
        })
        .collect()
}

const fn bucket_start(value_ms: i64, width_ms: i64) -> i64 {
    // Floor division so skewed (negative) timestamps land in earlier buckets.
    value_ms.div_euclid(width_ms).saturating_mul(width_ms)
}
