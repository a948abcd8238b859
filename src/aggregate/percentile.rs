/// Percentile of already-sorted values using linear interpolation between the
/// two closest ranks. `percent` is clamped to `0..=100`.
#[must_use]
#[expect(
    clippy::float_arithmetic,
    reason = "Interpolated percentiles are fractional by definition"
)]
pub fn percentile(sorted: &[i64], percent: f64) -> Option<f64> {
    let last = sorted.len().checked_sub(1)?;
    let rank = (percent / 100.0).clamp(0.0, 1.0) * last as f64;
    let lower = rank.floor();
    let lower_idx = (lower as usize).min(last);
    let upper_idx = lower_idx.saturating_add(1).min(last);
    let low = *sorted.get(lower_idx)? as f64;
    let high = *sorted.get(upper_idx)? as f64;
    Some(low + (high - low) * (rank - lower))
}

#[expect(clippy::float_arithmetic, reason = "Means are fractional")]
pub(super) fn mean(values: &[i64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let sum: i128 = values.iter().map(|value| i128::from(*value)).sum();
    Some(sum as f64 / values.len() as f64)
}

/// Order statistics of one group of durations.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(super) struct DurationStats {
    pub(super) count: usize,
    pub(super) min: i64,
    pub(super) max: i64,
    pub(super) mean: f64,
    pub(super) p25: f64,
    pub(super) p50: f64,
    pub(super) p75: f64,
    pub(super) p90: f64,
    pub(super) p95: f64,
    pub(super) p99: f64,
}

impl DurationStats {
    pub(super) fn from_values(mut values: Vec<i64>) -> Option<Self> {
        // Stable sort keeps input order among ties.
        values.sort();
        Some(Self {
            count: values.len(),
            min: *values.first()?,
            max: *values.last()?,
            mean: mean(&values)?,
            p25: percentile(&values, 25.0)?,
            p50: percentile(&values, 50.0)?,
            p75: percentile(&values, 75.0)?,
            p90: percentile(&values, 90.0)?,
            p95: percentile(&values, 95.0)?,
            p99: percentile(&values, 99.0)?,
        })
    }
}
