use std::path::Path;

use crate::error::MetricsError;

use super::{DecodedRecord, DerivedMetrics, RelativeTimes, RequestRecord, read_results};

/// Immutable snapshot of a run's decoded records.
#[derive(Debug, Clone)]
pub struct DecodedRun {
    records: Vec<DecodedRecord>,
    origin_ms: i64,
    end_ms: i64,
    skipped_rows: usize,
}

impl DecodedRun {
    #[must_use]
    pub fn records(&self) -> &[DecodedRecord] {
        &self.records
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Always false; an empty run never decodes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Earliest client start, in epoch milliseconds.
    #[must_use]
    pub const fn origin_ms(&self) -> i64 {
        self.origin_ms
    }

    /// Wall-clock span: latest client end minus earliest client start.
    #[must_use]
    pub const fn span_ms(&self) -> i64 {
        self.end_ms.saturating_sub(self.origin_ms)
    }

    #[must_use]
    pub const fn skipped_rows(&self) -> usize {
        self.skipped_rows
    }

    pub(crate) const fn with_skipped_rows(mut self, skipped_rows: usize) -> Self {
        self.skipped_rows = skipped_rows;
        self
    }
}

/// Compute derived and run-relative fields for every record, preserving order.
///
/// # Errors
///
/// Returns [`MetricsError::EmptyRun`] when `records` is empty.
pub fn decode(records: Vec<RequestRecord>) -> Result<DecodedRun, MetricsError> {
    let origin_ms = records
        .iter()
        .map(|record| record.client_start_ms)
        .min()
        .ok_or(MetricsError::EmptyRun)?;
    let end_ms = records
        .iter()
        .map(|record| record.client_end_ms)
        .max()
        .ok_or(MetricsError::EmptyRun)?;

    let records = records
        .into_iter()
        .map(|record| DecodedRecord {
            derived: DerivedMetrics::from_record(&record),
            relative: RelativeTimes::from_record(&record, origin_ms),
            record,
        })
        .collect();

    Ok(DecodedRun {
        records,
        origin_ms,
        end_ms,
        skipped_rows: 0,
    })
}

/// Read a result file and decode it.
///
/// # Errors
///
/// Returns an error when the file cannot be read, misses required columns, or
/// holds no records.
pub async fn load_run(path: &Path) -> Result<DecodedRun, MetricsError> {
    let parsed = read_results(path).await?;
    let skipped_rows = parsed.skipped_rows;
    Ok(decode(parsed.records)?.with_skipped_rows(skipped_rows))
}
