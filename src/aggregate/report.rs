use serde::Serialize;

use crate::metrics::{DecodedRun, DurationField};

use super::{
    AggregateBucket, BucketWidths, ProfileRow, ThroughputPoint, bucket_width, duration_series,
    profile, throughput_series,
};

/// Runs with at least this many records skip the per-request views.
pub const RENDER_LIMIT: usize = 2000;
const MS_PER_SECOND: f64 = 1000.0;

#[must_use]
pub const fn exceeds_render_limit(records: usize) -> bool {
    records >= RENDER_LIMIT
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunSummary {
    pub requests: usize,
    pub elapsed_ms: i64,
    pub qps: f64,
    pub skipped_rows: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DetailRow {
    pub thread_name: String,
    pub sql_id: String,
    pub job_id: String,
    pub is_success: bool,
    pub result_size: i64,
    pub client_duration_ms: i64,
    pub server_duration_ms: i64,
    pub server_queue_ms: i64,
    pub server_exec_ms: i64,
}

/// One bar of the per-thread timeline, in run-relative milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TimelineBar {
    pub thread_name: String,
    pub sql_id: String,
    pub job_id: String,
    pub start_ms: i64,
    pub end_ms: i64,
    pub client_duration_ms: i64,
}

/// Everything the presentation layer shows for one run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub duration_field: DurationField,
    pub summary: RunSummary,
    pub widths: BucketWidths,
    pub duration_series: Vec<AggregateBucket>,
    pub throughput_series: Vec<ThroughputPoint>,
    pub profile: Vec<ProfileRow>,
    pub detail: Option<Vec<DetailRow>>,
    pub timeline: Option<Vec<TimelineBar>>,
}

impl Report {
    #[must_use]
    pub fn build(run: &DecodedRun, field: DurationField) -> Self {
        let records = run.records();
        let widths = bucket_width(run);
        let show_detail = !exceeds_render_limit(records.len());

        let detail = show_detail.then(|| {
            records
                .iter()
                .map(|decoded| DetailRow {
                    thread_name: decoded.record.thread_name.clone(),
                    sql_id: decoded.record.sql_id.clone(),
                    job_id: decoded.record.job_id.clone(),
                    is_success: decoded.record.is_success,
                    result_size: decoded.record.result_size,
                    client_duration_ms: decoded.record.client_duration_ms,
                    server_duration_ms: decoded.record.server_duration_ms,
                    server_queue_ms: decoded.derived.server_queue_ms,
                    server_exec_ms: decoded.derived.server_exec_ms,
                })
                .collect()
        });
        let timeline = show_detail.then(|| {
            let mut bars: Vec<TimelineBar> = records
                .iter()
                .map(|decoded| TimelineBar {
                    thread_name: decoded.record.thread_name.clone(),
                    sql_id: decoded.record.sql_id.clone(),
                    job_id: decoded.record.job_id.clone(),
                    start_ms: decoded.relative.client_start_ms,
                    end_ms: decoded.relative.client_end_ms,
                    client_duration_ms: decoded.record.client_duration_ms,
                })
                .collect();
            bars.sort_by(|left, right| {
                left.thread_name
                    .cmp(&right.thread_name)
                    .then_with(|| left.start_ms.cmp(&right.start_ms))
            });
            bars
        });

        Self {
            duration_field: field,
            summary: summarize(run),
            widths,
            duration_series: duration_series(records, field, widths.duration_ms),
            throughput_series: throughput_series(records, widths.throughput_ms),
            profile: profile(records, field),
            detail,
            timeline,
        }
    }

    #[must_use]
    pub const fn detail_suppressed(&self) -> bool {
        self.detail.is_none()
    }
}

#[expect(clippy::float_arithmetic, reason = "Rates are fractional")]
fn summarize(run: &DecodedRun) -> RunSummary {
    let elapsed_ms = run.span_ms();
    let qps = if elapsed_ms > 0 {
        run.len() as f64 * MS_PER_SECOND / elapsed_ms as f64
    } else {
        0.0
    };
    RunSummary {
        requests: run.len(),
        elapsed_ms,
        qps,
        skipped_rows: run.skipped_rows(),
    }
}
