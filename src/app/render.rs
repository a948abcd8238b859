//! Plain-text rendering of a run report.
use std::collections::BTreeMap;

use crate::aggregate::{
    AggregateBucket, DetailRow, ProfileRow, RENDER_LIMIT, Report, ThroughputPoint, TimelineBar,
};
use crate::run::{RunInfo, RunStatus};

const PROFILE_HEADERS: [&str; 11] = [
    "count", "success%", "min", "p25", "median", "mean", "p75", "p90", "p95", "p99", "max",
];
const NUMBER_WIDTH: usize = 10;
const CREATED_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub(crate) fn report_lines(name: &str, report: &Report) -> Vec<String> {
    let mut lines = Vec::new();
    let summary = &report.summary;
    lines.push(format!("Run: {}", name));
    lines.push(format!(
        "Requests: {}  Elapsed: {}ms  QPS: {:.2}",
        summary.requests, summary.elapsed_ms, summary.qps
    ));
    if summary.skipped_rows > 0 {
        lines.push(format!("Skipped rows: {}", summary.skipped_rows));
    }
    lines.push(format!(
        "Duration field: {}  (latency bucket {}ms, throughput bucket {}ms)",
        report.duration_field, report.widths.duration_ms, report.widths.throughput_ms
    ));

    lines.push(String::new());
    lines.push(format!("Profile ({}, ms)", report.duration_field));
    lines.extend(profile_lines(&report.profile));

    lines.push(String::new());
    lines.push("Throughput".to_owned());
    lines.extend(report.throughput_series.iter().map(throughput_line));

    lines.push(String::new());
    lines.push(format!("Latency series ({}, ms)", report.duration_field));
    lines.push(format!(
        "{:>10}  {:<24} {:>8} {:>10} {:>10} {:>10} {:>10} {:>10} {:>10}",
        "time_ms", "sql", "count", "mean", "min", "max", "p90", "p95", "p99"
    ));
    lines.extend(report.duration_series.iter().map(series_line));

    match (report.detail.as_ref(), report.timeline.as_ref()) {
        (Some(detail), Some(timeline)) => {
            lines.push(String::new());
            lines.push("Requests".to_owned());
            lines.extend(detail_lines(detail));
            lines.push(String::new());
            lines.push("Timeline (ms from run start)".to_owned());
            lines.extend(timeline_lines(timeline));
        }
        (None, _) | (_, None) => {
            lines.push(String::new());
            lines.push(format!(
                "Per-request detail and timeline hidden: {} requests (limit {}).",
                summary.requests, RENDER_LIMIT
            ));
        }
    }
    lines
}

fn profile_lines(rows: &[ProfileRow]) -> Vec<String> {
    let label_width = rows
        .iter()
        .map(|row| row.scope.label().chars().count())
        .max()
        .unwrap_or(0)
        .max("sql".len());
    let mut lines = Vec::with_capacity(rows.len().saturating_add(1));
    let columns: Vec<String> = PROFILE_HEADERS
        .iter()
        .map(|column| format!("{:>width$}", column, width = NUMBER_WIDTH))
        .collect();
    lines.push(format!(
        "{:<width$} {}",
        "sql",
        columns.join(" "),
        width = label_width
    ));
    for row in rows {
        lines.push(format!(
            "{:<lw$} {:>w$} {:>w$.2} {:>w$} {:>w$.2} {:>w$.2} {:>w$.2} {:>w$.2} {:>w$.2} {:>w$.2} {:>w$.2} {:>w$}",
            row.scope.label(),
            row.count,
            row.success_rate,
            row.min,
            row.p25,
            row.median,
            row.mean,
            row.p75,
            row.p90,
            row.p95,
            row.p99,
            row.max,
            lw = label_width,
            w = NUMBER_WIDTH,
        ));
    }
    lines
}

fn throughput_line(point: &ThroughputPoint) -> String {
    format!(
        "{:>10.1}s {:>8} req {:>10.2} qps",
        point.time_s, point.count, point.qps
    )
}

fn series_line(bucket: &AggregateBucket) -> String {
    format!(
        "{:>10}  {:<24} {:>8} {:>10.2} {:>10} {:>10} {:>10.2} {:>10.2} {:>10.2}",
        bucket.time_ms,
        bucket.sql_id,
        bucket.count,
        bucket.mean,
        bucket.min,
        bucket.max,
        bucket.p90,
        bucket.p95,
        bucket.p99
    )
}

fn detail_lines(rows: &[DetailRow]) -> Vec<String> {
    let mut lines = Vec::with_capacity(rows.len().saturating_add(1));
    lines.push(format!(
        "{:<20} {:<24} {:<24} {:>7} {:>8} {:>10} {:>10} {:>10} {:>10}",
        "thread", "sql", "job", "success", "rows", "client", "server", "queue", "exec"
    ));
    for row in rows {
        lines.push(format!(
            "{:<20} {:<24} {:<24} {:>7} {:>8} {:>10} {:>10} {:>10} {:>10}",
            row.thread_name,
            row.sql_id,
            row.job_id,
            row.is_success,
            row.result_size,
            row.client_duration_ms,
            row.server_duration_ms,
            row.server_queue_ms,
            row.server_exec_ms
        ));
    }
    lines
}

fn timeline_lines(bars: &[TimelineBar]) -> Vec<String> {
    let mut by_thread: BTreeMap<&str, Vec<&TimelineBar>> = BTreeMap::new();
    for bar in bars {
        by_thread.entry(bar.thread_name.as_str()).or_default().push(bar);
    }
    let mut lines = Vec::new();
    for (thread, thread_bars) in by_thread {
        lines.push(format!("{}:", thread));
        for bar in thread_bars {
            lines.push(format!(
                "  [{:>8} .. {:>8}] {:>6}ms {} ({})",
                bar.start_ms, bar.end_ms, bar.client_duration_ms, bar.sql_id, bar.job_id
            ));
        }
    }
    lines
}

pub(crate) fn run_list_lines(runs: &[RunInfo]) -> Vec<String> {
    if runs.is_empty() {
        return vec!["No runs found.".to_owned()];
    }
    let name_width = runs
        .iter()
        .map(|run| run.name.chars().count())
        .max()
        .unwrap_or(0)
        .max("name".len());
    let mut lines = Vec::with_capacity(runs.len().saturating_add(1));
    lines.push(format!(
        "{:<nw$}  {:<19}  {:<8}  {:>8}  {}",
        "name",
        "created",
        "status",
        "pid",
        "results",
        nw = name_width
    ));
    for run in runs {
        lines.push(format!(
            "{:<nw$}  {:<19}  {:<8}  {:>8}  {}",
            run.name,
            created_label(run),
            run.status,
            live_pid_label(run),
            if run.has_results { "yes" } else { "no" },
            nw = name_width
        ));
    }
    lines
}

pub(crate) fn run_detail_lines(run: &RunInfo) -> Vec<String> {
    vec![
        format!("Run: {}", run.name),
        format!("Created: {}", created_label(run)),
        format!("Status: {}", run.status),
        format!("Pid: {}", live_pid_label(run)),
        format!("Log: {}", run.paths.log.display()),
        format!(
            "Results: {}{}",
            run.paths.results.display(),
            if run.has_results { "" } else { " (missing)" }
        ),
    ]
}

fn created_label(run: &RunInfo) -> String {
    run.created.map_or_else(
        || "-".to_owned(),
        |created| created.format(CREATED_FORMAT).to_string(),
    )
}

fn live_pid_label(run: &RunInfo) -> String {
    if let (RunStatus::Running, Some(pid)) = (run.status, run.pid) {
        pid.to_string()
    } else {
        "-".to_owned()
    }
}
