use std::collections::HashMap;
use std::path::Path;

use tokio::io::{AsyncBufReadExt, BufReader};

use crate::error::MetricsError;

use super::{RequestRecord, ServerPhases};

const THREAD_NAME: &str = "thread_name";
const SQL_ID: &str = "sql_id";
const IS_SUCCESS: &str = "is_success";
const RESULT_SIZE: &str = "result_size";
const JOB_ID: &str = "job_id";
const CLIENT_DURATION: &str = "client_duration_ms";
const SERVER_DURATION: &str = "server_duration_ms";
const CLIENT_START: &str = "client_start_ms";
const CLIENT_END: &str = "client_end_ms";
const CLIENT_REQUEST: &str = "client_request_ms";
const CLIENT_RESPONSE: &str = "client_response_ms";
const GATEWAY_START: &str = "gateway_start_ms";
const GATEWAY_END: &str = "gateway_end_ms";
const SERVER_SUBMIT: &str = "server_submit_ms";
const SERVER_START: &str = "server_start_ms";
const SERVER_END: &str = "server_end_ms";
const SERVER_PLAN: &str = "server_plan_ms";
const SERVER_DAG: &str = "server_dag_ms";
const SERVER_RESOURCE: &str = "server_resource_ms";

/// Columns every result file must carry, in the order the worker writes them.
pub const REQUIRED_COLUMNS: [&str; 16] = [
    THREAD_NAME,
    SQL_ID,
    IS_SUCCESS,
    RESULT_SIZE,
    JOB_ID,
    CLIENT_DURATION,
    SERVER_DURATION,
    CLIENT_START,
    CLIENT_END,
    CLIENT_REQUEST,
    CLIENT_RESPONSE,
    GATEWAY_START,
    GATEWAY_END,
    SERVER_SUBMIT,
    SERVER_START,
    SERVER_END,
];

#[derive(Debug, Default)]
pub struct ParsedResults {
    pub records: Vec<RequestRecord>,
    /// Rows dropped because a value could not be parsed.
    pub skipped_rows: usize,
}

/// Parse a complete result file held in memory.
///
/// # Errors
///
/// Returns [`MetricsError::EmptyRun`] for a file without even a header, as a
/// worker stopped before its first flush leaves behind, and
/// [`MetricsError::Schema`] when required columns are absent.
pub fn parse_results(text: &str) -> Result<ParsedResults, MetricsError> {
    let mut parser = ResultsParser::default();
    for line in text.lines() {
        parser.push_line(line)?;
    }
    parser.finish()
}

/// Stream a result file from disk.
///
/// # Errors
///
/// Returns an error when the file is missing or unreadable, or when its header
/// lacks required columns.
pub async fn read_results(path: &Path) -> Result<ParsedResults, MetricsError> {
    let file = tokio::fs::File::open(path).await.map_err(|err| {
        if err.kind() == std::io::ErrorKind::NotFound {
            MetricsError::ResultsMissing {
                path: path.to_path_buf(),
            }
        } else {
            MetricsError::Io {
                context: "open result file",
                source: err,
            }
        }
    })?;
    let mut reader = BufReader::new(file);
    let mut line = String::new();
    let mut parser = ResultsParser::default();

    loop {
        line.clear();
        let bytes = reader
            .read_line(&mut line)
            .await
            .map_err(|err| MetricsError::Io {
                context: "read result file",
                source: err,
            })?;
        if bytes == 0 {
            break;
        }
        parser.push_line(&line)?;
    }

    parser.finish()
}

#[derive(Debug, Default)]
struct ResultsParser {
    columns: Option<ColumnMap>,
    parsed: ParsedResults,
}

impl ResultsParser {
    fn push_line(&mut self, line: &str) -> Result<(), MetricsError> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(());
        }
        match &self.columns {
            None => {
                self.columns = Some(ColumnMap::from_header(trimmed)?);
            }
            Some(columns) => match columns.parse_row(trimmed) {
                Some(record) => self.parsed.records.push(record),
                None => {
                    self.parsed.skipped_rows = self.parsed.skipped_rows.saturating_add(1);
                }
            },
        }
        Ok(())
    }

    fn finish(self) -> Result<ParsedResults, MetricsError> {
        if self.columns.is_none() {
            return Err(MetricsError::EmptyRun);
        }
        if self.parsed.skipped_rows > 0 {
            tracing::warn!(
                "Skipped {} unparsable result rows ({} kept).",
                self.parsed.skipped_rows,
                self.parsed.records.len()
            );
        }
        Ok(self.parsed)
    }
}

#[derive(Debug)]
struct ColumnMap {
    thread_name: usize,
    sql_id: usize,
    is_success: usize,
    result_size: usize,
    job_id: usize,
    client_duration: usize,
    server_duration: usize,
    client_start: usize,
    client_end: usize,
    client_request: usize,
    client_response: usize,
    gateway_start: usize,
    gateway_end: usize,
    server_submit: usize,
    server_start: usize,
    server_end: usize,
    server_phases: Option<(usize, usize, usize)>,
}

impl ColumnMap {
    fn from_header(header: &str) -> Result<Self, MetricsError> {
        let index: HashMap<&str, usize> = split_fields(header)
            .into_iter()
            .enumerate()
            .map(|(idx, name)| (name, idx))
            .collect();
        let mut missing = Vec::new();
        let mut required = |name: &'static str| match index.get(name) {
            Some(idx) => *idx,
            None => {
                missing.push(name);
                0
            }
        };

        let columns = ColumnMap {
            thread_name: required(THREAD_NAME),
            sql_id: required(SQL_ID),
            is_success: required(IS_SUCCESS),
            result_size: required(RESULT_SIZE),
            job_id: required(JOB_ID),
            client_duration: required(CLIENT_DURATION),
            server_duration: required(SERVER_DURATION),
            client_start: required(CLIENT_START),
            client_end: required(CLIENT_END),
            client_request: required(CLIENT_REQUEST),
            client_response: required(CLIENT_RESPONSE),
            gateway_start: required(GATEWAY_START),
            gateway_end: required(GATEWAY_END),
            server_submit: required(SERVER_SUBMIT),
            server_start: required(SERVER_START),
            server_end: required(SERVER_END),
            server_phases: match (
                index.get(SERVER_PLAN),
                index.get(SERVER_DAG),
                index.get(SERVER_RESOURCE),
            ) {
                (Some(plan), Some(dag), Some(resource)) => Some((*plan, *dag, *resource)),
                _ => None,
            },
        };

        if missing.is_empty() {
            Ok(columns)
        } else {
            Err(MetricsError::Schema { missing })
        }
    }

    fn parse_row(&self, line: &str) -> Option<RequestRecord> {
        let fields = split_fields(line);
        let text = |idx: usize| fields.get(idx).copied();
        let int = |idx: usize| text(idx).and_then(parse_int);

        let server_phases = match self.server_phases {
            Some((plan, dag, resource)) => Some(ServerPhases {
                plan_ms: int(plan)?,
                dag_ms: int(dag)?,
                resource_ms: int(resource)?,
            }),
            None => None,
        };

        Some(RequestRecord {
            thread_name: text(self.thread_name)?.to_owned(),
            sql_id: text(self.sql_id)?.to_owned(),
            job_id: text(self.job_id)?.to_owned(),
            is_success: text(self.is_success).and_then(parse_bool)?,
            result_size: int(self.result_size)?,
            client_duration_ms: int(self.client_duration)?,
            server_duration_ms: int(self.server_duration)?,
            client_start_ms: int(self.client_start)?,
            client_end_ms: int(self.client_end)?,
            client_request_ms: int(self.client_request)?,
            client_response_ms: int(self.client_response)?,
            gateway_start_ms: int(self.gateway_start)?,
            gateway_end_ms: int(self.gateway_end)?,
            server_submit_ms: int(self.server_submit)?,
            server_start_ms: int(self.server_start)?,
            server_end_ms: int(self.server_end)?,
            server_phases,
        })
    }
}

fn split_fields(line: &str) -> Vec<&str> {
    line.split(',')
        .map(|value| value.trim().trim_matches('"'))
        .collect()
}

fn parse_int(value: &str) -> Option<i64> {
    if let Ok(parsed) = value.parse::<i64>() {
        return Some(parsed);
    }
    // Spreadsheet round-trips sometimes turn integers into "123.0".
    let (whole, fraction) = value.split_once('.')?;
    if fraction.chars().all(|ch| ch == '0') {
        whole.parse::<i64>().ok()
    } else {
        None
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    if value == "1" || value.eq_ignore_ascii_case("true") {
        Some(true)
    } else if value == "0" || value.eq_ignore_ascii_case("false") {
        Some(false)
    } else {
        None
    }
}
