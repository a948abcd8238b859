use super::{
    DecodedRun, DurationField, RequestRecord, decode, load_run, parse_results, read_results,
};
use crate::error::MetricsError;

const WORKER_HEADER: &str = "thread_name,sql_id,is_success,result_size,job_id,client_duration_ms,server_duration_ms,client_start_ms,client_end_ms,client_request_ms,client_response_ms,gateway_start_ms,gateway_end_ms,server_submit_ms,server_start_ms,server_plan_ms,server_dag_ms,server_resource_ms,server_end_ms";

fn record(sql_id: &str, client_start_ms: i64, client_end_ms: i64) -> RequestRecord {
    RequestRecord {
        thread_name: "pool-1-thread-1".to_owned(),
        sql_id: sql_id.to_owned(),
        job_id: "job-1".to_owned(),
        is_success: true,
        result_size: 1,
        client_duration_ms: client_end_ms.saturating_sub(client_start_ms),
        server_duration_ms: 0,
        client_start_ms,
        client_end_ms,
        client_request_ms: client_start_ms,
        client_response_ms: client_end_ms,
        gateway_start_ms: client_start_ms,
        gateway_end_ms: client_end_ms,
        server_submit_ms: client_start_ms,
        server_start_ms: client_start_ms,
        server_end_ms: client_start_ms,
        server_phases: None,
    }
}

fn run_async_test<F>(future: F) -> Result<(), String>
where
    F: std::future::Future<Output = Result<(), String>>,
{
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|err| format!("Failed to build runtime: {}", err))?;
    runtime.block_on(future)
}

#[test]
fn parse_results_reads_worker_output() -> Result<(), String> {
    let text = format!(
        "{}\npool-1-thread-3,q1.sql,true,42,job_7,120,80,1000,1120,1005,1115,1010,1110,1012,1020,1030,1040,1050,1100\n",
        WORKER_HEADER
    );
    let parsed = parse_results(&text).map_err(|err| err.to_string())?;
    let Some(first) = parsed.records.first() else {
        return Err("Expected one record".to_owned());
    };
    if first.thread_name != "pool-1-thread-3" || first.sql_id != "q1.sql" || first.job_id != "job_7"
    {
        return Err(format!("Unexpected labels: {:?}", first));
    }
    if !first.is_success || first.result_size != 42 {
        return Err("Unexpected success/result size".to_owned());
    }
    if first.client_duration_ms != 120 || first.server_end_ms != 1100 {
        return Err(format!("Unexpected timings: {:?}", first));
    }
    match first.server_phases {
        Some(phases) if phases.plan_ms == 1030 && phases.resource_ms == 1050 => Ok(()),
        other => Err(format!("Unexpected server phases: {:?}", other)),
    }
}

#[test]
fn parse_results_locates_columns_by_name() -> Result<(), String> {
    let text = "\
sql_id,job_id,thread_name,is_success,result_size,client_start_ms,client_end_ms,client_duration_ms,server_duration_ms,client_request_ms,client_response_ms,gateway_start_ms,gateway_end_ms,server_submit_ms,server_start_ms,server_end_ms
q2,j2,t2,0,-1,10,30,20,5,11,29,12,28,13,14,19
";
    let parsed = parse_results(text).map_err(|err| err.to_string())?;
    let Some(first) = parsed.records.first() else {
        return Err("Expected one record".to_owned());
    };
    if first.sql_id != "q2" || first.thread_name != "t2" || first.is_success {
        return Err(format!("Unexpected record: {:?}", first));
    }
    if first.result_size != -1 || first.client_end_ms != 30 || first.server_phases.is_some() {
        return Err(format!("Unexpected record: {:?}", first));
    }
    Ok(())
}

#[test]
fn parse_results_reports_missing_columns() -> Result<(), String> {
    let text = "thread_name,sql_id,is_success\nt,q,true\n";
    match parse_results(text) {
        Err(MetricsError::Schema { missing }) => {
            if missing.contains(&"client_start_ms") && !missing.contains(&"sql_id") {
                Ok(())
            } else {
                Err(format!("Unexpected missing columns: {:?}", missing))
            }
        }
        other => Err(format!("Expected schema error, got {:?}", other)),
    }
}

#[test]
fn parse_results_without_header_is_empty_run() -> Result<(), String> {
    match parse_results("\n\n") {
        Err(MetricsError::EmptyRun) => Ok(()),
        other => Err(format!("Expected empty run, got {:?}", other)),
    }
}

#[test]
fn load_run_on_zero_byte_file_only_warns() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let path = dir.path().join("data.csv");
        tokio::fs::write(&path, b"")
            .await
            .map_err(|err| format!("write failed: {}", err))?;
        match load_run(&path).await {
            Err(err) if err.is_warning() => Ok(()),
            other => Err(format!("Expected a warning-level error, got {:?}", other)),
        }
    })
}

#[test]
fn parse_results_skips_unparsable_rows() -> Result<(), String> {
    let text = format!(
        "{}\nt,q,true,1,j,10,5,0,10,1,9,2,8,3,4,4,4,4,7\nt,q,maybe,1,j,10,5,0,10,1,9,2,8,3,4,4,4,4,7\nt,q,true,1,j\n",
        WORKER_HEADER
    );
    let parsed = parse_results(&text).map_err(|err| err.to_string())?;
    if parsed.records.len() == 1 && parsed.skipped_rows == 2 {
        Ok(())
    } else {
        Err(format!(
            "Expected 1 record and 2 skipped, got {} and {}",
            parsed.records.len(),
            parsed.skipped_rows
        ))
    }
}

#[test]
fn decode_rejects_empty_run() -> Result<(), String> {
    let parsed = parse_results(WORKER_HEADER).map_err(|err| err.to_string())?;
    match decode(parsed.records) {
        Err(MetricsError::EmptyRun) => Ok(()),
        other => Err(format!("Expected empty run, got {:?}", other)),
    }
}

#[test]
fn decode_computes_latency_components() -> Result<(), String> {
    let mut sample = record("q1", 1_000, 1_100);
    sample.server_duration_ms = 60;
    sample.client_request_ms = 1_005;
    sample.client_response_ms = 1_095;
    sample.gateway_start_ms = 1_010;
    sample.gateway_end_ms = 1_090;
    sample.server_submit_ms = 1_015;
    sample.server_start_ms = 1_025;
    sample.server_end_ms = 1_085;

    let run = decode(vec![sample]).map_err(|err| err.to_string())?;
    let Some(decoded) = run.records().first() else {
        return Err("Expected one decoded record".to_owned());
    };
    let derived = decoded.derived;
    // overhead 100-60, queue 1025-1015, exec 1085-1025, gateway 80-10-60,
    // sdk 100-90, network 40-10-10.
    let expected = (40, 10, 60, 10, 10, 20);
    let actual = (
        derived.overhead_ms,
        derived.server_queue_ms,
        derived.server_exec_ms,
        derived.gateway_overhead_ms,
        derived.sdk_overhead_ms,
        derived.network_ms,
    );
    if actual != expected {
        return Err(format!("Expected {:?}, got {:?}", expected, actual));
    }
    if decoded.duration(DurationField::Network) != 20
        || decoded.duration(DurationField::Client) != 100
    {
        return Err("Duration field lookup mismatch".to_owned());
    }
    Ok(())
}

#[test]
fn decode_keeps_clock_skewed_records() -> Result<(), String> {
    let mut skewed = record("q1", 0, 50);
    skewed.server_submit_ms = 30;
    skewed.server_start_ms = 20;
    skewed.server_end_ms = 40;

    let run = decode(vec![record("q1", 10, 20), skewed]).map_err(|err| err.to_string())?;
    if run.len() != 2 {
        return Err(format!("Expected 2 records, got {}", run.len()));
    }
    match run.records().get(1) {
        Some(decoded) if decoded.derived.server_queue_ms == -10 => Ok(()),
        other => Err(format!("Expected negative queue, got {:?}", other)),
    }
}

#[test]
fn decode_is_deterministic_and_order_preserving() -> Result<(), String> {
    let records = vec![record("b", 500, 900), record("a", 100, 300), record("c", 200, 250)];
    let first = decode(records.clone()).map_err(|err| err.to_string())?;
    let second = decode(records).map_err(|err| err.to_string())?;
    if first.records() != second.records() {
        return Err("Decoding twice produced different results".to_owned());
    }
    let order: Vec<&str> = first
        .records()
        .iter()
        .map(|decoded| decoded.record.sql_id.as_str())
        .collect();
    if order != ["b", "a", "c"] {
        return Err(format!("Order not preserved: {:?}", order));
    }
    Ok(())
}

#[test]
fn decode_normalizes_to_first_client_start() -> Result<(), String> {
    let run: DecodedRun = decode(vec![record("a", 1_500, 1_700), record("b", 1_000, 2_400)])
        .map_err(|err| err.to_string())?;
    if run.origin_ms() != 1_000 || run.span_ms() != 1_400 {
        return Err(format!(
            "Unexpected origin/span: {} / {}",
            run.origin_ms(),
            run.span_ms()
        ));
    }
    match run.records().first() {
        Some(decoded)
            if decoded.relative.client_start_ms == 500 && decoded.relative.client_end_ms == 700 =>
        {
            Ok(())
        }
        other => Err(format!("Unexpected relative times: {:?}", other)),
    }
}

#[test]
fn read_results_reports_missing_file() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        match read_results(&dir.path().join("data.csv")).await {
            Err(MetricsError::ResultsMissing { .. }) => Ok(()),
            other => Err(format!("Expected missing results, got {:?}", other)),
        }
    })
}

#[test]
fn load_run_streams_file_from_disk() -> Result<(), String> {
    run_async_test(async {
        let dir = tempfile::tempdir().map_err(|err| format!("tempdir failed: {}", err))?;
        let path = dir.path().join("data.csv");
        let content = format!(
            "{}\nt1,q1,true,1,j1,10,5,100,110,101,109,102,108,103,104,104,104,104,107\nt2,q2,false,0,j2,20,5,105,125,106,124,107,123,108,109,109,109,109,112\nbroken\n",
            WORKER_HEADER
        );
        tokio::fs::write(&path, content)
            .await
            .map_err(|err| format!("write failed: {}", err))?;

        let run = load_run(&path).await.map_err(|err| err.to_string())?;
        if run.len() != 2 || run.skipped_rows() != 1 || run.span_ms() != 25 {
            return Err(format!(
                "Unexpected run: len {} skipped {} span {}",
                run.len(),
                run.skipped_rows(),
                run.span_ms()
            ));
        }
        Ok(())
    })
}
