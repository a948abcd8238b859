use serde::Serialize;

use super::DurationField;

/// One request as written by the worker. Timestamps are epoch milliseconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RequestRecord {
    pub thread_name: String,
    pub sql_id: String,
    pub job_id: String,
    pub is_success: bool,
    pub result_size: i64,
    pub client_duration_ms: i64,
    pub server_duration_ms: i64,
    pub client_start_ms: i64,
    pub client_end_ms: i64,
    pub client_request_ms: i64,
    pub client_response_ms: i64,
    pub gateway_start_ms: i64,
    pub gateway_end_ms: i64,
    pub server_submit_ms: i64,
    pub server_start_ms: i64,
    pub server_end_ms: i64,
    pub server_phases: Option<ServerPhases>,
}

/// Server-side phase timestamps. Older workers do not emit them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct ServerPhases {
    pub plan_ms: i64,
    pub dag_ms: i64,
    pub resource_ms: i64,
}

/// Latency components computed from a record's raw timestamps.
///
/// Clocks on client, gateway, and server are assumed to agree; nothing is
/// clamped, so skewed clocks show up as negative components.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DerivedMetrics {
    pub overhead_ms: i64,
    pub server_queue_ms: i64,
    pub server_exec_ms: i64,
    pub gateway_overhead_ms: i64,
    pub sdk_overhead_ms: i64,
    pub network_ms: i64,
}

impl DerivedMetrics {
    #[must_use]
    pub const fn from_record(record: &RequestRecord) -> Self {
        let overhead_ms = record
            .client_duration_ms
            .saturating_sub(record.server_duration_ms);
        let server_queue_ms = record.server_start_ms.saturating_sub(record.server_submit_ms);
        let server_exec_ms = record.server_end_ms.saturating_sub(record.server_start_ms);
        let gateway_overhead_ms = record
            .gateway_end_ms
            .saturating_sub(record.gateway_start_ms)
            .saturating_sub(server_queue_ms)
            .saturating_sub(server_exec_ms);
        let sdk_overhead_ms = record.client_duration_ms.saturating_sub(
            record
                .client_response_ms
                .saturating_sub(record.client_request_ms),
        );
        let network_ms = overhead_ms
            .saturating_sub(gateway_overhead_ms)
            .saturating_sub(sdk_overhead_ms);
        Self {
            overhead_ms,
            server_queue_ms,
            server_exec_ms,
            gateway_overhead_ms,
            sdk_overhead_ms,
            network_ms,
        }
    }
}

/// Timestamps shifted so the earliest client start of the run is zero. Only
/// used for chart axes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RelativeTimes {
    pub client_start_ms: i64,
    pub client_end_ms: i64,
    pub server_submit_ms: i64,
    pub server_start_ms: i64,
    pub server_end_ms: i64,
}

impl RelativeTimes {
    #[must_use]
    pub const fn from_record(record: &RequestRecord, origin_ms: i64) -> Self {
        Self {
            client_start_ms: record.client_start_ms.saturating_sub(origin_ms),
            client_end_ms: record.client_end_ms.saturating_sub(origin_ms),
            server_submit_ms: record.server_submit_ms.saturating_sub(origin_ms),
            server_start_ms: record.server_start_ms.saturating_sub(origin_ms),
            server_end_ms: record.server_end_ms.saturating_sub(origin_ms),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecodedRecord {
    #[serde(flatten)]
    pub record: RequestRecord,
    #[serde(flatten)]
    pub derived: DerivedMetrics,
    pub relative: RelativeTimes,
}

impl DecodedRecord {
    #[must_use]
    pub const fn duration(&self, field: DurationField) -> i64 {
        match field {
            DurationField::Client => self.record.client_duration_ms,
            DurationField::Server => self.record.server_duration_ms,
            DurationField::Overhead => self.derived.overhead_ms,
            DurationField::ServerQueue => self.derived.server_queue_ms,
            DurationField::ServerExec => self.derived.server_exec_ms,
            DurationField::GatewayOverhead => self.derived.gateway_overhead_ms,
            DurationField::SdkOverhead => self.derived.sdk_overhead_ms,
            DurationField::Network => self.derived.network_ms,
        }
    }
}
