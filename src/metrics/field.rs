use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Which duration drives the latency series and the profile table.
#[derive(Debug, Clone, Copy, Default, ValueEnum, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DurationField {
    #[default]
    Client,
    Server,
    Overhead,
    ServerQueue,
    ServerExec,
    GatewayOverhead,
    SdkOverhead,
    Network,
}

impl DurationField {
    #[must_use]
    pub const fn column_name(self) -> &'static str {
        match self {
            DurationField::Client => "client_duration_ms",
            DurationField::Server => "server_duration_ms",
            DurationField::Overhead => "overhead_ms",
            DurationField::ServerQueue => "server_queue_ms",
            DurationField::ServerExec => "server_exec_ms",
            DurationField::GatewayOverhead => "gateway_overhead_ms",
            DurationField::SdkOverhead => "sdk_overhead_ms",
            DurationField::Network => "network_ms",
        }
    }
}

impl std::fmt::Display for DurationField {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.column_name())
    }
}
