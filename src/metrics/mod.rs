//! Request-record decoding: result-file parsing and derived latency fields.
mod csv;
mod decode;
mod field;
mod record;

#[cfg(test)]
mod tests;

pub use csv::{ParsedResults, REQUIRED_COLUMNS, parse_results, read_results};
pub use decode::{DecodedRun, decode, load_run};
pub use field::DurationField;
pub use record::{DecodedRecord, DerivedMetrics, RelativeTimes, RequestRecord, ServerPhases};
