//! Time-bucketed latency series, throughput series, and per-operation profiles.
mod buckets;
mod percentile;
mod profile;
mod report;


pub use buckets::{
    AggregateBucket, BucketWidths, MIN_THROUGHPUT_BUCKET_MS, TARGET_BUCKETS, ThroughputPoint,
    bucket_width, duration_series, throughput_series,
};
pub use percentile::percentile;
pub use profile::{OVERALL_LABEL, ProfileRow, ProfileScope, profile};
pub use report::{DetailRow, RENDER_LIMIT, Report, RunSummary, TimelineBar, exceeds_render_limit};
