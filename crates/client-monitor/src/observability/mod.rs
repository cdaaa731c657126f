//! Observability for instrumented clients.
//!
//! # Metrics
//!
//! | Metric | Type | Labels | Purpose |
//! |--------|------|--------|---------|
//! | `controller_client_request_time_seconds` | Histogram | `controller`, `verb`, `kind`, `apiVersion`, `unstructured` | Latency of client and cache calls |
//!
//! Labels never carry object names, namespaces or request ids.

pub mod metrics;

// Re-exports for convenience
pub use metrics::{
    describe_metrics, init_metrics_recorder, prometheus_builder, LatencySink, MetricsSink,
    Observation, CLIENT_REQUEST_TIME_SECONDS, FINE_GRAINED_BUCKETS,
};
