//! Client request latency metric.
//!
//! Metric: `controller_client_request_time_seconds` (histogram)
//! Labels: `controller`, `verb`, `kind`, `apiVersion`, `unstructured`
//!
//! One histogram records both live client calls and cached reads; the
//! `verb` label (`Get` vs `GetCache`) separates them. Buckets are the
//! shared [`FINE_GRAINED_BUCKETS`] sequence for every label combination.

use crate::labels::RequestLabels;
use metrics::{describe_histogram, histogram, Unit};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use tracing::{info, trace};

/// Default histogram name.
pub const CLIENT_REQUEST_TIME_SECONDS: &str = "controller_client_request_time_seconds";

pub const LABEL_CONTROLLER: &str = "controller";
pub const LABEL_VERB: &str = "verb";
pub const LABEL_KIND: &str = "kind";
pub const LABEL_API_VERSION: &str = "apiVersion";
pub const LABEL_UNSTRUCTURED: &str = "unstructured";

/// Label keys in series order.
pub const LABEL_NAMES: [&str; 5] = [
    LABEL_CONTROLLER,
    LABEL_VERB,
    LABEL_KIND,
    LABEL_API_VERSION,
    LABEL_UNSTRUCTURED,
];

/// Bucket boundaries in seconds, shared by every series.
pub const FINE_GRAINED_BUCKETS: [f64; 41] = [
    0.005, 0.01, 0.025, 0.05, 0.075, 0.1, 0.15, 0.2, 0.25, 0.3, 0.35, 0.4, 0.45, 0.5, 0.6, 0.7,
    0.8, 0.9, 1.0, 1.25, 1.5, 1.75, 2.0, 2.5, 3.0, 3.5, 4.0, 4.5, 5.0, 6.0, 7.0, 8.0, 9.0, 10.0,
    15.0, 20.0, 25.0, 30.0, 40.0, 50.0, 60.0,
];

const METRIC_DESCRIPTION: &str = "client request duration for controllers";

/// Prometheus builder with [`FINE_GRAINED_BUCKETS`] set for `metric_name`.
///
/// # Errors
///
/// Returns error if the bucket configuration is rejected.
pub fn prometheus_builder(metric_name: &str) -> Result<PrometheusBuilder, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Full(metric_name.to_string()),
            &FINE_GRAINED_BUCKETS,
        )
        .map_err(|e| format!("Failed to set client request buckets: {e}"))
}

/// Initialize the process-wide Prometheus recorder and return the handle
/// for serving metrics.
///
/// Must be called once at startup, before any client request is recorded.
///
/// # Errors
///
/// Returns error if the Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder(metric_name: &str) -> Result<PrometheusHandle, String> {
    let handle = prometheus_builder(metric_name)?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))?;

    describe_metrics(metric_name);
    info!(
        target: "client_monitor.metrics",
        metric = metric_name,
        buckets = FINE_GRAINED_BUCKETS.len(),
        "Prometheus recorder installed"
    );

    Ok(handle)
}

/// Register unit and help text for the histogram.
pub fn describe_metrics(metric_name: &str) {
    describe_histogram!(metric_name.to_string(), Unit::Seconds, METRIC_DESCRIPTION);
}

/// Destination of client request observations.
///
/// Implementations are shared by every concurrent call and must be
/// internally synchronized.
pub trait LatencySink: Send + Sync {
    fn observe(&self, labels: &RequestLabels, duration: Duration);
}

/// One recorded duration sample and its labels.
#[derive(Debug, Clone, PartialEq)]
pub struct Observation {
    pub labels: RequestLabels,
    pub duration_seconds: f64,
}

impl Observation {
    #[must_use]
    pub fn new(labels: &RequestLabels, duration: Duration) -> Self {
        Self {
            labels: labels.clone(),
            duration_seconds: duration.as_secs_f64(),
        }
    }
}

/// Records into the `metrics` facade (and whichever recorder is installed).
#[derive(Debug, Clone)]
pub struct MetricsSink {
    metric_name: String,
}

impl MetricsSink {
    #[must_use]
    pub fn new(metric_name: impl Into<String>) -> Self {
        Self {
            metric_name: metric_name.into(),
        }
    }

    #[must_use]
    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }
}

impl Default for MetricsSink {
    fn default() -> Self {
        Self::new(CLIENT_REQUEST_TIME_SECONDS)
    }
}

impl LatencySink for MetricsSink {
    fn observe(&self, labels: &RequestLabels, duration: Duration) {
        histogram!(self.metric_name.clone(),
            LABEL_CONTROLLER => labels.controller.clone(),
            LABEL_VERB => labels.verb.as_str(),
            LABEL_KIND => labels.kind.clone(),
            LABEL_API_VERSION => labels.api_version.clone(),
            LABEL_UNSTRUCTURED => labels.unstructured_label()
        )
        .record(duration.as_secs_f64());

        trace!(
            target: "client_monitor.metrics",
            controller = %labels.controller,
            verb = labels.verb.as_str(),
            kind = %labels.kind,
            duration_seconds = duration.as_secs_f64(),
            "Client request observed"
        );
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used, clippy::indexing_slicing)]
mod tests {
    use super::*;
    use crate::labels::Verb;
    use common::testing::MetricAssertion;

    fn pod_labels(verb: Verb) -> RequestLabels {
        RequestLabels {
            controller: "app".to_string(),
            verb,
            kind: "Pod".to_string(),
            api_version: "v1".to_string(),
            unstructured: false,
        }
    }

    #[test]
    fn test_buckets_are_strictly_increasing() {
        assert!(FINE_GRAINED_BUCKETS.windows(2).all(|w| w[0] < w[1]));
        assert!(FINE_GRAINED_BUCKETS.iter().all(|b| *b > 0.0));
    }

    #[test]
    fn test_metrics_sink_records_labeled_histogram() {
        let sink = MetricsSink::default();

        let ((), metrics) = MetricAssertion::capture(|| {
            sink.observe(&pod_labels(Verb::Create), Duration::from_millis(12));
            sink.observe(&pod_labels(Verb::Create), Duration::from_millis(30));
            sink.observe(&pod_labels(Verb::GetCache), Duration::from_micros(200));
        });

        let create = metrics
            .histogram(CLIENT_REQUEST_TIME_SECONDS)
            .with_label(LABEL_CONTROLLER, "app")
            .with_label(LABEL_VERB, "Create")
            .with_label(LABEL_KIND, "Pod")
            .with_label(LABEL_API_VERSION, "v1")
            .with_label(LABEL_UNSTRUCTURED, "false");
        create.assert_observation_count(2);
        assert!(create.samples().iter().all(|s| *s > 0.0));

        metrics
            .histogram(CLIENT_REQUEST_TIME_SECONDS)
            .with_label(LABEL_VERB, "GetCache")
            .assert_observation_count(1);
    }

    #[test]
    fn test_metrics_sink_label_schema() {
        let sink = MetricsSink::default();
        let ((), metrics) = MetricAssertion::capture(|| {
            sink.observe(&pod_labels(Verb::Get), Duration::from_millis(1));
        });

        let series = metrics.histograms();
        assert_eq!(series.len(), 1);
        let keys: Vec<&str> = series[0].labels.iter().map(|(k, _)| k.as_str()).collect();
        assert_eq!(keys, LABEL_NAMES.to_vec());
    }

    #[test]
    fn test_metrics_sink_custom_name() {
        let sink = MetricsSink::new("operator_client_request_time_seconds");
        assert_eq!(sink.metric_name(), "operator_client_request_time_seconds");

        let ((), metrics) = MetricAssertion::capture(|| {
            sink.observe(&pod_labels(Verb::List), Duration::from_millis(5));
        });
        metrics
            .histogram("operator_client_request_time_seconds")
            .assert_observation_count(1);
        metrics
            .histogram(CLIENT_REQUEST_TIME_SECONDS)
            .assert_observation_count(0);
    }

    #[test]
    fn test_prometheus_render_uses_fine_grained_buckets() {
        let recorder = prometheus_builder(CLIENT_REQUEST_TIME_SECONDS)
            .expect("bucket configuration should be valid")
            .build_recorder();
        let handle = recorder.handle();
        let sink = MetricsSink::default();

        metrics::with_local_recorder(&recorder, || {
            sink.observe(&pod_labels(Verb::Create), Duration::from_millis(20));
        });

        let rendered = handle.render();
        assert!(rendered.contains("controller_client_request_time_seconds_bucket"));
        assert!(rendered.contains("le=\"0.075\""));
        assert!(rendered.contains("verb=\"Create\""));
        assert!(rendered.contains("apiVersion=\"v1\""));
        assert!(rendered.contains("controller_client_request_time_seconds_count"));
    }

    #[test]
    fn test_observation_from_labels() {
        let observation = Observation::new(&pod_labels(Verb::Delete), Duration::from_millis(250));
        assert_eq!(observation.labels.verb, Verb::Delete);
        assert!((observation.duration_seconds - 0.25).abs() < f64::EPSILON);
    }
}
