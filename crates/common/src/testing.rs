//! Histogram assertions over a `metrics-util` debugging snapshot.
//!
//! [`MetricAssertion::capture`] runs a closure with a thread-local
//! [`DebuggingRecorder`] installed, so tests never race on the global
//! recorder:
//!
//! ```rust,ignore
//! let ((), metrics) = MetricAssertion::capture(|| record_something());
//! metrics
//!     .histogram("controller_client_request_time_seconds")
//!     .with_label("verb", "Create")
//!     .assert_observation_count(1);
//! ```

use metrics_util::debugging::{DebugValue, DebuggingRecorder};
use metrics_util::MetricKind;

/// One histogram series captured from the recorder.
#[derive(Debug, Clone)]
pub struct RecordedHistogram {
    pub name: String,
    pub labels: Vec<(String, String)>,
    pub samples: Vec<f64>,
}

impl RecordedHistogram {
    fn has_label(&self, key: &str, value: &str) -> bool {
        self.labels.iter().any(|(k, v)| k == key && v == value)
    }
}

/// Snapshot of every histogram recorded during a capture.
#[derive(Debug, Clone, Default)]
pub struct MetricAssertion {
    histograms: Vec<RecordedHistogram>,
}

impl MetricAssertion {
    /// Run `f` with a local debugging recorder and snapshot the result.
    pub fn capture<T>(f: impl FnOnce() -> T) -> (T, Self) {
        let recorder = DebuggingRecorder::new();
        let snapshotter = recorder.snapshotter();
        let output = metrics::with_local_recorder(&recorder, f);

        let histograms = snapshotter
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, _, _, _)| key.kind() == MetricKind::Histogram)
            .filter_map(|(key, _, _, value)| match value {
                DebugValue::Histogram(samples) => Some(RecordedHistogram {
                    name: key.key().name().to_string(),
                    labels: key
                        .key()
                        .labels()
                        .map(|label| (label.key().to_string(), label.value().to_string()))
                        .collect(),
                    samples: samples.into_iter().map(|sample| sample.into_inner()).collect(),
                }),
                _ => None,
            })
            .collect();

        (output, Self { histograms })
    }

    /// All captured histogram series.
    #[must_use]
    pub fn histograms(&self) -> &[RecordedHistogram] {
        &self.histograms
    }

    /// Query series of the named histogram.
    #[must_use]
    pub fn histogram(&self, name: &str) -> HistogramQuery<'_> {
        HistogramQuery {
            assertion: self,
            name: name.to_string(),
            labels: Vec::new(),
        }
    }
}

/// Filter over captured histogram series by name and label subset.
#[derive(Debug)]
pub struct HistogramQuery<'a> {
    assertion: &'a MetricAssertion,
    name: String,
    labels: Vec<(String, String)>,
}

impl HistogramQuery<'_> {
    /// Require a label value on matching series.
    #[must_use]
    pub fn with_label(mut self, key: &str, value: &str) -> Self {
        self.labels.push((key.to_string(), value.to_string()));
        self
    }

    /// Series matching the name and every required label.
    pub fn series(&self) -> impl Iterator<Item = &RecordedHistogram> {
        self.assertion.histograms.iter().filter(|histogram| {
            histogram.name == self.name
                && self
                    .labels
                    .iter()
                    .all(|(key, value)| histogram.has_label(key, value))
        })
    }

    /// Samples across all matching series.
    #[must_use]
    pub fn samples(&self) -> Vec<f64> {
        self.series()
            .flat_map(|histogram| histogram.samples.iter().copied())
            .collect()
    }

    /// Assert the number of samples recorded across matching series.
    pub fn assert_observation_count(&self, expected: usize) {
        let actual = self.samples().len();
        assert_eq!(
            actual, expected,
            "histogram `{}` with labels {:?}: expected {expected} observations, got {actual}",
            self.name, self.labels
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_filters_by_name_and_labels() {
        let ((), metrics) = MetricAssertion::capture(|| {
            metrics::histogram!("test_latency_seconds", "op" => "read").record(0.5);
            metrics::histogram!("test_latency_seconds", "op" => "read").record(0.25);
            metrics::histogram!("test_latency_seconds", "op" => "write").record(1.0);
            metrics::histogram!("other_seconds").record(2.0);
        });

        metrics
            .histogram("test_latency_seconds")
            .assert_observation_count(3);
        metrics
            .histogram("test_latency_seconds")
            .with_label("op", "read")
            .assert_observation_count(2);
        assert_eq!(
            metrics
                .histogram("test_latency_seconds")
                .with_label("op", "write")
                .samples(),
            vec![1.0]
        );
        metrics
            .histogram("test_latency_seconds")
            .with_label("op", "delete")
            .assert_observation_count(0);
    }

    #[test]
    fn test_capture_returns_closure_output() {
        let (value, metrics) = MetricAssertion::capture(|| 42);
        assert_eq!(value, 42);
        assert!(metrics.histograms().is_empty());
    }
}
