//! Request timing.
//!
//! [`Monitor::start`] resolves the label tuple and reads the clock; the
//! returned [`RequestTimer`] records exactly one observation when it is
//! dropped. Because recording happens in `Drop`, it runs on every exit
//! path of the timed call: normal return, error return, unwinding, and
//! cancellation of the enclosing future.

use crate::caller::{CallerResolver, FixedCaller, ScopedCaller, UNKNOWN_CONTROLLER};
use crate::client::{Client, Reader};
use crate::config::{ConfigError, MonitorConfig};
use crate::instrumented::{InstrumentedCache, InstrumentedClient};
use crate::labels::{RequestLabels, Verb};
use crate::observability::metrics::{LatencySink, MetricsSink};
use common::Resource;
use std::fmt;
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

/// Shared timing context: caller resolution plus the sink observations
/// are written to.
///
/// Cheap to clone; clones share the resolver and the sink.
#[derive(Clone)]
pub struct Monitor {
    resolver: Arc<dyn CallerResolver>,
    sink: Arc<dyn LatencySink>,
    unknown_controller: Arc<str>,
}

impl fmt::Debug for Monitor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Monitor")
            .field("unknown_controller", &self.unknown_controller)
            .finish_non_exhaustive()
    }
}

impl Monitor {
    #[must_use]
    pub fn new(resolver: Arc<dyn CallerResolver>, sink: Arc<dyn LatencySink>) -> Self {
        Self {
            resolver,
            sink,
            unknown_controller: Arc::from(UNKNOWN_CONTROLLER),
        }
    }

    /// Monitor labeling every call with one controller id, recording into
    /// the `metrics` facade.
    #[must_use]
    pub fn fixed(controller: impl Into<String>) -> Self {
        Self::new(
            Arc::new(FixedCaller::new(controller)),
            Arc::new(MetricsSink::default()),
        )
    }

    /// Monitor resolving callers through the configured controller registry
    /// and recording into the configured histogram.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyControllerRegistry`] when no controller
    /// is registered.
    pub fn from_config(config: &MonitorConfig) -> Result<Self, ConfigError> {
        Self::from_config_with_sink(
            config,
            Arc::new(MetricsSink::new(config.metric_name.clone())),
        )
    }

    /// Like [`Monitor::from_config`], recording into `sink` instead.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::EmptyControllerRegistry`] when no controller
    /// is registered.
    pub fn from_config_with_sink(
        config: &MonitorConfig,
        sink: Arc<dyn LatencySink>,
    ) -> Result<Self, ConfigError> {
        if config.controllers.is_empty() {
            return Err(ConfigError::EmptyControllerRegistry);
        }

        Ok(
            Self::new(Arc::new(ScopedCaller::new(config.controllers.clone())), sink)
                .with_unknown_controller(config.unknown_controller.as_str()),
        )
    }

    /// Controller label for unidentified callers.
    #[must_use]
    pub fn with_unknown_controller(mut self, label: &str) -> Self {
        self.unknown_controller = Arc::from(label);
        self
    }

    /// Start timing a `verb` call operating on `obj`.
    ///
    /// Labels are resolved now, so mutations the call makes to `obj` do
    /// not affect them.
    #[must_use = "dropping the timer immediately records a zero-length call"]
    pub fn start(&self, verb: Verb, obj: &dyn Resource) -> RequestTimer<'_> {
        let start = Instant::now();
        let controller = self
            .resolver
            .controller_id()
            .unwrap_or_else(|| self.unknown_controller.to_string());

        RequestTimer {
            sink: self.sink.as_ref(),
            labels: RequestLabels::resolve(verb, obj, controller),
            start,
        }
    }

    /// Wrap `client` so every call is timed by this monitor.
    #[must_use]
    pub fn instrument_client<C: Client>(&self, client: C) -> InstrumentedClient<C> {
        InstrumentedClient::new(client, self.clone())
    }

    /// Wrap the read-through `cache` so every read is timed by this monitor.
    #[must_use]
    pub fn instrument_cache<R: Reader>(&self, cache: R) -> InstrumentedCache<R> {
        InstrumentedCache::new(cache, self.clone())
    }
}

/// An open measurement. Records one observation when dropped.
#[must_use = "dropping the timer immediately records a zero-length call"]
pub struct RequestTimer<'a> {
    sink: &'a dyn LatencySink,
    labels: RequestLabels,
    start: Instant,
}

impl RequestTimer<'_> {
    #[must_use]
    pub fn labels(&self) -> &RequestLabels {
        &self.labels
    }

    /// Await `call` and record its duration.
    pub async fn time<F: Future>(self, call: F) -> F::Output {
        let output = call.await;
        drop(self);
        output
    }
}

impl fmt::Debug for RequestTimer<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestTimer")
            .field("labels", &self.labels)
            .field("start", &self.start)
            .finish_non_exhaustive()
    }
}

impl Drop for RequestTimer<'_> {
    fn drop(&mut self) {
        self.sink.observe(&self.labels, self.start.elapsed());
    }
}

#[cfg(test)]
#[allow(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    clippy::panic
)]
mod tests {
    use super::*;
    use crate::caller::{sync_scope, ControllerRegistry};
    use common::testing::MetricAssertion;
    use common::{DynamicObject, TypedResource};
    use crate::observability::metrics::CLIENT_REQUEST_TIME_SECONDS;
    use std::sync::Mutex;
    use std::time::Duration;

    struct Secret;

    impl TypedResource for Secret {
        const GROUP: &'static str = "";
        const VERSION: &'static str = "v1";
        const KIND: &'static str = "Secret";
    }

    #[derive(Default)]
    struct VecSink {
        observed: Mutex<Vec<(RequestLabels, Duration)>>,
    }

    impl VecSink {
        fn take(&self) -> Vec<(RequestLabels, Duration)> {
            std::mem::take(&mut *self.observed.lock().unwrap())
        }
    }

    impl LatencySink for VecSink {
        fn observe(&self, labels: &RequestLabels, duration: Duration) {
            self.observed
                .lock()
                .unwrap()
                .push((labels.clone(), duration));
        }
    }

    fn monitor(sink: &Arc<VecSink>) -> Monitor {
        Monitor::new(Arc::new(FixedCaller::new("app")), sink.clone())
    }

    #[test]
    fn test_drop_records_exactly_once() {
        let sink = Arc::new(VecSink::default());
        let monitor = monitor(&sink);

        {
            let timer = monitor.start(Verb::Get, &Secret);
            assert_eq!(timer.labels().kind, "Secret");
            assert!(sink.take().is_empty());
        }

        let observed = sink.take();
        assert_eq!(observed.len(), 1);
        assert_eq!(observed[0].0.verb, Verb::Get);
        assert_eq!(observed[0].0.controller, "app");
    }

    #[test]
    fn test_labels_resolved_at_start() {
        let sink = Arc::new(VecSink::default());
        let monitor = monitor(&sink);
        let mut widget = DynamicObject::new("example.io/v1", "Widget");

        let timer = monitor.start(Verb::Update, &widget);
        widget.kind = "Gadget".to_string();
        drop(timer);

        assert_eq!(sink.take()[0].0.kind, "Widget");
    }

    #[test]
    fn test_records_on_unwind() {
        let sink = Arc::new(VecSink::default());
        let monitor = monitor(&sink);

        let result = std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| {
            let _timer = monitor.start(Verb::Create, &Secret);
            panic!("delegated call panicked");
        }));

        assert!(result.is_err());
        assert_eq!(sink.take().len(), 1);
    }

    #[tokio::test]
    async fn test_time_records_after_call_completes() {
        let sink = Arc::new(VecSink::default());
        let monitor = monitor(&sink);

        let value = monitor
            .start(Verb::List, &Secret)
            .time(async {
                tokio::time::sleep(Duration::from_millis(5)).await;
                7
            })
            .await;

        assert_eq!(value, 7);
        let observed = sink.take();
        assert_eq!(observed.len(), 1);
        assert!(observed[0].1 >= Duration::from_millis(5));
    }

    #[test]
    fn test_unknown_controller_fallback() {
        let sink = Arc::new(VecSink::default());
        let registry = ControllerRegistry::new().register("app", "operator::app");
        let monitor = Monitor::new(Arc::new(ScopedCaller::new(registry)), sink.clone())
            .with_unknown_controller("unattributed");

        drop(monitor.start(Verb::Get, &Secret));
        sync_scope("operator::app::reconcile", || {
            drop(monitor.start(Verb::Get, &Secret));
        });

        let controllers: Vec<String> = sink
            .take()
            .into_iter()
            .map(|(labels, _)| labels.controller)
            .collect();
        assert_eq!(controllers, vec!["unattributed", "app"]);
    }

    #[test]
    fn test_from_config_requires_registered_controllers() {
        let sink: Arc<dyn LatencySink> = Arc::new(VecSink::default());

        let err = Monitor::from_config_with_sink(&MonitorConfig::default(), sink.clone())
            .unwrap_err();
        assert_eq!(err, ConfigError::EmptyControllerRegistry);
        assert_eq!(
            Monitor::from_config(&MonitorConfig::default()).unwrap_err(),
            ConfigError::EmptyControllerRegistry
        );

        let config = MonitorConfig {
            controllers: ControllerRegistry::new().register("app", "operator::app"),
            unknown_controller: "other".to_string(),
            ..MonitorConfig::default()
        };
        let monitor = Monitor::from_config_with_sink(&config, sink)
            .expect("config should build a monitor");
        assert_eq!(&*monitor.unknown_controller, "other");
    }

    #[test]
    fn test_from_config_uses_configured_metric_name() {
        let config = MonitorConfig {
            controllers: ControllerRegistry::new().register("app", "operator::app"),
            metric_name: "reconciler_call_seconds".to_string(),
            ..MonitorConfig::default()
        };

        let ((), metrics) = MetricAssertion::capture(|| {
            let monitor = Monitor::from_config(&config).expect("config should build a monitor");
            sync_scope("operator::app::reconcile", || {
                drop(monitor.start(Verb::Get, &Secret));
            });
        });

        metrics
            .histogram("reconciler_call_seconds")
            .with_label("controller", "app")
            .with_label("verb", "Get")
            .with_label("kind", "Secret")
            .assert_observation_count(1);
        metrics
            .histogram(CLIENT_REQUEST_TIME_SECONDS)
            .assert_observation_count(0);
    }
}
