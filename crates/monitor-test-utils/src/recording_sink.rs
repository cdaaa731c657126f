//! Latency sink capturing observations in memory.

use client_monitor::observability::{LatencySink, Observation};
use client_monitor::{FixedCaller, Monitor, RequestLabels, Verb};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Sink recording every observation for later assertions.
#[derive(Debug, Default)]
pub struct RecordingSink {
    observations: Mutex<Vec<Observation>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Observations recorded so far, in recording order.
    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().unwrap().clone()
    }

    /// Remove and return every recorded observation.
    pub fn take(&self) -> Vec<Observation> {
        std::mem::take(&mut *self.observations.lock().unwrap())
    }

    pub fn len(&self) -> usize {
        self.observations.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Observations recorded for `verb`.
    pub fn for_verb(&self, verb: Verb) -> Vec<Observation> {
        self.observations()
            .into_iter()
            .filter(|o| o.labels.verb == verb)
            .collect()
    }

    /// The only recorded observation.
    ///
    /// # Panics
    ///
    /// Panics unless exactly one observation was recorded.
    pub fn single(&self) -> Observation {
        let observations = self.observations();
        assert_eq!(
            observations.len(),
            1,
            "expected exactly one observation, got {observations:?}"
        );
        observations.into_iter().next().unwrap()
    }
}

impl LatencySink for RecordingSink {
    fn observe(&self, labels: &RequestLabels, duration: Duration) {
        self.observations
            .lock()
            .unwrap()
            .push(Observation::new(labels, duration));
    }
}

/// Monitor attributing every call to `controller`, recording into a fresh
/// [`RecordingSink`].
pub fn recording_monitor(controller: &str) -> (Monitor, Arc<RecordingSink>) {
    let sink = Arc::new(RecordingSink::new());
    let monitor = Monitor::new(Arc::new(FixedCaller::new(controller)), sink.clone());
    (monitor, sink)
}
