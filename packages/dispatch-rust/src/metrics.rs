//! Metrics sinks for dispatch latency.
//!
//! [`PrometheusSink`] records through the `metrics` facade, so whichever
//! recorder is installed (normally the Prometheus exporter, see
//! [`telemetry::install_prometheus`](crate::telemetry::install_prometheus))
//! receives the samples. Recording never fails; with no recorder installed the
//! samples are discarded.

use parking_lot::Mutex;

use crate::traits::{MetricsSink, Observation};

/// Base name of the request latency histogram.
pub const REQUEST_PROCESS_TIME: &str = "request_process_time";

/// Histogram buckets in milliseconds.
pub const REQUEST_PROCESS_TIME_BUCKETS: [f64; 5] = [50.0, 100.0, 500.0, 1000.0, 3000.0];

// ---------------------------------------------------------------------------
// PrometheusSink
// ---------------------------------------------------------------------------

/// Records `<namespace>_request_process_time` in milliseconds, labelled by
/// `target`, `resource` and `method`.
#[derive(Debug, Clone)]
pub struct PrometheusSink {
    metric_name: String,
}

impl PrometheusSink {
    #[must_use]
    pub fn new(namespace: &str) -> Self {
        let metric_name = if namespace.is_empty() {
            REQUEST_PROCESS_TIME.to_string()
        } else {
            format!("{namespace}_{REQUEST_PROCESS_TIME}")
        };
        Self { metric_name }
    }

    #[must_use]
    pub fn metric_name(&self) -> &str {
        &self.metric_name
    }
}

impl MetricsSink for PrometheusSink {
    fn observe(&self, observation: &Observation) {
        ::metrics::histogram!(
            self.metric_name.clone(),
            "target" => observation.destination.to_string(),
            "resource" => observation.resource.to_string(),
            "method" => observation.method.as_str(),
        )
        .record(observation.duration.as_secs_f64() * 1000.0);
    }
}

// ---------------------------------------------------------------------------
// NoopSink
// ---------------------------------------------------------------------------

/// Discards every observation.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl MetricsSink for NoopSink {
    fn observe(&self, _observation: &Observation) {}
}

// ---------------------------------------------------------------------------
// RecordingSink
// ---------------------------------------------------------------------------

/// Keeps every observation in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    observations: Mutex<Vec<Observation>>,
}

impl RecordingSink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of the observations recorded so far, oldest first.
    #[must_use]
    pub fn observations(&self) -> Vec<Observation> {
        self.observations.lock().clone()
    }

    pub fn clear(&self) {
        self.observations.lock().clear();
    }
}

impl MetricsSink for RecordingSink {
    fn observe(&self, observation: &Observation) {
        self.observations.lock().push(observation.clone());
    }
}
