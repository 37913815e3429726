//! Prometheus metrics for kubewatch sinks
//!
//! Metrics are registered in the default registry. Serving them over HTTP is
//! left to the embedding process.

use crate::error::{KubewatchError, Result};
use parking_lot::Mutex;
use prometheus::{
    CounterVec, Encoder, HistogramVec, TextEncoder, register_counter_vec, register_histogram_vec,
};
use std::sync::OnceLock;

/// Global metrics instance
static METRICS: OnceLock<Metrics> = OnceLock::new();

/// Serializes registration so concurrent `init` calls register once
static INIT_LOCK: Mutex<()> = Mutex::new(());

/// All sink metrics
pub struct Metrics {
    /// Events handed to a sink (by sink)
    pub events_handled: CounterVec,

    /// Events dropped because a graph write step failed (by step)
    pub graph_step_failures: CounterVec,

    /// Graph store round-trip latency (by operation)
    pub graph_request_duration: HistogramVec,
}

impl Metrics {
    /// Initialize metrics (call once at startup)
    pub fn init() -> Result<&'static Metrics> {
        let _guard = INIT_LOCK.lock();
        if let Some(metrics) = METRICS.get() {
            return Ok(metrics);
        }

        let metrics = Metrics {
            events_handled: register_counter_vec!(
                "kubewatch_events_handled_total",
                "Total events handed to a sink",
                &["sink"]
            )
            .map_err(|e| KubewatchError::Metrics(format!("events_handled: {e}")))?,

            graph_step_failures: register_counter_vec!(
                "kubewatch_graph_step_failures_total",
                "Events dropped because a graph write step failed",
                &["step"]
            )
            .map_err(|e| KubewatchError::Metrics(format!("graph_step_failures: {e}")))?,

            graph_request_duration: register_histogram_vec!(
                "kubewatch_graph_request_duration_seconds",
                "Graph store request latency",
                &["op"],
                vec![0.001, 0.005, 0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 30.0]
            )
            .map_err(|e| KubewatchError::Metrics(format!("graph_request_duration: {e}")))?,
        };

        let _ = METRICS.set(metrics);

        METRICS
            .get()
            .ok_or_else(|| KubewatchError::Metrics("Failed to initialize metrics".to_string()))
    }

    /// Get the global metrics instance
    ///
    /// Returns None if metrics haven't been initialized yet.
    pub fn get() -> Option<&'static Metrics> {
        METRICS.get()
    }

    pub fn record_handled(&self, sink: &str) {
        self.events_handled.with_label_values(&[sink]).inc();
    }

    pub fn record_step_failure(&self, step: &str) {
        self.graph_step_failures.with_label_values(&[step]).inc();
    }

    pub fn record_request(&self, op: &str, seconds: f64) {
        self.graph_request_duration
            .with_label_values(&[op])
            .observe(seconds);
    }
}

/// Gather all metrics and encode as Prometheus text format
pub fn gather() -> String {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();
    if encoder.encode(&metric_families, &mut buffer).is_ok() {
        String::from_utf8(buffer).unwrap_or_default()
    } else {
        String::new()
    }
}

/// Record a handled event if metrics are initialized
pub fn try_record_handled(sink: &str) {
    if let Some(m) = Metrics::get() {
        m.record_handled(sink);
    }
}

/// Record a failed write step if metrics are initialized
pub fn try_record_step_failure(step: &str) {
    if let Some(m) = Metrics::get() {
        m.record_step_failure(step);
    }
}

/// Record a graph request latency if metrics are initialized
pub fn try_record_request(op: &str, seconds: f64) {
    if let Some(m) = Metrics::get() {
        m.record_request(op, seconds);
    }
}
