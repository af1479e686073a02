//! Recording helpers for boomtown telemetry events.
//!
//! Each recording emits one event pair: a counter increment on the owned
//! [`MetricsCollector`] plus a structured `tracing` event. The recorder is
//! built once at startup around an explicitly constructed collector and
//! passed to call-sites; recording never fails and never blocks.

use std::sync::Arc;

use crate::metrics::MetricsCollector;

/// Process-scoped telemetry handle handed to diagnostics call-sites.
#[derive(Clone)]
pub struct Recorder {
    metrics: Arc<MetricsCollector>,
}

impl Recorder {
    pub fn new(metrics: Arc<MetricsCollector>) -> Self {
        Self { metrics }
    }

    /// The underlying collector, e.g. for export endpoints.
    pub fn metrics(&self) -> &MetricsCollector {
        &self.metrics
    }

    /// Record one event pair: increments `<event>_total` with a `status`
    /// label plus the given attributes, and emits a structured log event.
    pub fn record(&self, event: &str, status: &str, attrs: &[(&str, &str)]) {
        let counter = format!("{event}_total");
        let mut labels: Vec<(&str, &str)> = Vec::with_capacity(attrs.len() + 1);
        labels.push(("status", status));
        labels.extend_from_slice(attrs);
        self.metrics.increment_counter(&counter, &labels);

        tracing::info!(
            target: "bt_telemetry::events",
            event,
            status,
            attrs = ?attrs,
            "telemetry event"
        );
    }

    /// Record a doctor check invocation (`run`).
    pub fn record_check_run(&self, check: &str, status: &str) {
        self.record("doctor_check_runs", status, &[("check", check)]);
    }

    /// Record a doctor remediation invocation (`fix`).
    pub fn record_check_fix(&self, check: &str, status: &str) {
        self.record("doctor_check_fixes", status, &[("check", check)]);
    }
}

/// "ok" or "error" depending on the outcome, matching the status label set
/// used across all recorded events.
pub fn status_str<T, E>(res: &Result<T, E>) -> &'static str {
    if res.is_ok() {
        "ok"
    } else {
        "error"
    }
}
