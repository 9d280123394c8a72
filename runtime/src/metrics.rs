//! Prometheus metrics export and runtime metrics.
//!
//! The service installs one global recorder at start-up and renders it from
//! the `/metrics` route:
//!
//! ```rust,no_run
//! use imaging_booking_runtime::metrics::install_recorder;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let handle = install_recorder()?;
//! let body = handle.render();
//! # Ok(())
//! # }
//! ```

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;
use thiserror::Error;

/// Errors from metrics operations.
#[derive(Error, Debug)]
pub enum MetricsError {
    /// Failed to build metrics exporter
    #[error("Failed to build metrics exporter: {0}")]
    Build(String),
    /// Failed to install metrics exporter
    #[error("Failed to install metrics exporter: {0}")]
    Install(String),
}

/// Install the global Prometheus recorder and describe the runtime metrics.
///
/// # Errors
///
/// Returns [`MetricsError`] if the exporter cannot be built or a recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, MetricsError> {
    let handle = PrometheusBuilder::new()
        // Latency buckets for every *_duration_seconds histogram
        .set_buckets_for_metric(
            Matcher::Suffix("duration_seconds".to_string()),
            &[0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0],
        )
        .map_err(|e| MetricsError::Build(e.to_string()))?
        .install_recorder()
        .map_err(|e| MetricsError::Install(e.to_string()))?;

    register_metrics();
    tracing::info!("Prometheus recorder installed");
    Ok(handle)
}

/// Build a recorder without installing it globally (tests, local rendering).
#[must_use]
pub fn local_handle() -> PrometheusHandle {
    PrometheusBuilder::new().build_recorder().handle()
}

fn register_metrics() {
    describe_counter!("effects_executed_total", "Total number of effects that ran to completion");
    describe_counter!("effects_timed_out_total", "Total number of effects abandoned after their timeout");
    describe_histogram!("effect_execution_duration_seconds", "Effect execution duration in seconds");
    describe_gauge!("effects_in_flight", "Effects currently running");
    describe_counter!("retry_attempts_total", "Total number of retry attempts");
    describe_counter!("retry_successes_total", "Total number of operations that succeeded after retrying");
    describe_counter!("retry_exhausted_total", "Total number of retry loops that exhausted max retries");
}

/// Effect metrics recorder.
pub struct EffectMetrics;

impl EffectMetrics {
    /// Record an effect execution.
    pub fn record_execution(duration: Duration) {
        counter!("effects_executed_total").increment(1);
        histogram!("effect_execution_duration_seconds").record(duration.as_secs_f64());
    }

    /// Record an abandoned effect.
    pub fn record_timeout() {
        counter!("effects_timed_out_total").increment(1);
    }

    /// Record the number of running effects.
    #[allow(clippy::cast_precision_loss)] // counts stay far below 2^52
    pub fn record_in_flight(pending: usize) {
        gauge!("effects_in_flight").set(pending as f64);
    }
}

/// Retry metrics recorder.
pub struct RetryMetrics;

impl RetryMetrics {
    /// Record a retry attempt.
    pub fn record_attempt(operation: &'static str) {
        counter!("retry_attempts_total", "operation" => operation).increment(1);
    }

    /// Record a successful retry.
    pub fn record_success(operation: &'static str) {
        counter!("retry_successes_total", "operation" => operation).increment(1);
    }

    /// Record exhausted retries.
    pub fn record_exhausted(operation: &'static str) {
        counter!("retry_exhausted_total", "operation" => operation).increment(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recorders_without_global_exporter() {
        // The metrics facade is a no-op until a recorder is installed
        EffectMetrics::record_execution(Duration::from_millis(5));
        EffectMetrics::record_timeout();
        EffectMetrics::record_in_flight(3);
        RetryMetrics::record_attempt("create_order");
    }

    #[test]
    fn test_local_recorder_renders_scoped_metrics() {
        let recorder = PrometheusBuilder::new().build_recorder();
        let handle = recorder.handle();

        metrics::with_local_recorder(&recorder, || {
            EffectMetrics::record_timeout();
            RetryMetrics::record_exhausted("create_order");
        });

        let rendered = handle.render();
        assert!(rendered.contains("effects_timed_out_total"));
        assert!(rendered.contains("retry_exhausted_total{operation=\"create_order\"}"));
    }
}
