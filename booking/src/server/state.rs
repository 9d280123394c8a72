//! Application state for the booking HTTP server.

use crate::workflow::AppointmentService;
use axum::extract::FromRef;
use imaging_booking_core::providers::AppointmentStore;
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;

/// Application state shared across all HTTP handlers.
///
/// Cloned per request; every field is an `Arc` or a cheap handle.
#[derive(Clone)]
pub struct AppState {
    /// Booking workflows
    pub appointments: Arc<AppointmentService>,

    /// Store, for readiness probes
    pub store: Arc<dyn AppointmentStore>,

    /// Prometheus renderer for `/metrics`
    pub metrics: PrometheusHandle,
}

impl AppState {
    /// Create a new application state.
    #[must_use]
    pub fn new(
        appointments: Arc<AppointmentService>,
        store: Arc<dyn AppointmentStore>,
        metrics: PrometheusHandle,
    ) -> Self {
        Self {
            appointments,
            store,
            metrics,
        }
    }
}

// Let the shared readiness handler extract the store
impl FromRef<AppState> for Arc<dyn AppointmentStore> {
    fn from_ref(app_state: &AppState) -> Self {
        Arc::clone(&app_state.store)
    }
}

impl FromRef<AppState> for PrometheusHandle {
    fn from_ref(app_state: &AppState) -> Self {
        app_state.metrics.clone()
    }
}
