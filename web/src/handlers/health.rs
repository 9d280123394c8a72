//! Health check endpoints.
//!
//! These endpoints are used by load balancers and monitoring systems
//! to verify service health.

use axum::{extract::State, http::StatusCode, Json};
use imaging_booking_core::providers::AppointmentStore;
use serde::Serialize;
use std::sync::Arc;

/// Liveness body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Always `"ok"` while the process serves requests
    pub status: &'static str,
    /// Service version
    pub version: &'static str,
}

/// Readiness body.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct ReadinessResponse {
    /// `"ready"` or `"unavailable"`
    pub status: &'static str,
    /// Whether the appointment store answered a ping
    pub store: bool,
}

/// Simple health check endpoint (for basic liveness).
///
/// Does NOT check dependencies.
///
/// # Endpoint
///
/// ```text
/// GET /health
/// ```
///
/// # Response
///
/// ```json
/// { "status": "ok", "version": "0.1.0" }
/// ```
#[allow(clippy::unused_async)]
pub async fn health_check() -> (StatusCode, Json<HealthResponse>) {
    (
        StatusCode::OK,
        Json(HealthResponse {
            status: "ok",
            version: env!("CARGO_PKG_VERSION"),
        }),
    )
}

/// Readiness check: pings the appointment store.
///
/// The router state must provide the store through `FromRef`.
///
/// # Status Codes
///
/// - 200 OK: store reachable
/// - 503 Service Unavailable: store unreachable
///
/// # Endpoint
///
/// ```text
/// GET /ready
/// ```
pub async fn readiness_check(
    State(store): State<Arc<dyn AppointmentStore>>,
) -> (StatusCode, Json<ReadinessResponse>) {
    match store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                store: true,
            }),
        ),
        Err(error) => {
            tracing::warn!(error = %error, "Readiness check failed: store unreachable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "unavailable",
                    store: false,
                }),
            )
        },
    }
}
