//! Router configuration for the booking service.

use super::state::AppState;
use crate::api::{appointments, test_types};
use axum::{
    extract::State,
    middleware::from_fn,
    routing::{get, patch, post},
    Router,
};
use imaging_booking_web::propagate_correlation_id;
use imaging_booking_web::handlers::{health_check, readiness_check};
use metrics_exporter_prometheus::PrometheusHandle;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the complete Axum router.
///
/// - `/health`, `/ready`, `/metrics` at the root
/// - Appointment and catalogue endpoints under `/api`
///
/// Every request passes through the correlation-ID layer, HTTP tracing and
/// permissive CORS.
pub fn build_router(state: AppState) -> Router {
    let api_routes = Router::new()
        .route(
            "/appointments",
            get(appointments::list_appointments).post(appointments::create_appointment),
        )
        .route("/appointments/verify-payment", post(appointments::verify_payment))
        .route(
            "/appointments/:id",
            get(appointments::get_appointment).delete(appointments::delete_appointment),
        )
        .route("/appointments/:id/cancel", patch(appointments::cancel_appointment))
        .route("/test-types", get(test_types::list_test_types));

    Router::new()
        .route("/health", get(health_check))
        .route("/ready", get(readiness_check))
        .route("/metrics", get(render_metrics))
        .nest("/api", api_routes)
        .layer(from_fn(propagate_correlation_id))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

#[allow(clippy::unused_async)]
async fn render_metrics(State(handle): State<PrometheusHandle>) -> String {
    handle.render()
}
