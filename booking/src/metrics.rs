//! Business metrics for the booking service.
//!
//! # Exported Metrics
//!
//! ## Counters
//! - `booking_appointments_total{status}` - Appointments by lifecycle step (booked, confirmed, cancelled, deleted)
//! - `booking_rejections_total{reason}` - Booking attempts rejected (validation, slot_taken)
//! - `booking_payments_total{outcome}` - Payment callbacks by outcome
//! - `booking_revenue_total` - Confirmed revenue in minor currency units
//! - `booking_notifications_total{kind,outcome}` - Email sends by kind and outcome

use imaging_booking_core::lifecycle::AppointmentAction;
use metrics::describe_counter;

/// Register all business metric descriptions.
///
/// Call once at startup, after the recorder is installed.
pub fn register_business_metrics() {
    describe_counter!(
        "booking_appointments_total",
        "Total number of appointments by lifecycle step (booked, confirmed, cancelled, deleted)"
    );
    describe_counter!(
        "booking_rejections_total",
        "Total number of booking attempts rejected, by reason"
    );
    describe_counter!(
        "booking_payments_total",
        "Total number of payment callbacks by outcome (confirmed, replayed, invalid_signature, rejected)"
    );
    describe_counter!(
        "booking_revenue_total",
        "Total confirmed revenue in minor currency units"
    );
    describe_counter!(
        "booking_notifications_total",
        "Total number of notification emails by kind and outcome"
    );

    tracing::info!("Business metrics registered");
}

/// Record an appointment reaching `status` (`booked`, `confirmed`, `cancelled`, `deleted`).
pub fn record_appointment(status: &'static str) {
    metrics::counter!("booking_appointments_total", "status" => status).increment(1);
}

/// Record a rejected booking attempt.
pub fn record_rejection(reason: &'static str) {
    metrics::counter!("booking_rejections_total", "reason" => reason).increment(1);
    tracing::debug!(reason, "Recorded booking rejection metric");
}

/// Record a payment callback outcome.
pub fn record_payment(outcome: &'static str) {
    metrics::counter!("booking_payments_total", "outcome" => outcome).increment(1);
}

/// Record confirmed revenue.
pub fn record_revenue(amount_minor: u64) {
    metrics::counter!("booking_revenue_total").increment(amount_minor);
    tracing::debug!(amount_minor, "Recorded revenue metric");
}

/// Record the feedback action of a notification effect.
///
/// Other actions are ignored.
pub fn record_notification(action: &AppointmentAction) {
    match action {
        AppointmentAction::NotificationDelivered { kind } => {
            metrics::counter!(
                "booking_notifications_total",
                "kind" => kind.as_str(),
                "outcome" => "delivered"
            )
            .increment(1);
        },
        AppointmentAction::NotificationFailed { kind, .. } => {
            metrics::counter!(
                "booking_notifications_total",
                "kind" => kind.as_str(),
                "outcome" => "failed"
            )
            .increment(1);
        },
        _ => {},
    }
}
