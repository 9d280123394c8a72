//! Booking and payment confirmation.

use super::AppointmentService;
use crate::metrics;
use imaging_booking_core::appointment::{Appointment, Slot};
use imaging_booking_core::error::{BookingError, Result};
use imaging_booking_core::lifecycle::AppointmentAction;
use imaging_booking_core::providers::{CreateOrderRequest, GatewayError, PaymentOrder};
use imaging_booking_core::query::AppointmentFilter;
use imaging_booking_core::signature::verify_signature;
use imaging_booking_core::validation::{BookingRequest, PaymentVerificationRequest};
use imaging_booking_runtime::retry::retry_with_predicate;
use serde::Serialize;
use uuid::Uuid;

/// A created appointment and the order the client pays against.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BookingReceipt {
    /// The pending appointment
    pub appointment: Appointment,
    /// Gateway order, amount in minor units
    pub order: PaymentOrder,
}

impl AppointmentService {
    /// Book an appointment.
    ///
    /// The gateway order is created before the record is inserted, so every
    /// stored appointment carries an order id. If a concurrent booking takes
    /// the slot between the pre-check and the insert, the order is abandoned.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for bad input
    /// - [`BookingError::Conflict`] when the slot is taken
    /// - [`BookingError::Dependency`] when the gateway or store fails
    #[tracing::instrument(skip_all, fields(test_type = tracing::field::Empty, order_id = tracing::field::Empty))]
    pub async fn book(&self, request: &BookingRequest) -> Result<BookingReceipt> {
        let booking = request.validate(self.env.clock.now()).inspect_err(|error| {
            tracing::debug!(%error, "Booking rejected by validation");
            metrics::record_rejection("validation");
        })?;
        tracing::Span::current().record("test_type", booking.test_type.key());

        let slot = Slot {
            appointment_date: booking.appointment_date,
            test_type: booking.test_type,
        };
        if self.store.find_one(&AppointmentFilter::active_in_slot(&slot)).await?.is_some() {
            metrics::record_rejection("slot_taken");
            return Err(BookingError::slot_already_booked());
        }

        // One receipt for every attempt so the gateway can deduplicate retries
        let order_request = CreateOrderRequest {
            amount_minor: u64::from(booking.amount()) * 100,
            currency: self.currency.clone(),
            receipt: format!("rcpt_{}", Uuid::new_v4().simple()),
        };
        let order = retry_with_predicate(
            &self.retry,
            "create_order",
            || self.gateway.create_order(order_request.clone()),
            GatewayError::is_transient,
        )
        .await?;
        tracing::Span::current().record("order_id", order.id.as_str());

        let appointment = match self.store.insert(booking.into_new_appointment(order.id.clone())).await {
            Ok(appointment) => appointment,
            Err(error) if error.is_slot_conflict() => {
                tracing::warn!(order_id = %order.id, "Slot taken concurrently, abandoning unpaid order");
                metrics::record_rejection("slot_taken");
                return Err(BookingError::slot_already_booked());
            },
            Err(error) => return Err(error.into()),
        };

        metrics::record_appointment("booked");
        tracing::info!(appointment_id = %appointment.id, amount = appointment.amount, "Appointment booked");

        Ok(BookingReceipt { appointment, order })
    }

    /// Confirm payment for the appointment holding the callback's order id.
    ///
    /// A replayed callback for an already confirmed appointment returns the
    /// record unchanged and sends no second email.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for missing fields
    /// - [`BookingError::InvalidSignature`] when the HMAC does not match
    /// - [`BookingError::NotFound`] for an unknown order id
    /// - [`BookingError::Conflict`] when the appointment cannot be confirmed
    /// - [`BookingError::Dependency`] when the store fails
    #[tracing::instrument(skip_all, fields(order_id = tracing::field::Empty))]
    pub async fn verify_payment(&self, request: &PaymentVerificationRequest) -> Result<Appointment> {
        let callback = request.validate()?;
        tracing::Span::current().record("order_id", callback.order_id.as_str());

        if !verify_signature(
            self.gateway.signing_secret(),
            &callback.order_id,
            &callback.payment_id,
            &callback.signature,
        ) {
            tracing::warn!("Payment signature mismatch");
            metrics::record_payment("invalid_signature");
            return Err(BookingError::InvalidSignature);
        }

        let appointment = self
            .store
            .find_one(&AppointmentFilter::by_order_id(callback.order_id.as_str()))
            .await?
            .ok_or_else(BookingError::appointment_not_found)?;

        let action = AppointmentAction::ConfirmPayment {
            payment_id: callback.payment_id,
        };
        match self.transition(appointment, action).await {
            Ok((appointment, true)) => {
                metrics::record_payment("confirmed");
                metrics::record_revenue(appointment.amount_minor());
                metrics::record_appointment("confirmed");
                Ok(appointment)
            },
            Ok((appointment, false)) => {
                tracing::info!(appointment_id = %appointment.id, "Payment callback replayed");
                metrics::record_payment("replayed");
                Ok(appointment)
            },
            Err(error) => {
                if matches!(error, BookingError::Conflict(_)) {
                    metrics::record_payment("rejected");
                }
                Err(error)
            },
        }
    }
}
