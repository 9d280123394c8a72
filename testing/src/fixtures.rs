//! Request and record fixtures.
//!
//! Dates are relative to [`test_clock`](crate::test_clock) (2025-01-01), so
//! anything in 2025-02 or later is in the future.

use imaging_booking_core::appointment::NewAppointment;
use imaging_booking_core::signature::expected_signature;
use imaging_booking_core::validation::{parse_appointment_date, BookingRequest, PaymentVerificationRequest};
use imaging_booking_core::TestType;

/// Secret used by the default [`RecordingPaymentGateway`](crate::RecordingPaymentGateway) in tests.
pub const TEST_SECRET: &str = "test_gateway_secret";

/// A valid booking request for `test_type` at `appointment_date`.
#[must_use]
pub fn booking_request(test_type: &str, appointment_date: &str) -> BookingRequest {
    BookingRequest {
        name: Some("Asha Rao".to_string()),
        email: Some("asha@example.com".to_string()),
        phone: Some("9876543210".to_string()),
        test_type: Some(test_type.to_string()),
        appointment_date: Some(appointment_date.to_string()),
        notes: None,
        type_error: None,
    }
}

/// A booking request for a named patient, for tests that search or list.
#[must_use]
pub fn booking_request_for(name: &str, email: &str, phone: &str, test_type: &str, appointment_date: &str) -> BookingRequest {
    BookingRequest {
        name: Some(name.to_string()),
        email: Some(email.to_string()),
        phone: Some(phone.to_string()),
        ..booking_request(test_type, appointment_date)
    }
}

/// Hex signature the gateway would send for this order and payment.
#[must_use]
pub fn sign(secret: &str, order_id: &str, payment_id: &str) -> String {
    expected_signature(secret, order_id, payment_id)
}

/// A correctly signed payment callback.
#[must_use]
pub fn payment_callback(secret: &str, order_id: &str, payment_id: &str) -> PaymentVerificationRequest {
    PaymentVerificationRequest {
        order_id: Some(order_id.to_string()),
        payment_id: Some(payment_id.to_string()),
        signature: Some(sign(secret, order_id, payment_id)),
        type_error: None,
    }
}

/// A payment callback with a signature that will not verify.
#[must_use]
pub fn forged_payment_callback(order_id: &str, payment_id: &str) -> PaymentVerificationRequest {
    PaymentVerificationRequest {
        signature: Some(sign("not-the-secret", order_id, payment_id)),
        ..payment_callback(TEST_SECRET, order_id, payment_id)
    }
}

/// A record ready for `AppointmentStore::insert`.
///
/// # Panics
///
/// Panics if `appointment_date` is not in a format the booking API accepts.
#[must_use]
#[allow(clippy::expect_used)]
pub fn new_appointment(order_id: &str, test_type: TestType, appointment_date: &str) -> NewAppointment {
    NewAppointment {
        name: "Asha Rao".to_string(),
        email: "asha@example.com".to_string(),
        phone: "9876543210".to_string(),
        test_type,
        appointment_date: parse_appointment_date(appointment_date)
            .expect("fixture dates use a booking date format"),
        notes: None,
        amount: test_type.price(),
        order_id: order_id.to_string(),
    }
}
