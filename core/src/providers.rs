//! Collaborator traits: appointment store, payment gateway and notifier.
//!
//! All traits are dyn-compatible so the workflows can hold them as
//! `Arc<dyn Trait>` and swap implementations (Postgres, HTTP, SMTP in production;
//! in-memory and recording doubles in tests).

use crate::appointment::{Appointment, AppointmentId, AppointmentStatus, NewAppointment};
use crate::query::{AppointmentFilter, AppointmentSort};
use std::future::Future;
use std::pin::Pin;
use thiserror::Error;

/// Boxed future returned by collaborator methods.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

// ============================================================================
// Appointment store
// ============================================================================

/// Errors from an [`AppointmentStore`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// A uniqueness constraint was violated (active slot or order id).
    #[error("duplicate record violates {constraint}")]
    Duplicate {
        /// Name of the violated constraint
        constraint: String,
    },

    /// The record to update does not exist.
    #[error("record not found")]
    NotFound,

    /// The stored status no longer matches the expected one.
    #[error("stale write: record was modified concurrently")]
    StaleWrite,

    /// Backend failure (connection, query, timeout).
    #[error("database error: {0}")]
    Database(String),

    /// A stored row could not be decoded.
    #[error("serialization error: {0}")]
    Serialization(String),
}

/// Constraint name for the active-slot uniqueness rule.
pub const ACTIVE_SLOT_CONSTRAINT: &str = "appointments_active_slot_key";

/// Constraint name for order id uniqueness.
pub const ORDER_ID_CONSTRAINT: &str = "appointments_order_id_key";

impl StoreError {
    /// Whether this error is the active-slot uniqueness violation.
    #[must_use]
    pub fn is_slot_conflict(&self) -> bool {
        matches!(self, Self::Duplicate { constraint } if constraint == ACTIVE_SLOT_CONSTRAINT)
    }
}

/// Persistence for appointments.
///
/// Implementations must enforce two uniqueness rules atomically with `insert`
/// and `update`: one non-cancelled appointment per slot, and one appointment
/// per order id.
pub trait AppointmentStore: Send + Sync {
    /// Records matching `filter`, ordered by `sort`, skipping `skip` and
    /// returning at most `limit`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn find<'a>(
        &'a self,
        filter: &'a AppointmentFilter,
        sort: AppointmentSort,
        skip: u64,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<Appointment>, StoreError>>;

    /// Number of records matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn count<'a>(&'a self, filter: &'a AppointmentFilter) -> BoxFuture<'a, Result<u64, StoreError>>;

    /// Record by identifier.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn find_by_id(&self, id: AppointmentId) -> BoxFuture<'_, Result<Option<Appointment>, StoreError>>;

    /// First record matching `filter`.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn find_one<'a>(
        &'a self,
        filter: &'a AppointmentFilter,
    ) -> BoxFuture<'a, Result<Option<Appointment>, StoreError>>;

    /// Persist a new appointment, assigning its id and timestamps.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::Duplicate`] when a uniqueness rule is violated.
    fn insert(&self, appointment: NewAppointment) -> BoxFuture<'_, Result<Appointment, StoreError>>;

    /// Write the mutable fields of `appointment` (status, payment status,
    /// payment id, notes) if the stored status still equals `expected_status`.
    /// `order_id` is never written. Returns the stored record.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError::NotFound`] for an unknown id and
    /// [`StoreError::StaleWrite`] when the status changed underneath.
    fn update<'a>(
        &'a self,
        appointment: &'a Appointment,
        expected_status: AppointmentStatus,
    ) -> BoxFuture<'a, Result<Appointment, StoreError>>;

    /// Remove a record. Returns `false` if it did not exist.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend fails.
    fn delete(&self, id: AppointmentId) -> BoxFuture<'_, Result<bool, StoreError>>;

    /// Cheap reachability probe for readiness checks.
    ///
    /// # Errors
    ///
    /// Returns [`StoreError`] if the backend is unreachable.
    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>>;
}

// ============================================================================
// Payment gateway
// ============================================================================

/// Errors from a [`PaymentGateway`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GatewayError {
    /// The request timed out.
    #[error("gateway timeout")]
    Timeout,

    /// The gateway answered with a non-success status.
    #[error("gateway returned HTTP {status}: {message}")]
    Http {
        /// HTTP status code
        status: u16,
        /// Response body or reason
        message: String,
    },

    /// The request could not be sent.
    #[error("gateway transport error: {0}")]
    Transport(String),

    /// The response could not be decoded.
    #[error("invalid gateway response: {0}")]
    InvalidResponse(String),
}

impl GatewayError {
    /// Whether retrying may succeed (timeouts, transport failures, 5xx, 429).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) => true,
            Self::Http { status, .. } => *status >= 500 || *status == 429,
            Self::InvalidResponse(_) => false,
        }
    }
}

/// Parameters for creating a payment order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CreateOrderRequest {
    /// Amount in minor units (e.g. paise)
    pub amount_minor: u64,
    /// ISO currency code
    pub currency: String,
    /// Caller-side unique receipt
    pub receipt: String,
}

/// A gateway-side payment order.
#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct PaymentOrder {
    /// Gateway order identifier
    pub id: String,
    /// Amount in minor units
    pub amount: u64,
    /// ISO currency code
    pub currency: String,
}

/// Payment provider contract: create orders, expose the signing secret.
pub trait PaymentGateway: Send + Sync {
    /// Create an order the client can pay against.
    ///
    /// # Errors
    ///
    /// Returns [`GatewayError`] if the gateway rejects the request or is unreachable.
    fn create_order(&self, request: CreateOrderRequest) -> BoxFuture<'_, Result<PaymentOrder, GatewayError>>;

    /// Shared secret used to sign payment callbacks.
    fn signing_secret(&self) -> &str;
}

// ============================================================================
// Notifier
// ============================================================================

/// Errors from a [`Notifier`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    /// The message could not be built (bad address, etc.).
    #[error("invalid message: {0}")]
    InvalidMessage(String),

    /// The transport rejected or failed to deliver the message.
    #[error("delivery failed: {0}")]
    Delivery(String),

    /// The send did not finish in time.
    #[error("notification timed out")]
    Timeout,
}

/// An HTML email.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct EmailMessage {
    /// Recipient address
    pub to: String,
    /// Subject line
    pub subject: String,
    /// HTML body
    pub html_body: String,
}

/// Email sender.
pub trait Notifier: Send + Sync {
    /// Send one message.
    ///
    /// # Errors
    ///
    /// Returns [`NotifyError`] if the message cannot be delivered.
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<(), NotifyError>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transient_classification() {
        assert!(GatewayError::Timeout.is_transient());
        assert!(GatewayError::Transport("reset".into()).is_transient());
        assert!(GatewayError::Http { status: 503, message: String::new() }.is_transient());
        assert!(GatewayError::Http { status: 429, message: String::new() }.is_transient());
        assert!(!GatewayError::Http { status: 401, message: String::new() }.is_transient());
        assert!(!GatewayError::InvalidResponse("bad json".into()).is_transient());
    }

    #[test]
    fn test_slot_conflict_detection() {
        let slot = StoreError::Duplicate { constraint: ACTIVE_SLOT_CONSTRAINT.to_string() };
        let order = StoreError::Duplicate { constraint: ORDER_ID_CONSTRAINT.to_string() };
        assert!(slot.is_slot_conflict());
        assert!(!order.is_slot_conflict());
        assert!(!StoreError::StaleWrite.is_slot_conflict());
    }
}
