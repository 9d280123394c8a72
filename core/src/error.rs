//! Error taxonomy for the booking workflows.
//!
//! Client faults (`Validation`, `Conflict`, `NotFound`, `InvalidSignature`) carry a
//! short message that is safe to show to callers. Server faults are wrapped in
//! [`DependencyError`] and are only ever logged in full.

use crate::providers::{GatewayError, StoreError};
use thiserror::Error;

/// Result alias used by the workflows.
pub type Result<T> = std::result::Result<T, BookingError>;

/// Errors surfaced by the booking, confirmation and lifecycle workflows.
#[derive(Error, Debug)]
pub enum BookingError {
    /// Missing or malformed input. No side effects were performed.
    #[error("{0}")]
    Validation(String),

    /// The request conflicts with current state (slot taken, terminal status).
    #[error("{0}")]
    Conflict(String),

    /// Unknown identifier.
    #[error("{0}")]
    NotFound(String),

    /// The payment signature did not match. Possible tampering.
    #[error("invalid payment signature")]
    InvalidSignature,

    /// A collaborator (store or gateway) failed.
    #[error(transparent)]
    Dependency(#[from] DependencyError),
}

impl BookingError {
    /// Create a validation error.
    #[must_use]
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation(message.into())
    }

    /// Create a conflict error.
    #[must_use]
    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    /// The appointment lookup failed.
    #[must_use]
    pub fn appointment_not_found() -> Self {
        Self::NotFound("appointment not found".to_string())
    }

    /// The slot is taken by another non-cancelled appointment.
    #[must_use]
    pub fn slot_already_booked() -> Self {
        Self::Conflict("slot already booked".to_string())
    }

    /// Whether the caller is at fault.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        !matches!(self, Self::Dependency(_))
    }
}

/// Failure of an external collaborator.
#[derive(Error, Debug)]
pub enum DependencyError {
    /// Appointment store failure
    #[error("appointment store failure: {0}")]
    Store(#[from] StoreError),

    /// Payment gateway failure
    #[error("payment gateway failure: {0}")]
    Gateway(#[from] GatewayError),
}

impl From<StoreError> for BookingError {
    fn from(error: StoreError) -> Self {
        Self::Dependency(DependencyError::Store(error))
    }
}

impl From<GatewayError> for BookingError {
    fn from(error: GatewayError) -> Self {
        Self::Dependency(DependencyError::Gateway(error))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_are_caller_facing() {
        assert_eq!(BookingError::validation("name is required").to_string(), "name is required");
        assert_eq!(BookingError::slot_already_booked().to_string(), "slot already booked");
        assert_eq!(BookingError::InvalidSignature.to_string(), "invalid payment signature");
    }

    #[test]
    fn test_store_failure_is_server_fault() {
        let error = BookingError::from(StoreError::Database("connection reset".to_string()));
        assert!(!error.is_client_error());
        assert!(matches!(error, BookingError::Dependency(DependencyError::Store(_))));
    }
}
