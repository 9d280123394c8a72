//! The appointment record and its status enums.

use crate::test_type::TestType;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

// ============================================================================
// Identifiers
// ============================================================================

/// Unique identifier for an appointment, assigned by the store on insert.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AppointmentId(Uuid);

impl AppointmentId {
    /// Creates a new random `AppointmentId`
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Create an `AppointmentId` from a `Uuid`
    #[must_use]
    pub const fn from_uuid(uuid: Uuid) -> Self {
        Self(uuid)
    }

    /// Get the inner UUID
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }

    /// Parse an identifier from its textual form, `None` if malformed.
    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        Uuid::parse_str(value.trim()).ok().map(Self)
    }
}

impl Default for AppointmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for AppointmentId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// Status
// ============================================================================

/// Booking status. `Cancelled` is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AppointmentStatus {
    /// Booked, awaiting payment
    Pending,
    /// Paid
    Confirmed,
    /// Cancelled (terminal)
    Cancelled,
}

impl AppointmentStatus {
    /// Storage / wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Confirmed => "confirmed",
            Self::Cancelled => "cancelled",
        }
    }

    /// Whether the appointment still occupies its slot.
    #[must_use]
    pub const fn holds_slot(self) -> bool {
        !matches!(self, Self::Cancelled)
    }
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown status string.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown status: {0}")]
pub struct UnknownStatus(pub String);

impl FromStr for AppointmentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "confirmed" => Ok(Self::Confirmed),
            "cancelled" => Ok(Self::Cancelled),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

/// Payment status of an appointment.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    /// Order created, no verified payment yet
    Pending,
    /// Payment verified
    Completed,
}

impl PaymentStatus {
    /// Storage / wire representation.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
        }
    }
}

impl fmt::Display for PaymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentStatus {
    type Err = UnknownStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "completed" => Ok(Self::Completed),
            other => Err(UnknownStatus(other.to_string())),
        }
    }
}

// ============================================================================
// Slot
// ============================================================================

/// Appointment date/time plus test type. Exclusive among non-cancelled appointments.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Slot {
    /// Scheduled instant
    pub appointment_date: DateTime<Utc>,
    /// Procedure
    pub test_type: TestType,
}

// ============================================================================
// Appointment
// ============================================================================

/// An appointment that has not been persisted yet.
///
/// The store assigns the identifier and timestamps on insert.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewAppointment {
    /// Patient name (trimmed)
    pub name: String,
    /// Contact email (trimmed, lower-cased)
    pub email: String,
    /// Contact phone, 10 digits
    pub phone: String,
    /// Procedure
    pub test_type: TestType,
    /// Scheduled instant
    pub appointment_date: DateTime<Utc>,
    /// Optional free text
    pub notes: Option<String>,
    /// Price in whole currency units, from the price table
    pub amount: u32,
    /// Gateway order identifier
    pub order_id: String,
}

impl NewAppointment {
    /// The slot this appointment would occupy.
    #[must_use]
    pub const fn slot(&self) -> Slot {
        Slot {
            appointment_date: self.appointment_date,
            test_type: self.test_type,
        }
    }

    /// Materialise the record with store-assigned identity and timestamps.
    ///
    /// New records always start `pending`/`pending` without a payment id.
    #[must_use]
    pub fn into_appointment(self, id: AppointmentId, now: DateTime<Utc>) -> Appointment {
        Appointment {
            id,
            name: self.name,
            email: self.email,
            phone: self.phone,
            test_type: self.test_type,
            appointment_date: self.appointment_date,
            notes: self.notes,
            amount: self.amount,
            order_id: self.order_id,
            payment_id: None,
            status: AppointmentStatus::Pending,
            payment_status: PaymentStatus::Pending,
            created_at: now,
            updated_at: now,
        }
    }
}

/// A persisted appointment.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Appointment {
    /// Store-assigned identifier
    pub id: AppointmentId,
    /// Patient name
    pub name: String,
    /// Contact email
    pub email: String,
    /// Contact phone
    pub phone: String,
    /// Procedure
    pub test_type: TestType,
    /// Scheduled instant
    pub appointment_date: DateTime<Utc>,
    /// Optional free text
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub notes: Option<String>,
    /// Price in whole currency units
    pub amount: u32,
    /// Gateway order identifier, never changes after creation
    pub order_id: String,
    /// Gateway payment identifier, set on confirmation
    #[serde(default)]
    pub payment_id: Option<String>,
    /// Booking status
    pub status: AppointmentStatus,
    /// Payment status
    pub payment_status: PaymentStatus,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp
    pub updated_at: DateTime<Utc>,
}

impl Appointment {
    /// The slot this appointment occupies (or occupied, if cancelled).
    #[must_use]
    pub const fn slot(&self) -> Slot {
        Slot {
            appointment_date: self.appointment_date,
            test_type: self.test_type,
        }
    }

    /// Amount in gateway minor units.
    #[must_use]
    pub fn amount_minor(&self) -> u64 {
        u64::from(self.amount) * 100
    }
}
