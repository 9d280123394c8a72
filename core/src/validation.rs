//! Input validation for the booking, payment and listing operations.
//!
//! Raw request types keep every field optional so the validators, not the JSON
//! decoder, decide which error the caller sees. Checks run in a fixed order and
//! stop at the first failure.

use crate::appointment::{AppointmentStatus, NewAppointment};
use crate::error::BookingError;
use crate::query::{AppointmentFilter, PageRequest};
use crate::test_type::TestType;
use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, TimeDelta, Utc};
use regex::Regex;
use serde::de::IgnoredAny;
use serde::Deserialize;
use std::sync::LazyLock;

/// Maximum length of the free-text notes, in characters.
pub const MAX_NOTES_LEN: usize = 500;

static EMAIL_PATTERN: LazyLock<Option<Regex>> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok());

/// A JSON value sent where a string was expected.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawText {
    Text(String),
    Other(#[allow(dead_code)] IgnoredAny),
}

/// Collects string fields, remembering the first one that had another JSON type.
#[derive(Default)]
struct TextFields {
    type_error: Option<&'static str>,
}

impl TextFields {
    fn take(&mut self, value: Option<RawText>, invalid: &'static str) -> Option<String> {
        match value? {
            RawText::Text(text) => Some(text),
            RawText::Other(_) => {
                if self.type_error.is_none() {
                    self.type_error = Some(invalid);
                }
                None
            },
        }
    }
}

/// Trimmed value, `None` when absent or blank.
fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|value| !value.is_empty())
}

fn required<'a>(value: Option<&'a str>, field: &str) -> Result<&'a str, BookingError> {
    non_blank(value).ok_or_else(|| BookingError::validation(format!("{field} is required")))
}

/// Whether `email` looks like `local@domain.tld`.
#[must_use]
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_PATTERN.as_ref().is_some_and(|pattern| pattern.is_match(email))
}

/// Whether `phone` is exactly ten ASCII digits.
#[must_use]
pub fn is_valid_phone(phone: &str) -> bool {
    phone.len() == 10 && phone.bytes().all(|b| b.is_ascii_digit())
}

/// Parse an appointment instant: RFC 3339, or a naive `YYYY-MM-DDTHH:MM[:SS]`
/// taken as UTC.
#[must_use]
pub fn parse_appointment_date(value: &str) -> Option<DateTime<Utc>> {
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%dT%H:%M"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(value, format).ok())
        .map(|naive| naive.and_utc())
}

// ============================================================================
// Booking
// ============================================================================

/// Raw booking request as received from the client.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "RawBookingRequest")]
pub struct BookingRequest {
    /// Patient name
    pub name: Option<String>,
    /// Contact email
    pub email: Option<String>,
    /// Contact phone
    pub phone: Option<String>,
    /// Test type key
    pub test_type: Option<String>,
    /// Requested date/time
    pub appointment_date: Option<String>,
    /// Free text
    pub notes: Option<String>,
    /// Message for the first field that was not a JSON string
    #[serde(skip)]
    pub type_error: Option<&'static str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawBookingRequest {
    name: Option<RawText>,
    email: Option<RawText>,
    phone: Option<RawText>,
    test_type: Option<RawText>,
    appointment_date: Option<RawText>,
    notes: Option<RawText>,
}

impl From<RawBookingRequest> for BookingRequest {
    fn from(raw: RawBookingRequest) -> Self {
        let mut fields = TextFields::default();
        Self {
            name: fields.take(raw.name, "invalid name"),
            email: fields.take(raw.email, "invalid email"),
            phone: fields.take(raw.phone, "invalid phone"),
            test_type: fields.take(raw.test_type, "invalid test type"),
            appointment_date: fields.take(raw.appointment_date, "invalid appointment date"),
            notes: fields.take(raw.notes, "invalid notes"),
            type_error: fields.type_error,
        }
    }
}

/// A booking request that passed every input check.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ValidatedBooking {
    /// Trimmed name
    pub name: String,
    /// Trimmed, lower-cased email
    pub email: String,
    /// Ten digit phone
    pub phone: String,
    /// Procedure
    pub test_type: TestType,
    /// Future instant
    pub appointment_date: DateTime<Utc>,
    /// Trimmed notes, `None` when blank
    pub notes: Option<String>,
}

impl ValidatedBooking {
    /// Price from the table. Never client supplied.
    #[must_use]
    pub const fn amount(&self) -> u32 {
        self.test_type.price()
    }

    /// Attach the gateway order and produce the record to insert.
    #[must_use]
    pub fn into_new_appointment(self, order_id: String) -> NewAppointment {
        let amount = self.amount();
        NewAppointment {
            name: self.name,
            email: self.email,
            phone: self.phone,
            test_type: self.test_type,
            appointment_date: self.appointment_date,
            notes: self.notes,
            amount,
            order_id,
        }
    }
}

impl BookingRequest {
    /// Run the input checks against the current instant `now`.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] describing the first failed check.
    pub fn validate(&self, now: DateTime<Utc>) -> Result<ValidatedBooking, BookingError> {
        if let Some(message) = self.type_error {
            return Err(BookingError::validation(message));
        }

        let name = required(self.name.as_deref(), "name")?;
        let email = required(self.email.as_deref(), "email")?;
        let phone = required(self.phone.as_deref(), "phone")?;
        let test_type = required(self.test_type.as_deref(), "testType")?;
        let appointment_date = required(self.appointment_date.as_deref(), "appointmentDate")?;

        let email = email.to_lowercase();
        if !is_valid_email(&email) {
            return Err(BookingError::validation("invalid email"));
        }

        if !is_valid_phone(phone) {
            return Err(BookingError::validation("invalid phone"));
        }

        let test_type: TestType = test_type
            .parse()
            .map_err(|_| BookingError::validation("invalid test type"))?;

        let appointment_date = parse_appointment_date(appointment_date)
            .ok_or_else(|| BookingError::validation("invalid appointment date"))?;
        if appointment_date <= now {
            return Err(BookingError::validation("date in the past"));
        }

        let notes = non_blank(self.notes.as_deref());
        if notes.is_some_and(|notes| notes.chars().count() > MAX_NOTES_LEN) {
            return Err(BookingError::validation(format!(
                "notes must be at most {MAX_NOTES_LEN} characters"
            )));
        }

        Ok(ValidatedBooking {
            name: name.to_string(),
            email,
            phone: phone.to_string(),
            test_type,
            appointment_date,
            notes: notes.map(str::to_string),
        })
    }
}

// ============================================================================
// Payment verification
// ============================================================================

/// Raw payment confirmation callback.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(from = "RawPaymentVerificationRequest")]
pub struct PaymentVerificationRequest {
    /// Gateway order id
    pub order_id: Option<String>,
    /// Gateway payment id
    pub payment_id: Option<String>,
    /// Hex HMAC signature
    pub signature: Option<String>,
    /// Message for the first field that was not a JSON string
    #[serde(skip)]
    pub type_error: Option<&'static str>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawPaymentVerificationRequest {
    order_id: Option<RawText>,
    payment_id: Option<RawText>,
    signature: Option<RawText>,
}

impl From<RawPaymentVerificationRequest> for PaymentVerificationRequest {
    fn from(raw: RawPaymentVerificationRequest) -> Self {
        let mut fields = TextFields::default();
        Self {
            order_id: fields.take(raw.order_id, "invalid orderId"),
            payment_id: fields.take(raw.payment_id, "invalid paymentId"),
            signature: fields.take(raw.signature, "invalid signature"),
            type_error: fields.type_error,
        }
    }
}

/// Payment callback with all fields present.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PaymentVerification {
    /// Gateway order id
    pub order_id: String,
    /// Gateway payment id
    pub payment_id: String,
    /// Hex HMAC signature
    pub signature: String,
}

impl PaymentVerificationRequest {
    /// Check that every field is present.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] naming the first missing field.
    pub fn validate(&self) -> Result<PaymentVerification, BookingError> {
        if let Some(message) = self.type_error {
            return Err(BookingError::validation(message));
        }

        Ok(PaymentVerification {
            order_id: required(self.order_id.as_deref(), "orderId")?.to_string(),
            payment_id: required(self.payment_id.as_deref(), "paymentId")?.to_string(),
            signature: required(self.signature.as_deref(), "signature")?.to_string(),
        })
    }
}

// ============================================================================
// Listing
// ============================================================================

/// Raw listing query string.
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListQuery {
    /// Exact status
    pub status: Option<String>,
    /// Exact test type
    pub test_type: Option<String>,
    /// Free-text search over name, email and phone
    pub search: Option<String>,
    /// Inclusive lower date bound
    pub start_date: Option<String>,
    /// Inclusive upper date bound
    pub end_date: Option<String>,
    /// 1-based page
    pub page: Option<String>,
    /// Page size
    pub limit: Option<String>,
}

/// Parsed listing criteria.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ListCriteria {
    /// Store filter
    pub filter: AppointmentFilter,
    /// Page window
    pub page: PageRequest,
}

#[derive(Clone, Copy)]
enum Bound {
    Start,
    End,
}

fn parse_bound(value: &str, bound: Bound, field: &str) -> Result<DateTime<Utc>, BookingError> {
    if let Some(instant) = parse_appointment_date(value) {
        return Ok(instant);
    }
    let date = NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| BookingError::validation(format!("invalid {field}")))?;
    let start = date.and_time(NaiveTime::MIN).and_utc();
    Ok(match bound {
        Bound::Start => start,
        Bound::End => start + TimeDelta::days(1) - TimeDelta::nanoseconds(1),
    })
}

fn parse_number(value: Option<&str>, field: &str) -> Result<Option<u32>, BookingError> {
    non_blank(value)
        .map(|raw| {
            raw.parse::<i64>()
                .map(|n| u32::try_from(n.max(0)).unwrap_or(u32::MAX))
                .map_err(|_| BookingError::validation(format!("invalid {field}")))
        })
        .transpose()
}

impl ListQuery {
    /// Parse filters and pagination. Page and limit are clamped rather than rejected.
    ///
    /// # Errors
    ///
    /// Returns [`BookingError::Validation`] for unknown enum values or
    /// unparseable dates and numbers.
    pub fn parse(&self) -> Result<ListCriteria, BookingError> {
        let status = non_blank(self.status.as_deref())
            .map(str::parse::<AppointmentStatus>)
            .transpose()
            .map_err(|_| BookingError::validation("invalid status"))?;
        let test_type = non_blank(self.test_type.as_deref())
            .map(str::parse::<TestType>)
            .transpose()
            .map_err(|_| BookingError::validation("invalid test type"))?;
        let date_from = non_blank(self.start_date.as_deref())
            .map(|value| parse_bound(value, Bound::Start, "startDate"))
            .transpose()?;
        let date_to = non_blank(self.end_date.as_deref())
            .map(|value| parse_bound(value, Bound::End, "endDate"))
            .transpose()?;

        let page = parse_number(self.page.as_deref(), "page")?;
        let limit = parse_number(self.limit.as_deref(), "limit")?;

        Ok(ListCriteria {
            filter: AppointmentFilter {
                status,
                test_type,
                search: non_blank(self.search.as_deref()).map(str::to_string),
                date_from,
                date_to,
                ..AppointmentFilter::default()
            },
            page: PageRequest::new(page, limit),
        })
    }
}
