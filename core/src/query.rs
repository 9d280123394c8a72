//! Filters, sorting and pagination for appointment queries.

use crate::appointment::{Appointment, AppointmentStatus, Slot};
use crate::test_type::TestType;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// Default page size for listings.
pub const DEFAULT_PAGE_SIZE: u32 = 10;

/// Largest page size a caller may request.
pub const MAX_PAGE_SIZE: u32 = 100;

/// Conjunctive filter over appointments. `None` fields match everything.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct AppointmentFilter {
    /// Exact status
    pub status: Option<AppointmentStatus>,
    /// Exclude cancelled appointments
    pub active_only: bool,
    /// Exact test type
    pub test_type: Option<TestType>,
    /// Case-insensitive substring over name, email and phone
    pub search: Option<String>,
    /// Inclusive lower bound on the appointment date
    pub date_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the appointment date
    pub date_to: Option<DateTime<Utc>>,
    /// Exact gateway order id
    pub order_id: Option<String>,
}

impl AppointmentFilter {
    /// Non-cancelled appointments occupying `slot`.
    #[must_use]
    pub fn active_in_slot(slot: &Slot) -> Self {
        Self {
            active_only: true,
            test_type: Some(slot.test_type),
            date_from: Some(slot.appointment_date),
            date_to: Some(slot.appointment_date),
            ..Self::default()
        }
    }

    /// The appointment created for a gateway order.
    #[must_use]
    pub fn by_order_id(order_id: impl Into<String>) -> Self {
        Self {
            order_id: Some(order_id.into()),
            ..Self::default()
        }
    }

    /// Search term lower-cased, `None` when absent or blank.
    #[must_use]
    pub fn normalized_search(&self) -> Option<String> {
        self.search
            .as_deref()
            .map(str::trim)
            .filter(|term| !term.is_empty())
            .map(str::to_lowercase)
    }

    /// Evaluate the filter against a record.
    ///
    /// In-memory stores use this directly; SQL stores compile the same predicate.
    #[must_use]
    pub fn matches(&self, appointment: &Appointment) -> bool {
        if self.status.is_some_and(|status| status != appointment.status) {
            return false;
        }
        if self.active_only && !appointment.status.holds_slot() {
            return false;
        }
        if self.test_type.is_some_and(|test_type| test_type != appointment.test_type) {
            return false;
        }
        if self.date_from.is_some_and(|from| appointment.appointment_date < from) {
            return false;
        }
        if self.date_to.is_some_and(|to| appointment.appointment_date > to) {
            return false;
        }
        if self
            .order_id
            .as_deref()
            .is_some_and(|order_id| order_id != appointment.order_id)
        {
            return false;
        }
        match self.normalized_search() {
            Some(term) => [&appointment.name, &appointment.email, &appointment.phone]
                .iter()
                .any(|field| field.to_lowercase().contains(&term)),
            None => true,
        }
    }
}

/// Sort order for listings.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum AppointmentSort {
    /// Earliest appointment first
    #[default]
    DateAscending,
    /// Latest appointment first
    DateDescending,
    /// Most recently booked first
    NewestFirst,
}

impl AppointmentSort {
    /// Order two appointments according to this sort.
    #[must_use]
    pub fn compare(self, a: &Appointment, b: &Appointment) -> std::cmp::Ordering {
        match self {
            Self::DateAscending => a
                .appointment_date
                .cmp(&b.appointment_date)
                .then_with(|| a.created_at.cmp(&b.created_at)),
            Self::DateDescending => b
                .appointment_date
                .cmp(&a.appointment_date)
                .then_with(|| a.created_at.cmp(&b.created_at)),
            Self::NewestFirst => b.created_at.cmp(&a.created_at),
        }
    }
}

/// A validated page request (1-based).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PageRequest {
    page: u32,
    limit: u32,
}

impl PageRequest {
    /// Build a page request, clamping `page` to at least 1 and `limit` to
    /// `1..=MAX_PAGE_SIZE`.
    #[must_use]
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Self {
        Self {
            page: page.unwrap_or(1).max(1),
            limit: limit.unwrap_or(DEFAULT_PAGE_SIZE).clamp(1, MAX_PAGE_SIZE),
        }
    }

    /// 1-based page number
    #[must_use]
    pub const fn page(&self) -> u32 {
        self.page
    }

    /// Page size
    #[must_use]
    pub const fn limit(&self) -> u32 {
        self.limit
    }

    /// Number of records to skip
    #[must_use]
    pub fn skip(&self) -> u64 {
        u64::from(self.page - 1) * u64::from(self.limit)
    }

    /// Total page count for `total` matching records.
    #[must_use]
    pub fn total_pages(&self, total: u64) -> u64 {
        total.div_ceil(u64::from(self.limit))
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self::new(None, None)
    }
}

/// One page of results plus pagination metadata.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Page<T> {
    /// Records on this page
    pub items: Vec<T>,
    /// 1-based page number
    pub current_page: u32,
    /// Page size used
    pub limit: u32,
    /// Total matching records
    pub total_items: u64,
    /// `ceil(total_items / limit)`
    pub total_pages: u64,
}

impl<T> Page<T> {
    /// Assemble a page from the store results.
    #[must_use]
    pub fn new(items: Vec<T>, request: PageRequest, total_items: u64) -> Self {
        Self {
            items,
            current_page: request.page(),
            limit: request.limit(),
            total_items,
            total_pages: request.total_pages(total_items),
        }
    }
}
