//! In-memory appointment store
//!
//! [`InMemoryAppointmentStore`] enforces the same uniqueness rules as the
//! Postgres store (one active appointment per slot, one appointment per order
//! id) under a single write lock, so concurrent workflow tests see the same
//! conflicts production would.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use chrono::Utc;
use imaging_booking_core::appointment::{Appointment, AppointmentId, AppointmentStatus, NewAppointment};
use imaging_booking_core::providers::{
    ACTIVE_SLOT_CONSTRAINT, AppointmentStore, BoxFuture, ORDER_ID_CONSTRAINT, StoreError,
};
use imaging_booking_core::query::{AppointmentFilter, AppointmentSort};
use std::collections::{HashMap, VecDeque};
use std::sync::{Arc, Mutex, RwLock};

/// `HashMap`-backed [`AppointmentStore`] for fast, deterministic tests.
///
/// # Example
///
/// ```
/// use imaging_booking_testing::InMemoryAppointmentStore;
///
/// let store = InMemoryAppointmentStore::new();
/// assert!(store.is_empty());
/// ```
#[derive(Clone, Debug, Default)]
pub struct InMemoryAppointmentStore {
    records: Arc<RwLock<HashMap<AppointmentId, Appointment>>>,
    failures: Arc<Mutex<VecDeque<StoreError>>>,
}

impl InMemoryAppointmentStore {
    /// Create a new empty store
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next store call fail with `error`. Calls queue in order.
    pub fn fail_next(&self, error: StoreError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Insert a fully formed record, bypassing uniqueness checks.
    pub fn seed(&self, appointment: Appointment) {
        self.records.write().unwrap().insert(appointment.id, appointment);
    }

    /// Snapshot of a record.
    #[must_use]
    pub fn get(&self, id: AppointmentId) -> Option<Appointment> {
        self.records.read().unwrap().get(&id).cloned()
    }

    /// All records, in no particular order.
    #[must_use]
    pub fn all(&self) -> Vec<Appointment> {
        self.records.read().unwrap().values().cloned().collect()
    }

    /// Number of stored records
    #[must_use]
    pub fn len(&self) -> usize {
        self.records.read().unwrap().len()
    }

    /// Check if the store is empty
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.records.read().unwrap().is_empty()
    }

    fn injected_failure(&self) -> Result<(), StoreError> {
        self.failures.lock().unwrap().pop_front().map_or(Ok(()), Err)
    }

    fn slot_taken(
        records: &HashMap<AppointmentId, Appointment>,
        candidate: &Appointment,
    ) -> bool {
        let filter = AppointmentFilter::active_in_slot(&candidate.slot());
        records
            .values()
            .any(|other| other.id != candidate.id && filter.matches(other))
    }

    fn duplicate(constraint: &str) -> StoreError {
        StoreError::Duplicate {
            constraint: constraint.to_string(),
        }
    }
}

impl AppointmentStore for InMemoryAppointmentStore {
    fn find<'a>(
        &'a self,
        filter: &'a AppointmentFilter,
        sort: AppointmentSort,
        skip: u64,
        limit: u32,
    ) -> BoxFuture<'a, Result<Vec<Appointment>, StoreError>> {
        Box::pin(async move {
            self.injected_failure()?;
            let mut matches: Vec<Appointment> = self
                .records
                .read()
                .unwrap()
                .values()
                .filter(|appointment| filter.matches(appointment))
                .cloned()
                .collect();
            matches.sort_by(|a, b| sort.compare(a, b));
            Ok(matches
                .into_iter()
                .skip(usize::try_from(skip).unwrap_or(usize::MAX))
                .take(limit as usize)
                .collect())
        })
    }

    fn count<'a>(&'a self, filter: &'a AppointmentFilter) -> BoxFuture<'a, Result<u64, StoreError>> {
        Box::pin(async move {
            self.injected_failure()?;
            let count = self
                .records
                .read()
                .unwrap()
                .values()
                .filter(|appointment| filter.matches(appointment))
                .count();
            Ok(count as u64)
        })
    }

    fn find_by_id(&self, id: AppointmentId) -> BoxFuture<'_, Result<Option<Appointment>, StoreError>> {
        Box::pin(async move {
            self.injected_failure()?;
            Ok(self.get(id))
        })
    }

    fn find_one<'a>(
        &'a self,
        filter: &'a AppointmentFilter,
    ) -> BoxFuture<'a, Result<Option<Appointment>, StoreError>> {
        Box::pin(async move {
            self.injected_failure()?;
            let records = self.records.read().unwrap();
            let mut matches: Vec<&Appointment> =
                records.values().filter(|appointment| filter.matches(appointment)).collect();
            matches.sort_by(|a, b| AppointmentSort::DateAscending.compare(a, b));
            Ok(matches.first().map(|appointment| (*appointment).clone()))
        })
    }

    fn insert(&self, appointment: NewAppointment) -> BoxFuture<'_, Result<Appointment, StoreError>> {
        Box::pin(async move {
            self.injected_failure()?;
            let mut records = self.records.write().unwrap();

            if records.values().any(|existing| existing.order_id == appointment.order_id) {
                return Err(Self::duplicate(ORDER_ID_CONSTRAINT));
            }

            let record = appointment.into_appointment(AppointmentId::new(), Utc::now());
            if Self::slot_taken(&records, &record) {
                return Err(Self::duplicate(ACTIVE_SLOT_CONSTRAINT));
            }

            records.insert(record.id, record.clone());
            Ok(record)
        })
    }

    fn update<'a>(
        &'a self,
        appointment: &'a Appointment,
        expected_status: AppointmentStatus,
    ) -> BoxFuture<'a, Result<Appointment, StoreError>> {
        Box::pin(async move {
            self.injected_failure()?;
            let mut records = self.records.write().unwrap();

            let stored = records.get(&appointment.id).ok_or(StoreError::NotFound)?;
            if stored.status != expected_status {
                return Err(StoreError::StaleWrite);
            }

            let mut updated = stored.clone();
            updated.status = appointment.status;
            updated.payment_status = appointment.payment_status;
            updated.payment_id.clone_from(&appointment.payment_id);
            updated.notes.clone_from(&appointment.notes);
            updated.updated_at = Utc::now();

            if updated.status.holds_slot() && Self::slot_taken(&records, &updated) {
                return Err(Self::duplicate(ACTIVE_SLOT_CONSTRAINT));
            }

            records.insert(updated.id, updated.clone());
            Ok(updated)
        })
    }

    fn delete(&self, id: AppointmentId) -> BoxFuture<'_, Result<bool, StoreError>> {
        Box::pin(async move {
            self.injected_failure()?;
            Ok(self.records.write().unwrap().remove(&id).is_some())
        })
    }

    fn ping(&self) -> BoxFuture<'_, Result<(), StoreError>> {
        Box::pin(async move { self.injected_failure() })
    }
}
