//! Cancel, delete, list and get.

use super::AppointmentService;
use crate::metrics;
use imaging_booking_core::appointment::{Appointment, AppointmentId};
use imaging_booking_core::error::{BookingError, Result};
use imaging_booking_core::lifecycle::AppointmentAction;
use imaging_booking_core::query::{AppointmentSort, Page};
use imaging_booking_core::validation::ListQuery;

/// Malformed identifiers are treated as unknown.
fn parse_id(id: &str) -> Result<AppointmentId> {
    AppointmentId::parse(id).ok_or_else(BookingError::appointment_not_found)
}

impl AppointmentService {
    /// Cancel a pending or confirmed appointment and send a cancellation email.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown id
    /// - [`BookingError::Conflict`] if it is already cancelled or changed concurrently
    /// - [`BookingError::Dependency`] when the store fails
    #[tracing::instrument(skip(self))]
    pub async fn cancel(&self, id: &str) -> Result<Appointment> {
        let appointment = self.get(id).await?;
        let (appointment, _) = self.transition(appointment, AppointmentAction::Cancel).await?;
        metrics::record_appointment("cancelled");
        Ok(appointment)
    }

    /// Permanently remove an appointment. No notification is sent.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown id
    /// - [`BookingError::Dependency`] when the store fails
    #[tracing::instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<()> {
        let id = parse_id(id)?;
        if !self.store.delete(id).await? {
            return Err(BookingError::appointment_not_found());
        }
        metrics::record_appointment("deleted");
        tracing::info!(appointment_id = %id, "Appointment deleted");
        Ok(())
    }

    /// One page of appointments matching `query`, earliest first.
    ///
    /// # Errors
    ///
    /// - [`BookingError::Validation`] for unknown filter values or bad dates
    /// - [`BookingError::Dependency`] when the store fails
    #[tracing::instrument(skip_all)]
    pub async fn list(&self, query: &ListQuery) -> Result<Page<Appointment>> {
        let criteria = query.parse()?;
        let (items, total) = tokio::try_join!(
            self.store.find(
                &criteria.filter,
                AppointmentSort::DateAscending,
                criteria.page.skip(),
                criteria.page.limit(),
            ),
            self.store.count(&criteria.filter),
        )?;
        tracing::debug!(returned = items.len(), total, "Listed appointments");
        Ok(Page::new(items, criteria.page, total))
    }

    /// A single appointment.
    ///
    /// # Errors
    ///
    /// - [`BookingError::NotFound`] for an unknown or malformed id
    /// - [`BookingError::Dependency`] when the store fails
    pub async fn get(&self, id: &str) -> Result<Appointment> {
        let id = parse_id(id)?;
        self.store
            .find_by_id(id)
            .await?
            .ok_or_else(BookingError::appointment_not_found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_id_is_not_found() {
        assert!(matches!(parse_id("not-a-uuid"), Err(BookingError::NotFound(_))));
        assert!(parse_id(&AppointmentId::new().to_string()).is_ok());
    }
}
