//! Appointment workflows.
//!
//! [`AppointmentService`] owns the collaborators (store, gateway, notifier via
//! the lifecycle environment) and runs each operation to completion:
//!
//! ```text
//! book            validate ─▶ slot pre-check ─▶ create order (retried) ─▶ insert
//! verify_payment  validate ─▶ verify HMAC ─▶ load by order ─▶ ConfirmPayment
//! cancel          load by id ─▶ Cancel
//!
//! transition      reduce ─▶ persist (expected status) ─▶ run notification effects
//! ```
//!
//! Notification effects run detached on the [`EffectRunner`]; their failures
//! are counted and logged, never returned.

mod booking;
mod queries;

pub use booking::BookingReceipt;

use crate::metrics;
use imaging_booking_core::appointment::Appointment;
use imaging_booking_core::environment::Clock;
use imaging_booking_core::error::{BookingError, Result};
use imaging_booking_core::lifecycle::{
    AppointmentAction, AppointmentReducer, AppointmentState, LifecycleEnvironment, TransitionOutcome,
};
use imaging_booking_core::notification::EmailTemplates;
use imaging_booking_core::providers::{AppointmentStore, Notifier, PaymentGateway, StoreError};
use imaging_booking_core::reducer::Reducer;
use imaging_booking_runtime::retry::RetryPolicy;
use imaging_booking_runtime::EffectRunner;
use std::sync::Arc;

/// Default order currency.
pub const DEFAULT_CURRENCY: &str = "INR";

/// Booking, payment confirmation and lifecycle operations.
#[derive(Clone)]
pub struct AppointmentService {
    store: Arc<dyn AppointmentStore>,
    gateway: Arc<dyn PaymentGateway>,
    runner: EffectRunner,
    reducer: AppointmentReducer,
    env: LifecycleEnvironment,
    retry: RetryPolicy,
    currency: String,
}

impl AppointmentService {
    /// Create a service with default templates, retry policy and currency.
    #[must_use]
    pub fn new(
        store: Arc<dyn AppointmentStore>,
        gateway: Arc<dyn PaymentGateway>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn Clock>,
        runner: EffectRunner,
    ) -> Self {
        Self {
            store,
            gateway,
            runner,
            reducer: AppointmentReducer::new(),
            env: LifecycleEnvironment::new(clock, notifier, Arc::new(EmailTemplates::default())),
            retry: RetryPolicy::default(),
            currency: DEFAULT_CURRENCY.to_string(),
        }
    }

    /// Use `templates` for notification emails.
    #[must_use]
    pub fn with_templates(mut self, templates: EmailTemplates) -> Self {
        self.env.templates = Arc::new(templates);
        self
    }

    /// Retry policy for gateway order creation.
    #[must_use]
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Currency for new orders.
    #[must_use]
    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    /// The effect runner executing notifications.
    #[must_use]
    pub const fn runner(&self) -> &EffectRunner {
        &self.runner
    }

    /// Apply `action` to `appointment`, persist the result and dispatch its
    /// effects.
    ///
    /// Returns the stored record and whether anything changed. An
    /// [`TransitionOutcome::Unchanged`] command skips the write and the
    /// effects.
    async fn transition(&self, appointment: Appointment, action: AppointmentAction) -> Result<(Appointment, bool)> {
        let mut state = AppointmentState::new(appointment);
        let effects = self.reducer.reduce(&mut state, action, &self.env);

        match state.outcome.take() {
            Some(TransitionOutcome::Applied) => {},
            Some(TransitionOutcome::Rejected(reason)) => {
                tracing::debug!(appointment_id = %state.id(), %reason, "Transition rejected");
                return Err(BookingError::conflict(reason));
            },
            Some(TransitionOutcome::Unchanged) | None => return Ok((state.appointment, false)),
        }

        let stored = self
            .store
            .update(&state.appointment, state.loaded_status)
            .await
            .map_err(|error| match error {
                StoreError::StaleWrite => BookingError::conflict("appointment was modified concurrently"),
                StoreError::NotFound => BookingError::appointment_not_found(),
                other => other.into(),
            })?;

        tracing::info!(
            appointment_id = %stored.id,
            from = %state.loaded_status,
            to = %stored.status,
            "Appointment transitioned"
        );

        // Only after the write is durable
        self.runner.run(effects, |action: AppointmentAction| metrics::record_notification(&action));

        Ok((stored, true))
    }
}
