//! Appointment lifecycle reducer.
//!
//! Handles the two transitions an existing appointment can go through, payment
//! confirmation and cancellation. The reducer mutates the in-memory record and
//! returns the notification effects; the caller persists the record before it
//! runs them.
//!
//! ```text
//!            ConfirmPayment             Cancel
//! pending ─────────────────▶ confirmed ────────▶ cancelled
//!    │                                              ▲
//!    └──────────────────── Cancel ──────────────────┘
//! ```

use crate::appointment::{Appointment, AppointmentId, AppointmentStatus, PaymentStatus};
use crate::effect::Effect;
use crate::environment::Clock;
use crate::notification::EmailTemplates;
use crate::providers::{EmailMessage, Notifier};
use crate::reducer::Reducer;
use chrono::{DateTime, Utc};
use smallvec::{SmallVec, smallvec};
use std::sync::Arc;

// ============================================================================
// Actions (Commands + Events)
// ============================================================================

/// Which email a notification effect sends.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum NotificationKind {
    /// Payment confirmed
    Confirmation,
    /// Appointment cancelled
    Cancellation,
}

impl NotificationKind {
    /// Metric / log label.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Confirmation => "confirmation",
            Self::Cancellation => "cancellation",
        }
    }
}

/// Actions for the appointment lifecycle
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AppointmentAction {
    // Commands
    /// Record a verified payment
    ConfirmPayment {
        /// Gateway payment id
        payment_id: String,
    },

    /// Cancel the appointment
    Cancel,

    // Events
    /// Payment was confirmed
    PaymentConfirmed {
        /// Gateway payment id
        payment_id: String,
        /// When confirmed
        confirmed_at: DateTime<Utc>,
    },

    /// Appointment was cancelled
    AppointmentCancelled {
        /// When cancelled
        cancelled_at: DateTime<Utc>,
    },

    /// A command was not allowed in the current status
    TransitionRejected {
        /// Caller-facing reason
        reason: String,
    },

    // Feedback from notification effects
    /// Email handed to the transport
    NotificationDelivered {
        /// Email kind
        kind: NotificationKind,
    },

    /// Email could not be sent
    NotificationFailed {
        /// Email kind
        kind: NotificationKind,
        /// Transport error
        reason: String,
    },
}

// ============================================================================
// State
// ============================================================================

/// Result of the last command applied to an [`AppointmentState`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The record changed and must be persisted
    Applied,
    /// The command was a repeat of the current state; nothing to persist
    Unchanged,
    /// The command is not allowed from the current status
    Rejected(String),
}

/// A single appointment under transition.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct AppointmentState {
    /// The record, mutated in place
    pub appointment: Appointment,
    /// Status the record had when loaded; used as the optimistic write guard
    pub loaded_status: AppointmentStatus,
    /// Outcome of the most recent command
    pub outcome: Option<TransitionOutcome>,
}

impl AppointmentState {
    /// Wrap a freshly loaded record.
    #[must_use]
    pub fn new(appointment: Appointment) -> Self {
        Self {
            loaded_status: appointment.status,
            appointment,
            outcome: None,
        }
    }

    /// Identifier of the wrapped record.
    #[must_use]
    pub const fn id(&self) -> AppointmentId {
        self.appointment.id
    }

    /// Whether the last command changed the record.
    #[must_use]
    pub fn is_applied(&self) -> bool {
        matches!(self.outcome, Some(TransitionOutcome::Applied))
    }

    /// Reason the last command was rejected, if it was.
    #[must_use]
    pub fn rejection(&self) -> Option<&str> {
        match &self.outcome {
            Some(TransitionOutcome::Rejected(reason)) => Some(reason),
            _ => None,
        }
    }
}

// ============================================================================
// Environment
// ============================================================================

/// Environment dependencies for the lifecycle reducer
#[derive(Clone)]
pub struct LifecycleEnvironment {
    /// Clock for timestamps
    pub clock: Arc<dyn Clock>,
    /// Email sender used by notification effects
    pub notifier: Arc<dyn Notifier>,
    /// Email templates
    pub templates: Arc<EmailTemplates>,
}

impl LifecycleEnvironment {
    /// Creates a new `LifecycleEnvironment`
    #[must_use]
    pub fn new(clock: Arc<dyn Clock>, notifier: Arc<dyn Notifier>, templates: Arc<EmailTemplates>) -> Self {
        Self {
            clock,
            notifier,
            templates,
        }
    }
}

// ============================================================================
// Reducer
// ============================================================================

/// Reducer for confirm and cancel transitions
#[derive(Clone, Debug, Default)]
pub struct AppointmentReducer;

impl AppointmentReducer {
    /// Creates a new `AppointmentReducer`
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Applies an event to state
    fn apply_event(state: &mut AppointmentState, action: &AppointmentAction) {
        match action {
            AppointmentAction::PaymentConfirmed {
                payment_id,
                confirmed_at,
            } => {
                let appointment = &mut state.appointment;
                appointment.status = AppointmentStatus::Confirmed;
                appointment.payment_status = PaymentStatus::Completed;
                appointment.payment_id = Some(payment_id.clone());
                appointment.updated_at = *confirmed_at;
                state.outcome = Some(TransitionOutcome::Applied);
            },

            AppointmentAction::AppointmentCancelled { cancelled_at } => {
                state.appointment.status = AppointmentStatus::Cancelled;
                state.appointment.updated_at = *cancelled_at;
                state.outcome = Some(TransitionOutcome::Applied);
            },

            AppointmentAction::TransitionRejected { reason } => {
                state.outcome = Some(TransitionOutcome::Rejected(reason.clone()));
            },

            // Commands and notification feedback don't modify state
            AppointmentAction::ConfirmPayment { .. }
            | AppointmentAction::Cancel
            | AppointmentAction::NotificationDelivered { .. }
            | AppointmentAction::NotificationFailed { .. } => {},
        }
    }

    fn reject(state: &mut AppointmentState, reason: &str) -> SmallVec<[Effect<AppointmentAction>; 4]> {
        Self::apply_event(
            state,
            &AppointmentAction::TransitionRejected {
                reason: reason.to_string(),
            },
        );
        SmallVec::new()
    }

    /// Effect that sends `message` and reports the result as a feedback action.
    fn notify(
        env: &LifecycleEnvironment,
        kind: NotificationKind,
        appointment_id: AppointmentId,
        message: EmailMessage,
    ) -> Effect<AppointmentAction> {
        let notifier = Arc::clone(&env.notifier);
        Effect::Future(Box::pin(async move {
            match notifier.send(message).await {
                Ok(()) => {
                    tracing::info!(%appointment_id, kind = kind.as_str(), "Notification sent");
                    Some(AppointmentAction::NotificationDelivered { kind })
                },
                Err(error) => {
                    tracing::warn!(
                        %appointment_id,
                        kind = kind.as_str(),
                        error = %error,
                        "Notification failed"
                    );
                    Some(AppointmentAction::NotificationFailed {
                        kind,
                        reason: error.to_string(),
                    })
                },
            }
        }))
    }
}

impl Reducer for AppointmentReducer {
    type State = AppointmentState;
    type Action = AppointmentAction;
    type Environment = LifecycleEnvironment;

    fn reduce(
        &self,
        state: &mut Self::State,
        action: Self::Action,
        env: &Self::Environment,
    ) -> SmallVec<[Effect<Self::Action>; 4]> {
        match action {
            // ========== Confirm Payment ==========
            AppointmentAction::ConfirmPayment { payment_id } => match state.appointment.status {
                AppointmentStatus::Pending => {
                    Self::apply_event(
                        state,
                        &AppointmentAction::PaymentConfirmed {
                            payment_id,
                            confirmed_at: env.clock.now(),
                        },
                    );
                    let message = env.templates.confirmation(&state.appointment);
                    smallvec![Self::notify(env, NotificationKind::Confirmation, state.id(), message)]
                },
                AppointmentStatus::Confirmed
                    if state.appointment.payment_id.as_deref() == Some(payment_id.as_str()) =>
                {
                    // Replayed callback: same terminal state, no second email
                    state.outcome = Some(TransitionOutcome::Unchanged);
                    SmallVec::new()
                },
                AppointmentStatus::Confirmed => Self::reject(state, "appointment already paid"),
                AppointmentStatus::Cancelled => Self::reject(state, "appointment is cancelled"),
            },

            // ========== Cancel ==========
            AppointmentAction::Cancel => match state.appointment.status {
                AppointmentStatus::Pending | AppointmentStatus::Confirmed => {
                    Self::apply_event(
                        state,
                        &AppointmentAction::AppointmentCancelled {
                            cancelled_at: env.clock.now(),
                        },
                    );
                    let message = env.templates.cancellation(&state.appointment);
                    smallvec![Self::notify(env, NotificationKind::Cancellation, state.id(), message)]
                },
                AppointmentStatus::Cancelled => Self::reject(state, "appointment already cancelled"),
            },

            // ========== Events ==========
            event => {
                Self::apply_event(state, &event);
                SmallVec::new()
            },
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::panic)]
mod tests {
    use super::*;
    use crate::appointment::NewAppointment;
    use crate::providers::{BoxFuture, NotifyError};
    use crate::test_type::TestType;
    use std::sync::Mutex;

    struct FixedClock(DateTime<Utc>);

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.0
        }
    }

    #[derive(Default)]
    struct CapturingNotifier {
        sent: Mutex<Vec<EmailMessage>>,
        fail: bool,
    }

    impl Notifier for CapturingNotifier {
        fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<(), NotifyError>> {
            Box::pin(async move {
                if self.fail {
                    return Err(NotifyError::Delivery("smtp down".to_string()));
                }
                self.sent.lock().unwrap().push(message);
                Ok(())
            })
        }
    }

    fn now() -> DateTime<Utc> {
        "2025-01-01T12:00:00Z".parse().unwrap()
    }

    fn env(notifier: Arc<CapturingNotifier>) -> LifecycleEnvironment {
        LifecycleEnvironment::new(Arc::new(FixedClock(now())), notifier, Arc::new(EmailTemplates::default()))
    }

    fn pending() -> AppointmentState {
        AppointmentState::new(
            NewAppointment {
                name: "Ravi".to_string(),
                email: "ravi@example.com".to_string(),
                phone: "9876543210".to_string(),
                test_type: TestType::Ultrasound,
                appointment_date: "2025-02-01T10:00:00Z".parse().unwrap(),
                notes: None,
                amount: TestType::Ultrasound.price(),
                order_id: "order_9".to_string(),
            }
            .into_appointment(AppointmentId::new(), "2025-01-01T00:00:00Z".parse().unwrap()),
        )
    }

    async fn run(effect: Effect<AppointmentAction>) -> Option<AppointmentAction> {
        match effect {
            Effect::Future(future) => future.await,
            other => panic!("expected future effect, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_confirm_sends_email_after_transition() {
        let notifier = Arc::new(CapturingNotifier::default());
        let mut state = pending();

        let mut effects = AppointmentReducer::new().reduce(
            &mut state,
            AppointmentAction::ConfirmPayment {
                payment_id: "pay_1".to_string(),
            },
            &env(Arc::clone(&notifier)),
        );

        assert!(state.is_applied());
        assert_eq!(state.loaded_status, AppointmentStatus::Pending);
        assert_eq!(state.appointment.status, AppointmentStatus::Confirmed);
        assert_eq!(state.appointment.updated_at, now());
        assert_eq!(effects.len(), 1);
        assert!(notifier.sent.lock().unwrap().is_empty());

        let feedback = run(effects.remove(0)).await;
        assert_eq!(
            feedback,
            Some(AppointmentAction::NotificationDelivered {
                kind: NotificationKind::Confirmation
            })
        );
        assert!(notifier.sent.lock().unwrap()[0].html_body.contains("pay_1"));
    }

    #[tokio::test]
    async fn test_notifier_failure_becomes_feedback() {
        let notifier = Arc::new(CapturingNotifier {
            fail: true,
            ..CapturingNotifier::default()
        });
        let mut state = pending();

        let mut effects = AppointmentReducer::new().reduce(&mut state, AppointmentAction::Cancel, &env(notifier));

        assert_eq!(state.appointment.status, AppointmentStatus::Cancelled);
        assert!(matches!(
            run(effects.remove(0)).await,
            Some(AppointmentAction::NotificationFailed {
                kind: NotificationKind::Cancellation,
                ..
            })
        ));
    }

    #[test]
    fn test_cancelled_is_terminal() {
        let notifier = Arc::new(CapturingNotifier::default());
        let env = env(notifier);
        let reducer = AppointmentReducer::new();
        let mut state = pending();
        state.appointment.status = AppointmentStatus::Cancelled;
        let before = state.appointment.clone();

        let effects = reducer.reduce(&mut state, AppointmentAction::Cancel, &env);
        assert!(effects.is_empty());
        assert_eq!(state.rejection(), Some("appointment already cancelled"));

        let effects = reducer.reduce(
            &mut state,
            AppointmentAction::ConfirmPayment {
                payment_id: "pay_1".to_string(),
            },
            &env,
        );
        assert!(effects.is_empty());
        assert_eq!(state.rejection(), Some("appointment is cancelled"));
        assert_eq!(state.appointment, before);
    }
}
