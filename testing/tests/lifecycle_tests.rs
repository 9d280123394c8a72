//! Given-When-Then tests for the appointment lifecycle reducer.

#![allow(clippy::unwrap_used)] // Tests can unwrap

use imaging_booking_core::appointment::{AppointmentId, AppointmentStatus, PaymentStatus};
use imaging_booking_core::lifecycle::{
    AppointmentAction, AppointmentReducer, AppointmentState, LifecycleEnvironment, NotificationKind,
    TransitionOutcome,
};
use imaging_booking_core::notification::EmailTemplates;
use imaging_booking_core::TestType;
use imaging_booking_testing::fixtures::new_appointment;
use imaging_booking_testing::mocks::test_epoch;
use imaging_booking_testing::{assertions, test_clock, RecordingNotifier, ReducerTest};
use std::sync::Arc;

fn environment(notifier: RecordingNotifier) -> LifecycleEnvironment {
    LifecycleEnvironment::new(
        Arc::new(test_clock()),
        Arc::new(notifier),
        Arc::new(EmailTemplates::default()),
    )
}

fn pending() -> AppointmentState {
    AppointmentState::new(
        new_appointment("order_1", TestType::Mri, "2025-03-01T09:00")
            .into_appointment(AppointmentId::new(), test_epoch()),
    )
}

fn confirmed(payment_id: &str) -> AppointmentState {
    let mut state = pending();
    state.appointment.status = AppointmentStatus::Confirmed;
    state.appointment.payment_status = PaymentStatus::Completed;
    state.appointment.payment_id = Some(payment_id.to_string());
    AppointmentState::new(state.appointment)
}

#[test]
fn test_confirm_pending_sends_confirmation() {
    ReducerTest::new(AppointmentReducer::new())
        .with_env(environment(RecordingNotifier::new()))
        .given_state(pending())
        .when_action(AppointmentAction::ConfirmPayment {
            payment_id: "pay_1".to_string(),
        })
        .then_state(|state| {
            assert_eq!(state.outcome, Some(TransitionOutcome::Applied));
            assert_eq!(state.loaded_status, AppointmentStatus::Pending);
            assert_eq!(state.appointment.status, AppointmentStatus::Confirmed);
            assert_eq!(state.appointment.payment_status, PaymentStatus::Completed);
            assert_eq!(state.appointment.payment_id.as_deref(), Some("pay_1"));
            assert_eq!(state.appointment.updated_at, test_epoch());
        })
        .then_effects(|effects| assertions::assert_effects_count(effects, 1))
        .then_feedback(|actions| {
            assert_eq!(
                actions,
                [AppointmentAction::NotificationDelivered {
                    kind: NotificationKind::Confirmation
                }]
            );
        })
        .run();
}

#[test]
fn test_replayed_confirmation_is_unchanged() {
    ReducerTest::new(AppointmentReducer::new())
        .with_env(environment(RecordingNotifier::new()))
        .given_state(confirmed("pay_1"))
        .when_action(AppointmentAction::ConfirmPayment {
            payment_id: "pay_1".to_string(),
        })
        .then_state(|state| {
            assert_eq!(state.outcome, Some(TransitionOutcome::Unchanged));
            assert_eq!(state.appointment.status, AppointmentStatus::Confirmed);
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_confirm_with_other_payment_is_rejected() {
    ReducerTest::new(AppointmentReducer::new())
        .with_env(environment(RecordingNotifier::new()))
        .given_state(confirmed("pay_1"))
        .when_action(AppointmentAction::ConfirmPayment {
            payment_id: "pay_2".to_string(),
        })
        .then_state(|state| {
            assert_eq!(state.rejection(), Some("appointment already paid"));
            assert_eq!(state.appointment.payment_id.as_deref(), Some("pay_1"));
        })
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_confirm_then_cancel() {
    ReducerTest::new(AppointmentReducer::new())
        .with_env(environment(RecordingNotifier::new()))
        .given_state(pending())
        .when_action(AppointmentAction::ConfirmPayment {
            payment_id: "pay_1".to_string(),
        })
        .when_action(AppointmentAction::Cancel)
        .then_state(|state| {
            assert_eq!(state.appointment.status, AppointmentStatus::Cancelled);
            assert_eq!(state.appointment.payment_status, PaymentStatus::Completed);
        })
        .then_effects(assertions::assert_has_future_effect)
        .then_feedback(|actions| {
            assert_eq!(
                actions,
                [AppointmentAction::NotificationDelivered {
                    kind: NotificationKind::Cancellation
                }]
            );
        })
        .run();
}

#[test]
fn test_cancelled_rejects_everything() {
    let mut cancelled = pending();
    cancelled.appointment.status = AppointmentStatus::Cancelled;
    let cancelled = AppointmentState::new(cancelled.appointment);

    ReducerTest::new(AppointmentReducer::new())
        .with_env(environment(RecordingNotifier::new()))
        .given_state(cancelled.clone())
        .when_action(AppointmentAction::Cancel)
        .then_state(|state| assert_eq!(state.rejection(), Some("appointment already cancelled")))
        .then_effects(assertions::assert_no_effects)
        .run();

    ReducerTest::new(AppointmentReducer::new())
        .with_env(environment(RecordingNotifier::new()))
        .given_state(cancelled)
        .when_action(AppointmentAction::ConfirmPayment {
            payment_id: "pay_1".to_string(),
        })
        .then_state(|state| assert_eq!(state.rejection(), Some("appointment is cancelled")))
        .then_effects(assertions::assert_no_effects)
        .run();
}

#[test]
fn test_failed_delivery_becomes_feedback() {
    ReducerTest::new(AppointmentReducer::new())
        .with_env(environment(RecordingNotifier::failing()))
        .given_state(pending())
        .when_action(AppointmentAction::Cancel)
        .then_state(|state| assert!(state.is_applied()))
        .then_feedback(|actions| {
            assert!(matches!(
                actions,
                [AppointmentAction::NotificationFailed {
                    kind: NotificationKind::Cancellation,
                    ..
                }]
            ));
        })
        .run();
}
