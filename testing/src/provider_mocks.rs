//! Recording doubles for the payment gateway and the notifier.

#![allow(clippy::unwrap_used)] // Test infrastructure uses unwrap for simplicity
#![allow(clippy::missing_panics_doc)] // Lock poisoning only follows a panicking test

use imaging_booking_core::providers::{
    BoxFuture, CreateOrderRequest, EmailMessage, GatewayError, Notifier, NotifyError, PaymentGateway, PaymentOrder,
};
use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

// ============================================================================
// Gateway
// ============================================================================

/// Payment gateway double that records every order request.
///
/// Orders get sequential ids (`order_test_1`, `order_test_2`, ...). Failures
/// can be queued with [`fail_next`](Self::fail_next).
#[derive(Debug)]
pub struct RecordingPaymentGateway {
    secret: String,
    requests: Mutex<Vec<CreateOrderRequest>>,
    failures: Mutex<VecDeque<GatewayError>>,
    next_id: AtomicUsize,
}

impl RecordingPaymentGateway {
    /// Gateway signing callbacks with `secret`.
    #[must_use]
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
            requests: Mutex::new(Vec::new()),
            failures: Mutex::new(VecDeque::new()),
            next_id: AtomicUsize::new(1),
        }
    }

    /// Make the next `create_order` call fail. Calls queue in order.
    pub fn fail_next(&self, error: GatewayError) {
        self.failures.lock().unwrap().push_back(error);
    }

    /// Every request received, including failed ones.
    #[must_use]
    pub fn requests(&self) -> Vec<CreateOrderRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Number of `create_order` calls.
    #[must_use]
    pub fn call_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl PaymentGateway for RecordingPaymentGateway {
    fn create_order(&self, request: CreateOrderRequest) -> BoxFuture<'_, Result<PaymentOrder, GatewayError>> {
        Box::pin(async move {
            self.requests.lock().unwrap().push(request.clone());
            if let Some(error) = self.failures.lock().unwrap().pop_front() {
                return Err(error);
            }
            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            Ok(PaymentOrder {
                id: format!("order_test_{id}"),
                amount: request.amount_minor,
                currency: request.currency,
            })
        })
    }

    fn signing_secret(&self) -> &str {
        &self.secret
    }
}

// ============================================================================
// Notifier
// ============================================================================

/// Notifier double that records every send attempt.
#[derive(Debug, Default)]
pub struct RecordingNotifier {
    attempts: Mutex<Vec<EmailMessage>>,
    delivered: Mutex<Vec<EmailMessage>>,
    failing: AtomicBool,
    delay: Mutex<Option<Duration>>,
    attempt_count: AtomicUsize,
}

impl RecordingNotifier {
    /// Notifier that accepts every message.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Notifier whose sends all fail.
    #[must_use]
    pub fn failing() -> Self {
        let notifier = Self::default();
        notifier.set_failing(true);
        notifier
    }

    /// Toggle failure mode.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Delay every send by `delay`, keeping it in flight.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    /// Every message passed to `send`, delivered or not.
    #[must_use]
    pub fn attempts(&self) -> Vec<EmailMessage> {
        self.attempts.lock().unwrap().clone()
    }

    /// Messages that were accepted.
    #[must_use]
    pub fn delivered(&self) -> Vec<EmailMessage> {
        self.delivered.lock().unwrap().clone()
    }

    /// Number of `send` calls so far.
    #[must_use]
    pub fn attempt_count(&self) -> usize {
        self.attempt_count.load(Ordering::SeqCst)
    }

    /// Poll until at least `count` sends were attempted or `timeout` passes.
    /// Returns whether the count was reached.
    pub async fn wait_for_attempts(&self, count: usize, timeout: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + timeout;
        loop {
            if self.attempt_count() >= count {
                return true;
            }
            if tokio::time::Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

impl Notifier for RecordingNotifier {
    fn send(&self, message: EmailMessage) -> BoxFuture<'_, Result<(), NotifyError>> {
        Box::pin(async move {
            self.attempts.lock().unwrap().push(message.clone());
            self.attempt_count.fetch_add(1, Ordering::SeqCst);

            let delay = *self.delay.lock().unwrap();
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }

            if self.failing.load(Ordering::SeqCst) {
                return Err(NotifyError::Delivery("recording notifier set to fail".to_string()));
            }
            self.delivered.lock().unwrap().push(message);
            Ok(())
        })
    }
}
