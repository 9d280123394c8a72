//! # Imaging Booking Testing
//!
//! Testing utilities for the imaging booking workspace.
//!
//! This crate provides:
//! - Deterministic clocks
//! - In-memory and recording implementations of the collaborator traits
//! - Request fixtures and a payment signature helper
//! - Property-based testing strategies
//! - A Given-When-Then harness for reducers
//!
//! ## Example
//!
//! ```ignore
//! use imaging_booking_testing::{InMemoryAppointmentStore, RecordingNotifier, RecordingPaymentGateway, test_clock};
//!
//! #[tokio::test]
//! async fn books_an_xray() {
//!     let store = Arc::new(InMemoryAppointmentStore::new());
//!     let gateway = Arc::new(RecordingPaymentGateway::new("secret"));
//!     let notifier = Arc::new(RecordingNotifier::new());
//!     let service = AppointmentService::new(store, gateway, notifier, Arc::new(test_clock()), ..);
//!
//!     let booked = service.book(&fixtures::booking_request("xray", "2025-06-01T10:00")).await?;
//!     assert_eq!(booked.appointment.amount, 1000);
//! }
//! ```

use chrono::{DateTime, Utc};
use imaging_booking_core::environment::Clock;

pub mod fixtures;
pub mod provider_mocks;
pub mod reducer_test;
pub mod store_mocks;

/// Mock implementations of Environment traits
pub mod mocks {
    use super::{Clock, DateTime, Utc};
    use std::sync::RwLock;

    /// Fixed clock for deterministic tests
    ///
    /// Always returns the same time, making tests reproducible.
    ///
    /// # Example
    ///
    /// ```
    /// use imaging_booking_testing::mocks::FixedClock;
    /// use imaging_booking_core::environment::Clock;
    /// use chrono::Utc;
    ///
    /// let clock = FixedClock::new(Utc::now());
    /// assert_eq!(clock.now(), clock.now());
    /// ```
    #[derive(Debug, Clone)]
    pub struct FixedClock {
        time: DateTime<Utc>,
    }

    impl FixedClock {
        /// Create a new fixed clock with the given time
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self { time }
        }
    }

    impl Clock for FixedClock {
        fn now(&self) -> DateTime<Utc> {
            self.time
        }
    }

    /// Clock that only moves when a test moves it.
    #[derive(Debug)]
    pub struct ManualClock {
        time: RwLock<DateTime<Utc>>,
    }

    impl ManualClock {
        /// Start at `time`.
        #[must_use]
        pub const fn new(time: DateTime<Utc>) -> Self {
            Self {
                time: RwLock::new(time),
            }
        }

        /// Jump to `time`.
        #[allow(clippy::unwrap_used)]
        pub fn set(&self, time: DateTime<Utc>) {
            *self.time.write().unwrap() = time;
        }

        /// Move forward by `delta`.
        #[allow(clippy::unwrap_used)]
        pub fn advance(&self, delta: chrono::TimeDelta) {
            let mut time = self.time.write().unwrap();
            *time += delta;
        }
    }

    impl Clock for ManualClock {
        #[allow(clippy::unwrap_used)]
        fn now(&self) -> DateTime<Utc> {
            *self.time.read().unwrap()
        }
    }

    /// Create a default fixed clock for tests (2025-01-01 00:00:00 UTC)
    #[must_use]
    pub fn test_clock() -> FixedClock {
        FixedClock::new(test_epoch())
    }

    /// The instant [`test_clock`] reports.
    #[must_use]
    pub fn test_epoch() -> DateTime<Utc> {
        DateTime::<Utc>::from_timestamp(1_735_689_600, 0).unwrap_or_default()
    }
}

/// Property-based testing strategies for domain inputs.
pub mod properties {
    use imaging_booking_core::TestType;
    use proptest::prelude::*;

    /// Any catalogue test type.
    pub fn test_type() -> impl Strategy<Value = TestType> {
        proptest::sample::select(TestType::ALL.to_vec())
    }

    /// Ten digit phone numbers.
    pub fn phone() -> impl Strategy<Value = String> {
        "[0-9]{10}"
    }

    /// Addresses matching the booking email rule.
    pub fn email() -> impl Strategy<Value = String> {
        ("[a-z][a-z0-9._]{0,15}", "[a-z]{2,10}", "[a-z]{2,4}").prop_map(|(local, domain, tld)| format!("{local}@{domain}.{tld}"))
    }

    /// Hour offsets (1 hour to ~1 year) after the test epoch, as naive ISO strings.
    pub fn future_slot() -> impl Strategy<Value = String> {
        (1i64..8_760).prop_map(|hours| {
            (super::mocks::test_epoch() + chrono::TimeDelta::hours(hours))
                .format("%Y-%m-%dT%H:%M")
                .to_string()
        })
    }
}

// Re-export commonly used items
pub use mocks::{FixedClock, ManualClock, test_clock};
pub use provider_mocks::{RecordingNotifier, RecordingPaymentGateway};
pub use reducer_test::{ReducerTest, assertions};
pub use store_mocks::InMemoryAppointmentStore;
