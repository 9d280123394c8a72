//! # Imaging Booking Core
//!
//! Domain model and business rules for booking diagnostic-imaging appointments.
//!
//! This crate holds everything that does not perform I/O:
//!
//! - **Appointment**: the central record and its status enums
//! - **Test types**: the fixed catalogue and price table
//! - **Validation**: turning raw booking input into a [`validation::ValidatedBooking`]
//! - **Signature**: HMAC-SHA256 verification of gateway payment callbacks
//! - **Lifecycle reducer**: `(State, Action, Environment) → (State, Effects)` for
//!   confirm and cancel transitions
//! - **Providers**: the store, gateway and notifier traits the workflows depend on
//!
//! ## Architecture
//!
//! The workflows in the `imaging-booking` crate are the imperative shell. They load
//! records through [`providers::AppointmentStore`], run the pure
//! [`lifecycle::AppointmentReducer`], persist the new state and only then hand the
//! returned effects (email sends) to the runtime.
//!
//! ```text
//! request ──▶ validate ──▶ store lookup ──▶ reduce ──▶ persist ──▶ run effects
//!                (pure)                      (pure)               (detached)
//! ```

// Re-export commonly used types
pub use chrono::{DateTime, Utc};
pub use serde::{Deserialize, Serialize};
pub use smallvec::{SmallVec, smallvec};

pub mod appointment;
pub mod error;
pub mod lifecycle;
pub mod notification;
pub mod providers;
pub mod query;
pub mod signature;
pub mod test_type;
pub mod validation;

pub use appointment::{Appointment, AppointmentId, AppointmentStatus, NewAppointment, PaymentStatus};
pub use error::{BookingError, DependencyError};
pub use test_type::TestType;

/// Reducer module - the core trait for state transitions
///
/// Reducers are pure functions: `(State, Action, Environment) → (State, Effects)`.
/// They never perform I/O themselves; anything with a side effect is returned as an
/// [`Effect`](effect::Effect) for the runtime to execute.
pub mod reducer {
    use super::effect::Effect;
    use smallvec::SmallVec;

    /// The Reducer trait
    ///
    /// # Type Parameters
    ///
    /// - `State`: The domain state this reducer operates on
    /// - `Action`: The action type this reducer processes
    /// - `Environment`: The injected dependencies this reducer needs
    pub trait Reducer {
        /// The state type this reducer operates on
        type State;

        /// The action type this reducer processes
        type Action;

        /// The environment type with injected dependencies
        type Environment;

        /// Reduce an action into state changes and effects
        ///
        /// Validates the action, updates `state` in place and returns the effects to
        /// execute once the new state has been made durable.
        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            env: &Self::Environment,
        ) -> SmallVec<[Effect<Self::Action>; 4]>;
    }
}

/// Effect module - side effect descriptions
///
/// Effects are values, not execution. The runtime decides when and how they run.
pub mod effect {
    use std::future::Future;
    use std::pin::Pin;

    /// Effect type - describes a side effect to be executed
    ///
    /// # Type Parameters
    ///
    /// - `Action`: The action type that effects can produce (feedback loop)
    pub enum Effect<Action> {
        /// No-op effect
        None,

        /// Run effects in parallel
        Parallel(Vec<Effect<Action>>),

        /// Arbitrary async computation
        ///
        /// Returns `Option<Action>`; a `Some` value is a feedback action for the caller.
        Future(Pin<Box<dyn Future<Output = Option<Action>> + Send>>),
    }

    // Manual Debug implementation since Future doesn't implement Debug
    impl<Action> std::fmt::Debug for Effect<Action> {
        fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
            match self {
                Effect::None => write!(f, "Effect::None"),
                Effect::Parallel(effects) => {
                    f.debug_tuple("Effect::Parallel").field(effects).finish()
                },
                Effect::Future(_) => write!(f, "Effect::Future(<future>)"),
            }
        }
    }

    impl<Action> Effect<Action> {
        /// Combine effects to run in parallel
        #[must_use]
        pub const fn merge(effects: Vec<Effect<Action>>) -> Effect<Action> {
            Effect::Parallel(effects)
        }

        /// Returns `true` if this effect does nothing.
        #[must_use]
        pub fn is_noop(&self) -> bool {
            match self {
                Effect::None => true,
                Effect::Parallel(effects) => effects.iter().all(Effect::is_noop),
                Effect::Future(_) => false,
            }
        }
    }
}

/// Environment module - dependency injection traits
///
/// All time-dependent logic reads the current instant through [`Clock`] so tests can
/// pin it.
pub mod environment {
    use chrono::{DateTime, Utc};

    /// Clock trait - abstracts time operations for testability
    pub trait Clock: Send + Sync {
        /// Get the current time
        fn now(&self) -> DateTime<Utc>;
    }

    /// Production clock backed by the system time.
    #[derive(Debug, Clone, Copy, Default)]
    pub struct SystemClock;

    impl Clock for SystemClock {
        fn now(&self) -> DateTime<Utc> {
            Utc::now()
        }
    }
}
