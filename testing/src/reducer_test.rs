//! Given-When-Then testing for reducers
//!
//! Besides asserting on state and on the effect list, a test can drive the
//! returned `Effect::Future`s to completion and assert on the feedback actions
//! they produce.

#![allow(clippy::module_name_repetitions)] // ReducerTest is the natural name

use imaging_booking_core::{effect::Effect, reducer::Reducer};

/// Type alias for state assertion functions
type StateAssertion<S> = Box<dyn FnOnce(&S)>;

/// Type alias for effect assertion functions
type EffectAssertion<A> = Box<dyn FnOnce(&[Effect<A>])>;

/// Type alias for feedback assertion functions
type FeedbackAssertion<A> = Box<dyn FnOnce(&[A])>;

/// Fluent API for testing reducers with Given-When-Then syntax
///
/// # Example
///
/// ```ignore
/// use imaging_booking_testing::{ReducerTest, assertions};
///
/// ReducerTest::new(AppointmentReducer::new())
///     .with_env(environment())
///     .given_state(AppointmentState::new(pending_appointment()))
///     .when_action(AppointmentAction::Cancel)
///     .then_state(|state| assert_eq!(state.appointment.status, AppointmentStatus::Cancelled))
///     .then_effects(assertions::assert_has_future_effect)
///     .then_feedback(|actions| assert_eq!(actions.len(), 1))
///     .run();
/// ```
pub struct ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
{
    reducer: R,
    environment: Option<E>,
    initial_state: Option<S>,
    actions: Vec<A>,
    state_assertions: Vec<StateAssertion<S>>,
    effect_assertions: Vec<EffectAssertion<A>>,
    feedback_assertions: Vec<FeedbackAssertion<A>>,
}

impl<R, S, A, E> ReducerTest<R, S, A, E>
where
    R: Reducer<State = S, Action = A, Environment = E>,
    A: Send + 'static,
{
    /// Create a new reducer test with the given reducer
    #[must_use]
    pub const fn new(reducer: R) -> Self {
        Self {
            reducer,
            environment: None,
            initial_state: None,
            actions: Vec::new(),
            state_assertions: Vec::new(),
            effect_assertions: Vec::new(),
            feedback_assertions: Vec::new(),
        }
    }

    /// Set the environment for the test
    #[must_use]
    pub fn with_env(mut self, env: E) -> Self {
        self.environment = Some(env);
        self
    }

    /// Set the initial state (Given)
    #[must_use]
    pub fn given_state(mut self, state: S) -> Self {
        self.initial_state = Some(state);
        self
    }

    /// Add an action to apply (When). Actions run in order; effect and feedback
    /// assertions see the effects of the last one.
    #[must_use]
    pub fn when_action(mut self, action: A) -> Self {
        self.actions.push(action);
        self
    }

    /// Add an assertion about the resulting state (Then)
    #[must_use]
    pub fn then_state<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&S) + 'static,
    {
        self.state_assertions.push(Box::new(assertion));
        self
    }

    /// Add an assertion about the effects of the last action (Then)
    #[must_use]
    pub fn then_effects<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[Effect<A>]) + 'static,
    {
        self.effect_assertions.push(Box::new(assertion));
        self
    }

    /// Execute the effects of the last action and assert on the feedback
    /// actions they return (Then)
    #[must_use]
    pub fn then_feedback<F>(mut self, assertion: F) -> Self
    where
        F: FnOnce(&[A]) + 'static,
    {
        self.feedback_assertions.push(Box::new(assertion));
        self
    }

    /// Run the test and execute all assertions
    ///
    /// # Panics
    ///
    /// Panics if initial state, action, or environment is not set, if called
    /// from inside a tokio runtime while feedback assertions are registered,
    /// or if any assertion fails.
    #[allow(clippy::panic)] // Test code can panic
    #[allow(clippy::expect_used)] // Test code can use expect
    pub fn run(self) {
        let mut state = self
            .initial_state
            .expect("Initial state must be set with given_state()");
        assert!(!self.actions.is_empty(), "Action must be set with when_action()");
        let env = self
            .environment
            .expect("Environment must be set with with_env()");

        let mut effects = Vec::new();
        for action in self.actions {
            effects = self.reducer.reduce(&mut state, action, &env).into_vec();
        }

        for assertion in self.state_assertions {
            assertion(&state);
        }

        for assertion in self.effect_assertions {
            assertion(&effects);
        }

        if self.feedback_assertions.is_empty() {
            return;
        }

        let runtime = tokio::runtime::Builder::new_current_thread()
            .enable_time()
            .build()
            .expect("failed to build test runtime");
        let feedback = runtime.block_on(collect_feedback(effects));

        for assertion in self.feedback_assertions {
            assertion(&feedback);
        }
    }
}

/// Drive `effects` sequentially and collect the actions they return.
pub async fn collect_feedback<A: Send + 'static>(effects: Vec<Effect<A>>) -> Vec<A> {
    let mut pending = effects;
    let mut feedback = Vec::new();
    while let Some(effect) = pending.pop() {
        match effect {
            Effect::None => {},
            Effect::Parallel(nested) => pending.extend(nested),
            Effect::Future(future) => feedback.extend(future.await),
        }
    }
    feedback
}

/// Helper assertions for effects
pub mod assertions {
    use imaging_booking_core::effect::Effect;

    /// Assert that there are no effects
    ///
    /// # Panics
    ///
    /// Panics if any effect does something.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_no_effects<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().all(Effect::is_noop),
            "Expected no effects, but found {}: {:?}",
            effects.len(),
            effects
        );
    }

    /// Assert the number of effects
    ///
    /// # Panics
    ///
    /// Panics if the number of effects doesn't match expected.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_effects_count<A>(effects: &[Effect<A>], expected: usize) {
        assert_eq!(
            effects.len(),
            expected,
            "Expected {} effects, but found {}",
            expected,
            effects.len()
        );
    }

    /// Assert that effects contain at least one Future effect
    ///
    /// # Panics
    ///
    /// Panics if no Future effect is found.
    #[allow(clippy::panic)] // Test assertion
    pub fn assert_has_future_effect<A>(effects: &[Effect<A>]) {
        assert!(
            effects.iter().any(|e| matches!(e, Effect::Future(_))),
            "Expected at least one Future effect, but none found"
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use imaging_booking_core::effect::Effect;
    use imaging_booking_core::reducer::Reducer;

    #[derive(Clone, Debug)]
    struct TestState {
        count: i32,
    }

    #[derive(Clone, Debug, PartialEq)]
    enum TestAction {
        Increment,
        Echo(i32),
    }

    struct TestReducer;

    struct TestEnv;

    impl Reducer for TestReducer {
        type State = TestState;
        type Action = TestAction;
        type Environment = TestEnv;

        fn reduce(
            &self,
            state: &mut Self::State,
            action: Self::Action,
            _env: &Self::Environment,
        ) -> smallvec::SmallVec<[Effect<Self::Action>; 4]> {
            match action {
                TestAction::Increment => {
                    state.count += 1;
                    let count = state.count;
                    smallvec::smallvec![Effect::Future(Box::pin(async move { Some(TestAction::Echo(count)) }))]
                },
                TestAction::Echo(_) => smallvec::smallvec![Effect::None],
            }
        }
    }

    #[test]
    fn test_state_and_feedback() {
        ReducerTest::new(TestReducer)
            .with_env(TestEnv)
            .given_state(TestState { count: 0 })
            .when_action(TestAction::Increment)
            .when_action(TestAction::Increment)
            .then_state(|state| assert_eq!(state.count, 2))
            .then_effects(|effects| assertions::assert_effects_count(effects, 1))
            .then_feedback(|actions| assert_eq!(actions, [TestAction::Echo(2)]))
            .run();
    }

    #[test]
    fn test_assertions_no_effects() {
        assertions::assert_no_effects::<TestAction>(&[Effect::None]);
        assertions::assert_no_effects::<TestAction>(&[]);
        assertions::assert_no_effects::<TestAction>(&[Effect::Parallel(vec![Effect::None])]);
    }

    #[test]
    #[should_panic(expected = "Expected at least one Future effect")]
    fn test_assert_has_future_effect_fails_on_noop() {
        assertions::assert_has_future_effect::<TestAction>(&[Effect::None]);
    }
}
