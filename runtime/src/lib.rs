//! # Imaging Booking Runtime
//!
//! Executes the effects returned by reducers once the caller has persisted the
//! new state.
//!
//! The [`EffectRunner`] spawns every `Effect::Future` on the tokio runtime as a
//! detached task bounded by a per-effect timeout. Feedback actions produced by
//! the futures are handed to a caller-supplied callback. The runner counts
//! in-flight effects so graceful shutdown can wait for them.
//!
//! ```text
//! reduce ──▶ persist ──▶ runner.run(effects, on_action)
//!                              │
//!                              ├─▶ tokio::spawn(timeout(effect))
//!                              │        └─▶ on_action(feedback)
//!                              └─▶ shutdown(timeout) waits for pending == 0
//! ```

use imaging_booking_core::effect::Effect;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use thiserror::Error;

pub mod metrics;
pub mod retry;

use crate::metrics::EffectMetrics;

/// Errors from the effect runner.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RunnerError {
    /// Shutdown timed out with effects still running
    #[error("Shutdown timeout: {0} effects still running")]
    ShutdownTimeout(usize),
}

/// Guard that decrements an atomic counter on drop (for shutdown tracking)
///
/// Runs even if the effect panics.
struct AtomicCounterGuard(Arc<AtomicUsize>);

impl Drop for AtomicCounterGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

/// Callback receiving feedback actions from completed effects.
type ActionSink<A> = Arc<dyn Fn(A) + Send + Sync>;

/// Runs reducer effects in detached, time-bounded tasks.
///
/// Cloning is cheap; clones share the pending counter and shutdown flag.
#[derive(Clone, Debug)]
pub struct EffectRunner {
    pending_effects: Arc<AtomicUsize>,
    shutdown: Arc<AtomicBool>,
    effect_timeout: Duration,
}

impl EffectRunner {
    /// Create a runner that abandons any single effect after `effect_timeout`.
    #[must_use]
    pub fn new(effect_timeout: Duration) -> Self {
        Self {
            pending_effects: Arc::new(AtomicUsize::new(0)),
            shutdown: Arc::new(AtomicBool::new(false)),
            effect_timeout,
        }
    }

    /// Per-effect timeout.
    #[must_use]
    pub const fn effect_timeout(&self) -> Duration {
        self.effect_timeout
    }

    /// Number of effects currently running.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.pending_effects.load(Ordering::Acquire)
    }

    /// Whether [`shutdown`](Self::shutdown) has been called.
    #[must_use]
    pub fn is_shutting_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    /// Spawn `effects`. Feedback actions are passed to `on_action` from the
    /// effect's task. Returns immediately.
    pub fn run<A, I, F>(&self, effects: I, on_action: F)
    where
        A: Send + 'static,
        I: IntoIterator<Item = Effect<A>>,
        F: Fn(A) + Send + Sync + 'static,
    {
        if self.is_shutting_down() {
            tracing::warn!("Runner is shutting down, dropping effects");
            return;
        }
        let sink: ActionSink<A> = Arc::new(on_action);
        for effect in effects {
            self.execute(effect, &sink);
        }
    }

    #[tracing::instrument(skip_all, name = "execute_effect")]
    fn execute<A>(&self, effect: Effect<A>, sink: &ActionSink<A>)
    where
        A: Send + 'static,
    {
        match effect {
            Effect::None => {
                tracing::trace!("Executing Effect::None (no-op)");
            },
            Effect::Parallel(effects) => {
                tracing::trace!("Executing Effect::Parallel with {} effects", effects.len());
                for effect in effects {
                    self.execute(effect, sink);
                }
            },
            Effect::Future(fut) => {
                tracing::trace!("Executing Effect::Future");
                let pending = self.pending_effects.fetch_add(1, Ordering::SeqCst) + 1;
                EffectMetrics::record_in_flight(pending);
                let pending_guard = AtomicCounterGuard(Arc::clone(&self.pending_effects));
                let sink = Arc::clone(sink);
                let timeout = self.effect_timeout;

                tokio::spawn(async move {
                    let _pending_guard = pending_guard; // Decrement on drop
                    let started = std::time::Instant::now();

                    match tokio::time::timeout(timeout, fut).await {
                        Ok(Some(action)) => {
                            EffectMetrics::record_execution(started.elapsed());
                            sink(action);
                        },
                        Ok(None) => {
                            EffectMetrics::record_execution(started.elapsed());
                            tracing::trace!("Effect::Future completed with no action");
                        },
                        Err(_) => {
                            EffectMetrics::record_timeout();
                            tracing::warn!(
                                timeout_ms = timeout.as_millis(),
                                "Effect timed out and was abandoned"
                            );
                        },
                    }
                });
            },
        }
    }

    /// Stop accepting effects and wait for in-flight ones to finish.
    ///
    /// # Errors
    ///
    /// Returns [`RunnerError::ShutdownTimeout`] if effects are still running
    /// after `timeout`.
    pub async fn shutdown(&self, timeout: Duration) -> Result<(), RunnerError> {
        tracing::info!("Draining pending effects");
        self.shutdown.store(true, Ordering::Release);

        let start = std::time::Instant::now();
        let poll_interval = Duration::from_millis(50);

        loop {
            let pending = self.pending();
            EffectMetrics::record_in_flight(pending);

            if pending == 0 {
                tracing::info!("All effects completed");
                return Ok(());
            }

            if start.elapsed() >= timeout {
                tracing::error!(pending_effects = pending, "Shutdown timeout: {} effects still running", pending);
                return Err(RunnerError::ShutdownTimeout(pending));
            }

            tracing::debug!(
                pending_effects = pending,
                elapsed_ms = start.elapsed().as_millis(),
                "Waiting for effects to complete"
            );

            tokio::time::sleep(poll_interval).await;
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    fn recording() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) + Send + Sync + 'static) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |action| seen.lock().unwrap().push(action)
        };
        (seen, sink)
    }

    #[tokio::test]
    async fn test_feedback_actions_reach_callback() {
        let runner = EffectRunner::new(Duration::from_secs(1));
        let (seen, sink) = recording();

        runner.run(
            vec![
                Effect::Future(Box::pin(async { Some(1) })),
                Effect::merge(vec![Effect::None, Effect::Future(Box::pin(async { Some(2) }))]),
                Effect::Future(Box::pin(async { None })),
            ],
            sink,
        );

        runner.shutdown(Duration::from_secs(1)).await.unwrap();
        let mut seen = seen.lock().unwrap().clone();
        seen.sort_unstable();
        assert_eq!(seen, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_slow_effect_is_abandoned() {
        let runner = EffectRunner::new(Duration::from_millis(20));
        let (seen, sink) = recording();

        runner.run(
            vec![Effect::Future(Box::pin(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Some(7)
            }))],
            sink,
        );

        runner.shutdown(Duration::from_secs(1)).await.unwrap();
        assert!(seen.lock().unwrap().is_empty());
        assert_eq!(runner.pending(), 0);
    }

    #[tokio::test]
    async fn test_shutdown_times_out_with_pending_effects() {
        let runner = EffectRunner::new(Duration::from_secs(10));
        runner.run(
            vec![Effect::Future(Box::pin(async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                None::<u32>
            }))],
            |_| {},
        );

        let result = runner.shutdown(Duration::from_millis(60)).await;
        assert_eq!(result, Err(RunnerError::ShutdownTimeout(1)));
    }

    #[tokio::test]
    async fn test_effects_dropped_after_shutdown() {
        let runner = EffectRunner::new(Duration::from_secs(1));
        runner.shutdown(Duration::from_millis(10)).await.unwrap();
        let (seen, sink) = recording();

        runner.run(vec![Effect::Future(Box::pin(async { Some(1) }))], sink);

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(seen.lock().unwrap().is_empty());
        assert!(runner.is_shutting_down());
    }
}
