//! Circuit Breaker (C7, §4.7).
//!
//! No teacher file in the retrieved set implements this; grounded in the
//! teacher's general small-shared-state-machine idiom (atomics guarded by a
//! `parking_lot::RwLock` around the enum discriminant, e.g. the
//! `RwLock<Option<PrefetchEntry>>` pattern in `agent/mod.rs`) and its
//! `thiserror` error-enum convention. Wraps only the LLM call (§9) —
//! database failures never count toward the failure counter.

use parking_lot::RwLock;
use std::future::Future;
use std::sync::atomic::{AtomicU32, Ordering};
use std::time::{Duration, Instant};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum State {
    Closed,
    Open,
    HalfOpen,
}

/// The outcome of [`CircuitBreaker::call`] when the wrapped operation
/// itself fails, vs. the breaker refusing to invoke it at all.
#[derive(Debug)]
pub enum CircuitCallError<E> {
    /// The breaker was open; `fn` was never invoked.
    Open,
    /// `fn` ran and returned this error.
    Inner(E),
}

pub struct CircuitBreaker {
    state: RwLock<State>,
    opened_at: RwLock<Option<Instant>>,
    consecutive_failures: AtomicU32,
    failure_threshold: u32,
    cooldown: Duration,
}

impl CircuitBreaker {
    pub fn new(failure_threshold: u32, cooldown: Duration) -> Self {
        Self {
            state: RwLock::new(State::Closed),
            opened_at: RwLock::new(None),
            consecutive_failures: AtomicU32::new(0),
            failure_threshold: failure_threshold.max(1),
            cooldown,
        }
    }

    /// Read-only peek used for the pre-fan-out short circuit (§4.12 step
    /// 11): reports `open` without consuming the one probe `half_open`
    /// admits, and without mutating state even if the cooldown has
    /// elapsed — the authoritative transition happens in [`Self::call`].
    pub fn is_open(&self) -> bool {
        let state = *self.state.read();
        if state != State::Open {
            return false;
        }
        match *self.opened_at.read() {
            Some(opened) => opened.elapsed() < self.cooldown,
            None => true,
        }
    }

    /// `call(fn)` (§4.7): short-circuits in `open` without invoking `f`,
    /// admits exactly one probe in `half_open`. `half_open` closes on the
    /// probe's first success, reopens on its first failure.
    pub async fn call<F, Fut, T, E>(&self, f: F) -> Result<T, CircuitCallError<E>>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        if !self.admit() {
            return Err(CircuitCallError::Open);
        }

        match f().await {
            Ok(value) => {
                self.record_success();
                Ok(value)
            }
            Err(e) => {
                self.record_failure();
                Err(CircuitCallError::Inner(e))
            }
        }
    }

    /// Returns `true` if this call may proceed, transitioning `open` ->
    /// `half_open` when the cooldown has elapsed.
    fn admit(&self) -> bool {
        let mut state = self.state.write();
        match *state {
            State::Closed | State::HalfOpen => true,
            State::Open => {
                let elapsed = self.opened_at.read().map(|opened| opened.elapsed() >= self.cooldown).unwrap_or(false);
                if elapsed {
                    *state = State::HalfOpen;
                    true
                } else {
                    false
                }
            }
        }
    }

    fn record_success(&self) {
        let mut state = self.state.write();
        match *state {
            State::HalfOpen => {
                *state = State::Closed;
                self.consecutive_failures.store(0, Ordering::SeqCst);
            }
            State::Closed => {
                self.consecutive_failures.store(0, Ordering::SeqCst);
            }
            State::Open => {}
        }
    }

    fn record_failure(&self) {
        let mut state = self.state.write();
        match *state {
            State::HalfOpen => {
                *state = State::Open;
                *self.opened_at.write() = Some(Instant::now());
            }
            State::Closed => {
                let failures = self.consecutive_failures.fetch_add(1, Ordering::SeqCst) + 1;
                if failures >= self.failure_threshold {
                    *state = State::Open;
                    *self.opened_at.write() = Some(Instant::now());
                }
            }
            State::Open => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn ok() -> Result<(), &'static str> {
        Ok(())
    }
    async fn fail() -> Result<(), &'static str> {
        Err("boom")
    }

    #[tokio::test]
    async fn opens_after_threshold_consecutive_failures() {
        let breaker = CircuitBreaker::new(3, Duration::from_secs(60));
        for _ in 0..2 {
            assert!(matches!(breaker.call(fail).await, Err(CircuitCallError::Inner(_))));
        }
        assert!(!breaker.is_open());
        assert!(matches!(breaker.call(fail).await, Err(CircuitCallError::Inner(_))));
        assert!(breaker.is_open());
    }

    #[tokio::test]
    async fn open_short_circuits_without_invoking_fn() {
        let breaker = CircuitBreaker::new(1, Duration::from_secs(60));
        let _ = breaker.call(fail).await;
        assert!(breaker.is_open());
        let result = breaker.call(ok).await;
        assert!(matches!(result, Err(CircuitCallError::Open)));
    }

    #[tokio::test]
    async fn half_open_closes_on_first_success() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        let _ = breaker.call(fail).await;
        assert!(breaker.is_open());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!breaker.is_open(), "cooldown elapsed, peek should no longer report open");
        let result = breaker.call(ok).await;
        assert!(result.is_ok());
        assert!(!breaker.is_open());

        // Closed breaker tolerates one failure without opening again.
        let _ = breaker.call(fail).await;
        assert!(breaker.is_open(), "threshold of 1 means a single failure reopens it");
    }

    #[tokio::test]
    async fn half_open_reopens_on_first_failure() {
        let breaker = CircuitBreaker::new(1, Duration::from_millis(10));
        let _ = breaker.call(fail).await;
        tokio::time::sleep(Duration::from_millis(20)).await;
        let result = breaker.call(fail).await;
        assert!(matches!(result, Err(CircuitCallError::Inner(_))));
        assert!(breaker.is_open());
    }
}
