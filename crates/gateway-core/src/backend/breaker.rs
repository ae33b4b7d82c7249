//! Per-route circuit breaker.
//!
//! A count-based rolling window of call outcomes drives a three-state
//! FSM. All mutable state lives behind a single mutex so transitions
//! are atomic; the critical sections are a few comparisons and a deque
//! push, so a sync lock is cheaper here than an async one.

use crate::config::BreakerConfig;
use parking_lot::Mutex;
use std::{
    collections::VecDeque,
    time::{Duration, Instant},
};

/// Circuit states.
///
/// - `Closed` -> `Open`: failure or slow-call rate over threshold once
///   the window holds enough samples
/// - `Open` -> `HalfOpen`: open cooldown elapsed
/// - `HalfOpen` -> `Closed`: all trial calls succeeded
/// - `HalfOpen` -> `Open`: any trial call failed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerState {
    Closed,
    Open,
    HalfOpen,
}

/// One completed call as the window sees it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Success,
    Failure,
    /// Succeeded, but took longer than the slow-call threshold.
    Slow,
}

#[derive(Debug)]
struct BreakerInner {
    state: BreakerState,
    window: VecDeque<Outcome>,
    opened_at: Option<Instant>,
    /// Trial slots remaining while half-open.
    trial_permits: u32,
    /// Trial results still outstanding before the circuit may close.
    trials_in_flight: u32,
}

/// Windowed circuit breaker guarding one backend route.
pub struct CircuitBreaker {
    inner: Mutex<BreakerInner>,
    window_size: usize,
    min_calls: u32,
    failure_rate_threshold: f64,
    slow_rate_threshold: f64,
    slow_call_threshold: Duration,
    open_cooldown: Duration,
    half_open_permits: u32,
}

impl CircuitBreaker {
    #[must_use]
    pub fn new(config: &BreakerConfig) -> Self {
        Self {
            inner: Mutex::new(BreakerInner {
                state: BreakerState::Closed,
                window: VecDeque::with_capacity(config.window_size),
                opened_at: None,
                trial_permits: 0,
                trials_in_flight: 0,
            }),
            window_size: config.window_size,
            min_calls: config.min_calls,
            failure_rate_threshold: config.failure_rate_threshold,
            slow_rate_threshold: config.slow_rate_threshold,
            slow_call_threshold: config.slow_call_threshold(),
            open_cooldown: config.open_cooldown(),
            half_open_permits: config.half_open_permits,
        }
    }

    /// Whether a call may proceed right now.
    ///
    /// While open, flips to half-open once the cooldown has elapsed and
    /// then admits up to the configured number of trial calls.
    #[must_use]
    pub fn try_acquire(&self) -> bool {
        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => true,
            BreakerState::Open => {
                let elapsed = inner.opened_at.map(|t| t.elapsed()).unwrap_or_default();
                if elapsed < self.open_cooldown {
                    return false;
                }
                tracing::warn!("circuit transitioning to half-open");
                inner.state = BreakerState::HalfOpen;
                inner.trial_permits = self.half_open_permits;
                inner.trials_in_flight = 0;
                self.take_trial_permit(&mut inner)
            }
            BreakerState::HalfOpen => self.take_trial_permit(&mut inner),
        }
    }

    fn take_trial_permit(&self, inner: &mut BreakerInner) -> bool {
        if inner.trial_permits > 0 {
            inner.trial_permits -= 1;
            inner.trials_in_flight += 1;
            true
        } else {
            false
        }
    }

    /// Records a completed call.
    pub fn record(&self, success: bool, elapsed: Duration) {
        let outcome = if !success {
            Outcome::Failure
        } else if elapsed > self.slow_call_threshold {
            Outcome::Slow
        } else {
            Outcome::Success
        };

        let mut inner = self.inner.lock();
        match inner.state {
            BreakerState::Closed => {
                if inner.window.len() == self.window_size {
                    inner.window.pop_front();
                }
                inner.window.push_back(outcome);
                if self.should_open(&inner) {
                    tracing::warn!(
                        failure_rate = self.failure_rate(&inner),
                        slow_rate = self.slow_rate(&inner),
                        "circuit opening"
                    );
                    self.open(&mut inner);
                }
            }
            BreakerState::HalfOpen => {
                if outcome == Outcome::Failure {
                    tracing::warn!("trial call failed, circuit re-opening");
                    self.open(&mut inner);
                } else {
                    inner.trials_in_flight = inner.trials_in_flight.saturating_sub(1);
                    if inner.trials_in_flight == 0 && inner.trial_permits == 0 {
                        tracing::info!("trial calls succeeded, circuit closing");
                        inner.state = BreakerState::Closed;
                        inner.window.clear();
                        inner.opened_at = None;
                    }
                }
            }
            // A call that started before the circuit opened finished
            // late; its outcome no longer matters.
            BreakerState::Open => {}
        }
    }

    fn open(&self, inner: &mut BreakerInner) {
        inner.state = BreakerState::Open;
        inner.opened_at = Some(Instant::now());
        inner.trial_permits = 0;
        inner.trials_in_flight = 0;
    }

    fn should_open(&self, inner: &BreakerInner) -> bool {
        if (inner.window.len() as u32) < self.min_calls {
            return false;
        }
        self.failure_rate(inner) >= self.failure_rate_threshold
            || self.slow_rate(inner) >= self.slow_rate_threshold
    }

    fn failure_rate(&self, inner: &BreakerInner) -> f64 {
        rate(inner, |o| o == Outcome::Failure)
    }

    fn slow_rate(&self, inner: &BreakerInner) -> f64 {
        rate(inner, |o| o == Outcome::Slow)
    }

    /// Current state, for metrics and tests.
    #[must_use]
    pub fn state(&self) -> BreakerState {
        self.inner.lock().state
    }
}

fn rate(inner: &BreakerInner, pred: impl Fn(Outcome) -> bool) -> f64 {
    if inner.window.is_empty() {
        return 0.0;
    }
    let hits = inner.window.iter().copied().filter(|o| pred(*o)).count();
    hits as f64 / inner.window.len() as f64 * 100.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker(cooldown_secs: u64) -> CircuitBreaker {
        CircuitBreaker::new(&BreakerConfig {
            window_size: 10,
            min_calls: 4,
            failure_rate_threshold: 50.0,
            slow_rate_threshold: 80.0,
            slow_call_ms: 100,
            open_cooldown_secs: cooldown_secs,
            half_open_permits: 2,
            ..BreakerConfig::default()
        })
    }

    fn fast() -> Duration {
        Duration::from_millis(1)
    }

    #[test]
    fn stays_closed_below_minimum_samples() {
        let cb = breaker(30);
        for _ in 0..3 {
            cb.record(false, fast());
        }
        assert_eq!(cb.state(), BreakerState::Closed);
        assert!(cb.try_acquire());
    }

    #[test]
    fn opens_on_failure_rate() {
        let cb = breaker(30);
        for _ in 0..2 {
            cb.record(true, fast());
        }
        for _ in 0..2 {
            cb.record(false, fast());
        }
        assert_eq!(cb.state(), BreakerState::Open);
        assert!(!cb.try_acquire());
    }

    #[test]
    fn opens_on_slow_rate() {
        let cb = breaker(30);
        for _ in 0..5 {
            cb.record(true, Duration::from_millis(500));
        }
        assert_eq!(cb.state(), BreakerState::Open);
    }

    #[test]
    fn half_open_admits_limited_trials_then_closes() {
        let cb = breaker(0);
        for _ in 0..4 {
            cb.record(false, fast());
        }
        assert_eq!(cb.state(), BreakerState::Open);

        // Cooldown of zero: next acquire flips to half-open.
        assert!(cb.try_acquire());
        assert_eq!(cb.state(), BreakerState::HalfOpen);
        assert!(cb.try_acquire());
        assert!(!cb.try_acquire(), "permits exhausted");

        cb.record(true, fast());
        assert_eq!(cb.state(), BreakerState::HalfOpen);
        cb.record(true, fast());
        assert_eq!(cb.state(), BreakerState::Closed);
        assert!(cb.try_acquire());
    }

    #[test]
    fn trial_failure_reopens() {
        let cb = breaker(0);
        for _ in 0..4 {
            cb.record(false, fast());
        }
        assert!(cb.try_acquire());
        cb.record(false, fast());
        assert_eq!(cb.state(), BreakerState::Open);
    }

    #[test]
    fn window_is_reset_after_close() {
        let cb = breaker(0);
        for _ in 0..4 {
            cb.record(false, fast());
        }
        assert!(cb.try_acquire());
        assert!(cb.try_acquire());
        cb.record(true, fast());
        cb.record(true, fast());
        assert_eq!(cb.state(), BreakerState::Closed);

        // A single failure after closing must not trip the fresh window.
        cb.record(false, fast());
        assert_eq!(cb.state(), BreakerState::Closed);
    }
}
